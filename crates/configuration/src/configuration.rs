//! Configuration for the record services.

use std::collections::BTreeMap;

use query_engine_metadata::metadata;

use crate::values::{Pagination, PoolSettings};

/// The 'Configuration' type collects all the information necessary to serve records at runtime.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration', which resolves secrets and checks that every service
/// refers to a known table.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub metadata: metadata::Metadata,
    pub services: BTreeMap<String, ServiceRuntimeConfiguration>,
    pub pool_settings: PoolSettings,
    pub connection_uri: String,
}

/// A record service with its table resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRuntimeConfiguration {
    pub table: metadata::TableInfo,
    pub paginate: Pagination,
}

impl Configuration {
    pub fn service(&self, name: &str) -> Option<&ServiceRuntimeConfiguration> {
        self.services.get(name)
    }
}
