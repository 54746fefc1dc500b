pub mod configuration;
pub mod environment;
pub mod error;
pub mod values;
pub mod version1;

pub use configuration::{Configuration, ServiceRuntimeConfiguration};
pub use values::{ConnectionUri, Pagination, PoolSettings, Secret};
pub use version1::{
    configure, make_runtime_configuration, parse_configuration, write_parsed_configuration,
    ParsedConfiguration, ServiceConfiguration, CONFIGURATION_FILENAME,
    CONFIGURATION_JSONSCHEMA_FILENAME, DEFAULT_CONNECTION_URI_VARIABLE,
};
