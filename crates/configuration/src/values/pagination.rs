use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Page size policy of a record service.
///
/// Without a `default`, `find` returns a bare list of records and passes the
/// caller's `$limit` through, ignoring `max`. With a `default`, `find` returns
/// a page, `default` is used whenever the caller does not ask for a limit, and
/// `max` caps every limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Pagination {
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<u32>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl Pagination {
    /// No page size policy at all.
    pub fn disabled() -> Self {
        Pagination {
            default: None,
            max: None,
        }
    }

    pub fn new(default: u32, max: u32) -> Self {
        Pagination {
            default: Some(default),
            max: Some(max),
        }
    }

    /// Whether `find` answers with a page rather than a list.
    pub fn is_enabled(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_disabled(&self) -> bool {
        *self == Pagination::disabled()
    }
}
