//! Find, get, create, patch, update and remove records of a SQL table through a uniform
//! record service.

pub mod error;
pub mod params;
pub mod projection;
pub mod service;
pub mod state;

pub use error::Error;
pub use params::{FindResult, Page, Params, Payload};
pub use service::{RecordService, ServiceOptions};
