mod pagination;
mod pool_settings;
mod secret;
pub mod uri;

pub use pagination::Pagination;
pub use pool_settings::PoolSettings;
pub use secret::Secret;
pub use uri::ConnectionUri;
