//! Helpers shared by the test suites: an in-memory storage engine and fixtures.

pub mod fixtures;
pub mod memory;

pub use memory::{Failure, MemoryModel};

/// Install a logger once per test binary. Later calls do nothing.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
