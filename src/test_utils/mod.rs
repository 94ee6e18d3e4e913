//! Shared fixtures for unit tests.
//!
//! [`MemoryStore`] is a deterministic in-process [`CoordStore`] double
//! with real TTL expiry (driven by tokio's clock, so paused-time tests
//! control it), a full mutation history for index-based watch resume,
//! and a switch that simulates the cluster becoming unavailable. It
//! complements the mockall-generated `MockCoordStore`, which is used
//! where tests inject specific failures.

mod memory_store;

pub use memory_store::*;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}
