//! Application startup utilities

mod logging;
mod persistence;

pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use persistence::init_persistence;
