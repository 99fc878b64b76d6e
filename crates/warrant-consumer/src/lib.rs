//! Warrant Consumer - consumer-facing data services
//!
//! This crate provides:
//! - Layered content override resolution (environments by rank, then the consumer)
//! - Keyset-paginated consumer enumeration with opaque, tamper-evident cursors
//! - Content override management and validation

pub mod cursor;
pub mod model;
pub mod service;
pub mod validator;

// Re-export commonly used types
pub use cursor::CursorCodec;
pub use model::*;
pub use service::{ConsumerFeedService, ContentOverrideService, OverrideResolver};
pub use validator::ContentOverrideValidator;
