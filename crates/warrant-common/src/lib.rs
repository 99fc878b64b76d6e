//! Warrant Common - Shared types and utilities
//!
//! This crate provides the foundational pieces used by every Warrant crate:
//! - Error types and error codes
//! - Id, time and string helpers

pub mod error;
pub mod utils;

// Re-exports for convenience
pub use error::{ErrorCode, WarrantError};
pub use utils::{generate_id, is_blank, is_valid_key, now_millis};

/// Separator used when composing storage keys from several parts
pub const KEY_SEPARATOR: &str = "@@";
