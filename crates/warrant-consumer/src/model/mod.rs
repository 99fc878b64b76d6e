//! Consumer data models
//!
//! This module contains data structures exchanged with callers:
//! - Content override entries as received from and returned to callers
//! - Consumer pages and feed options
//! - Effective override mappings

pub mod consumer;
pub mod content_override;

pub use consumer::*;
pub use content_override::*;
