//! Error types and error codes for Warrant
//!
//! This module defines:
//! - `WarrantError`: Application-specific error enum
//! - `ErrorCode`: Structured error codes for callers that need a stable number

use serde::{Deserialize, Serialize};

/// Application-specific error types
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WarrantError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl WarrantError {
    pub fn code(&self) -> ErrorCode<'static> {
        match self {
            WarrantError::InvalidArgument(_) => PARAMETER_VALIDATE_ERROR,
            WarrantError::NotFound(_) => RESOURCE_NOT_FOUND,
            WarrantError::InvalidCursor(_) => INVALID_CURSOR,
            WarrantError::DatabaseError(_) => DATA_ACCESS_ERROR,
            WarrantError::ConfigError(_) => CONFIG_ERROR,
            WarrantError::InternalError(_) => SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WarrantError::NotFound(_))
    }
}

/// Persistence traits report failures through `anyhow`. A `WarrantError`
/// raised inside a backend is recovered as-is; anything else is a store failure.
impl From<anyhow::Error> for WarrantError {
    fn from(value: anyhow::Error) -> Self {
        match value.downcast::<WarrantError>() {
            Ok(err) => err,
            Err(other) => WarrantError::DatabaseError(format!("{:#}", other)),
        }
    }
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const PARAMETER_MISSING: ErrorCode<'static> = ErrorCode {
    code: 10000,
    message: "parameter missing",
};

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

pub const INVALID_CURSOR: ErrorCode<'static> = ErrorCode {
    code: 20020,
    message: "invalid page cursor",
};

pub const CONFIG_ERROR: ErrorCode<'static> = ErrorCode {
    code: 23003,
    message: "configuration error",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};
