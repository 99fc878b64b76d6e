//! Command output envelope

use serde::{Deserialize, Serialize};
use warrant_common::WarrantError;
use warrant_common::error::SUCCESS;

/// Generic result wrapper printed by every command
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Result<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> Result<T> {
    pub fn success(data: T) -> Result<T> {
        Result::<T> {
            code: SUCCESS.code,
            message: SUCCESS.message.to_string(),
            data,
        }
    }
}

impl Result<()> {
    pub fn fail(error: &WarrantError) -> Result<()> {
        Result::<()> {
            code: error.code().code,
            message: error.to_string(),
            data: (),
        }
    }
}

#[cfg(test)]
mod tests {
    use warrant_common::error::INVALID_CURSOR;

    use super::*;

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(Result::success(vec![1, 2])).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_fail_envelope() {
        let result = Result::fail(&WarrantError::InvalidCursor("cursor is truncated".to_string()));
        assert_eq!(result.code, INVALID_CURSOR.code);
        assert!(result.message.contains("truncated"));
    }
}
