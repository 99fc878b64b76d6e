//! Utility functions for Warrant

use std::sync::LazyLock;

/// Pattern for natural keys (owner keys and the like)
static KEY_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[\w-]+$").expect("Invalid regex pattern"));

/// Validate a natural key: word characters and hyphens, at least one.
///
/// # Examples
///
/// ```
/// use warrant_common::is_valid_key;
///
/// assert!(is_valid_key("admin"));
/// assert!(is_valid_key("acme-corp_01"));
/// assert!(!is_valid_key("with spaces"));
/// assert!(!is_valid_key(""));
/// ```
pub fn is_valid_key(key: &str) -> bool {
    KEY_PATTERN.is_match(key)
}

/// True for `None`, empty and whitespace-only strings
pub fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// New opaque identifier (32 lowercase hex characters)
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Current wall clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("owner"));
        assert!(is_valid_key("Owner_1"));
        assert!(is_valid_key("my-owner"));
    }

    #[test]
    fn test_is_valid_key_invalid_chars() {
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("a b")); // space
        assert!(!is_valid_key("a/b")); // /
        assert!(!is_valid_key("a@@b")); // key separator
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some("   ")));
        assert!(!is_blank(Some("x")));
    }

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_now_millis_is_positive() {
        assert!(now_millis() > 1_600_000_000_000);
    }
}
