//! Content override validation

use std::collections::BTreeSet;

use warrant_common::{WarrantError, is_blank};

use crate::model::ContentOverrideDto;

/// Longest accepted content label, name or value, in characters
pub const MAX_VALUE_LENGTH: usize = 255;

/// Property names that can never be overridden
pub const DEFAULT_BLOCKLIST: [&str; 2] = ["name", "label"];

/// Validates content override entries before they are stored
#[derive(Clone, Debug)]
pub struct ContentOverrideValidator {
    blocklist: BTreeSet<String>,
}

impl Default for ContentOverrideValidator {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl ContentOverrideValidator {
    /// Create a validator whose blocklist is the default one plus `extra`
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocklist = DEFAULT_BLOCKLIST
            .iter()
            .map(|s| s.to_string())
            .chain(
                extra
                    .into_iter()
                    .map(|s| s.as_ref().trim().to_lowercase())
                    .filter(|s| !s.is_empty()),
            )
            .collect();

        Self { blocklist }
    }

    pub fn is_blocked(&self, name: &str) -> bool {
        self.blocklist.contains(&name.trim().to_lowercase())
    }

    /// Problems with a single entry, empty when the entry is valid
    pub fn problems(&self, entry: &ContentOverrideDto) -> Vec<String> {
        let mut problems = Vec::new();

        for (field, value) in [
            ("content label", entry.content_label.as_deref()),
            ("name", entry.name.as_deref()),
            ("value", entry.value.as_deref()),
        ] {
            match value {
                v if is_blank(v) => problems.push(format!("{} must not be empty", field)),
                Some(v) if v.chars().count() > MAX_VALUE_LENGTH => problems.push(format!(
                    "{} must not exceed {} characters",
                    field, MAX_VALUE_LENGTH
                )),
                _ => {}
            }
        }

        if let Some(name) = entry.name.as_deref() {
            if self.is_blocked(name) {
                problems.push(format!("'{}' is not allowed to be overridden", name));
            }
        }

        problems
    }

    /// Validate every entry, reporting all problems at once
    pub fn validate(&self, entries: &[ContentOverrideDto]) -> Result<(), WarrantError> {
        let problems: Vec<String> = entries
            .iter()
            .flat_map(|entry| self.problems(entry))
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(WarrantError::InvalidArgument(problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_string() -> String {
        "x".repeat(MAX_VALUE_LENGTH + 1)
    }

    #[test]
    fn test_valid_entry() {
        let validator = ContentOverrideValidator::default();
        let entry = ContentOverrideDto::new("repo", "enabled", "1");
        assert!(validator.validate(&[entry]).is_ok());
    }

    #[test]
    fn test_max_length_is_inclusive() {
        let validator = ContentOverrideValidator::default();
        let exact = "x".repeat(MAX_VALUE_LENGTH);
        let entry = ContentOverrideDto::new(&exact, &exact, &exact);
        assert!(validator.problems(&entry).is_empty());
    }

    #[test]
    fn test_missing_or_empty_fields() {
        let validator = ContentOverrideValidator::default();
        let cases = [
            ContentOverrideDto {
                content_label: None,
                ..ContentOverrideDto::new("", "n", "v")
            },
            ContentOverrideDto::new("", "n", "v"),
            ContentOverrideDto {
                name: None,
                ..ContentOverrideDto::new("l", "", "v")
            },
            ContentOverrideDto::new("l", " ", "v"),
            ContentOverrideDto {
                value: None,
                ..ContentOverrideDto::new("l", "n", "")
            },
            ContentOverrideDto::new("l", "n", ""),
        ];

        for entry in cases {
            let err = validator.validate(&[entry.clone()]).unwrap_err();
            assert!(
                matches!(err, WarrantError::InvalidArgument(_)),
                "{:?} should be rejected",
                entry
            );
        }
    }

    #[test]
    fn test_too_long_fields() {
        let validator = ContentOverrideValidator::default();
        let long = long_string();

        for entry in [
            ContentOverrideDto::new(&long, "n", "v"),
            ContentOverrideDto::new("l", &long, "v"),
            ContentOverrideDto::new("l", "n", &long),
        ] {
            assert_eq!(validator.problems(&entry).len(), 1);
        }
    }

    #[test]
    fn test_blocklisted_names() {
        let validator = ContentOverrideValidator::default();
        assert!(validator.is_blocked("name"));
        assert!(validator.is_blocked("LABEL"));
        assert!(!validator.is_blocked("baseurl"));

        let err = validator
            .validate(&[ContentOverrideDto::new("repo", "Name", "x")])
            .unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }

    #[test]
    fn test_configured_blocklist_extends_default() {
        let validator = ContentOverrideValidator::new(["BaseURL", " "]);
        assert!(validator.is_blocked("baseurl"));
        assert!(validator.is_blocked("name"));
        assert!(!validator.is_blocked(""));
    }

    #[test]
    fn test_all_problems_reported() {
        let validator = ContentOverrideValidator::default();
        let err = validator
            .validate(&[
                ContentOverrideDto::new("", "enabled", "1"),
                ContentOverrideDto::new("repo", "label", ""),
            ])
            .unwrap_err();

        let WarrantError::InvalidArgument(message) = err else {
            panic!("unexpected error kind");
        };
        assert_eq!(message.split("; ").count(), 3);
    }
}
