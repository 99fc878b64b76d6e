//! Content override entries as exchanged with callers

use serde::{Deserialize, Serialize};
use warrant_common::WarrantError;
use warrant_persistence::{ContentOverride, OverrideParent};

/// A content override entry. Every field is optional on input; which fields
/// are required depends on the operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentOverrideDto {
    pub content_label: Option<String>,
    pub name: Option<String>,
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl ContentOverrideDto {
    pub fn new(content_label: &str, name: &str, value: &str) -> Self {
        Self {
            content_label: Some(content_label.to_string()),
            name: Some(name.to_string()),
            value: Some(value.to_string()),
            ..Default::default()
        }
    }

    /// Entry addressing a label, or a single (label, name) pair, for removal
    pub fn selector(content_label: Option<&str>, name: Option<&str>) -> Self {
        Self {
            content_label: content_label.map(str::to_string),
            name: name.map(str::to_string),
            ..Default::default()
        }
    }

    /// Build the override for `parent`
    pub fn to_override(&self, parent: &OverrideParent) -> Result<ContentOverride, WarrantError> {
        ContentOverride::for_parent(
            parent,
            self.content_label.clone().unwrap_or_default(),
            self.name.clone().unwrap_or_default(),
            self.value.clone().unwrap_or_default(),
        )
    }
}

impl From<&ContentOverride> for ContentOverrideDto {
    fn from(value: &ContentOverride) -> Self {
        Self {
            content_label: Some(value.content_label().to_string()),
            name: Some(value.name().to_string()),
            value: Some(value.value().to_string()),
            created: Some(value.created_time()),
            updated: Some(value.modified_time()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dto_deserialize_partial() {
        let dto: ContentOverrideDto = serde_json::from_str(r#"{"contentLabel":"repo"}"#).unwrap();
        assert_eq!(dto.content_label.as_deref(), Some("repo"));
        assert!(dto.name.is_none());
        assert!(dto.value.is_none());
    }

    #[test]
    fn test_dto_to_override() {
        let parent = OverrideParent::Consumer("c1".to_string());
        let o = ContentOverrideDto::new("repo", "GPGCheck", "0")
            .to_override(&parent)
            .unwrap();
        assert_eq!(o.name(), "gpgcheck");
        assert_eq!(o.parent(), Some(parent));
    }

    #[test]
    fn test_dto_missing_field_is_invalid() {
        let parent = OverrideParent::Environment("e1".to_string());
        let err = ContentOverrideDto::selector(Some("repo"), None)
            .to_override(&parent)
            .unwrap_err();
        assert!(matches!(err, WarrantError::InvalidArgument(_)));
    }

    #[test]
    fn test_dto_from_override() {
        let parent = OverrideParent::Consumer("c1".to_string());
        let o = ContentOverride::for_parent(&parent, "repo", "enabled", "1").unwrap();
        let dto = ContentOverrideDto::from(&o);
        assert_eq!(dto.name.as_deref(), Some("enabled"));
        assert_eq!(dto.created, Some(0));
    }
}
