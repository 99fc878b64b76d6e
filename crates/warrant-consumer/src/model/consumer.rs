//! Consumer enumeration and resolution models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warrant_persistence::{ConsumerInfo, OverrideKey};

/// Page size used when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: u64 = 100;
/// Upper bound for a single page
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Effective content overrides of a consumer keyed by (content label, name)
pub type EffectiveOverrides = BTreeMap<OverrideKey, String>;

/// One entry of an effective override mapping, for callers that need a flat list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveOverride {
    pub content_label: String,
    pub name: String,
    pub value: String,
}

impl EffectiveOverride {
    pub fn from_map(overrides: &EffectiveOverrides) -> Vec<Self> {
        overrides
            .iter()
            .map(|(key, value)| Self {
                content_label: key.content_label.clone(),
                name: key.name.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

/// A page of consumers
///
/// `next_cursor` is `None` once the sequence is exhausted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerPage {
    pub consumers: Vec<ConsumerInfo>,
    pub next_cursor: Option<String>,
}

impl ConsumerPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Page sizing for consumer enumeration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedOptions {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl FeedOptions {
    /// Both sizes are at least one and the default never exceeds the maximum
    pub fn new(default_page_size: u64, max_page_size: u64) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            default_page_size: default_page_size.clamp(1, max_page_size),
            max_page_size,
        }
    }
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_override_from_map() {
        let mut map = EffectiveOverrides::new();
        map.insert(OverrideKey::new("repo-b", "Enabled"), "1".to_string());
        map.insert(OverrideKey::new("repo-a", "gpgcheck"), "0".to_string());

        let list = EffectiveOverride::from_map(&map);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].content_label, "repo-a");
        assert_eq!(list[1].name, "enabled");
    }

    #[test]
    fn test_consumer_page_serialization() {
        let page = ConsumerPage::empty();
        assert!(page.is_last());

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["consumers"], serde_json::json!([]));
        assert!(json["nextCursor"].is_null());
    }
}
