//! Content override persistence trait
//!
//! Overrides are addressed by their parent (consumer or environment), content
//! label and property name. Names are matched case-insensitively.

use async_trait::async_trait;

use crate::model::{ContentOverride, OverrideParent};

/// Content override persistence operations
#[async_trait]
pub trait ContentOverridePersistence: Send + Sync {
    /// All overrides of a parent ordered by content label, then name
    async fn override_find_by_parent(
        &self,
        parent: &OverrideParent,
    ) -> anyhow::Result<Vec<ContentOverride>>;

    /// A single override of a parent
    async fn override_retrieve(
        &self,
        parent: &OverrideParent,
        content_label: &str,
        name: &str,
    ) -> anyhow::Result<Option<ContentOverride>>;

    /// Create the override, or replace the value of the existing one with the
    /// same parent, label and name.
    ///
    /// Fails with `InvalidArgument` when the override has no parent and with
    /// `NotFound` when the parent does not exist.
    async fn override_upsert(
        &self,
        content_override: &ContentOverride,
    ) -> anyhow::Result<ContentOverride>;

    /// Upsert several overrides as one atomic write.
    ///
    /// Every parent is checked before anything is written; either all
    /// overrides are saved or none is. Results are returned in input order.
    async fn override_upsert_all(
        &self,
        overrides: &[ContentOverride],
    ) -> anyhow::Result<Vec<ContentOverride>>;

    /// Remove one override, returning the number of removed rows
    async fn override_remove_by_name(
        &self,
        parent: &OverrideParent,
        content_label: &str,
        name: &str,
    ) -> anyhow::Result<u64>;

    /// Remove every override of a parent with the given content label
    async fn override_remove_by_content_label(
        &self,
        parent: &OverrideParent,
        content_label: &str,
    ) -> anyhow::Result<u64>;

    /// Remove every override of a parent
    async fn override_remove_by_parent(&self, parent: &OverrideParent) -> anyhow::Result<u64>;
}
