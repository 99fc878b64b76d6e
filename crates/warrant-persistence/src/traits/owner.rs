//! Owner persistence trait

use async_trait::async_trait;

use crate::model::OwnerInfo;

/// Owner persistence operations
#[async_trait]
pub trait OwnerPersistence: Send + Sync {
    /// Create a new owner. The key must be unique.
    async fn owner_create(&self, key: &str, display_name: &str) -> anyhow::Result<OwnerInfo>;

    /// Get an owner by its ID
    async fn owner_find_by_id(&self, owner_id: &str) -> anyhow::Result<Option<OwnerInfo>>;

    /// Get an owner by its natural key
    async fn owner_find_by_key(&self, key: &str) -> anyhow::Result<Option<OwnerInfo>>;

    /// Delete an owner together with its environments, consumers and their overrides
    async fn owner_delete(&self, owner_id: &str) -> anyhow::Result<bool>;
}
