//! Environment persistence trait

use async_trait::async_trait;

use crate::model::EnvironmentInfo;

/// Environment persistence operations
#[async_trait]
pub trait EnvironmentPersistence: Send + Sync {
    /// Create an environment under an owner.
    ///
    /// Fails with `InvalidArgument` when the rank is already used within the
    /// owner, and with `NotFound` when the owner does not exist.
    async fn environment_create(
        &self,
        owner_id: &str,
        name: &str,
        rank: i32,
    ) -> anyhow::Result<EnvironmentInfo>;

    /// Get an environment by its ID
    async fn environment_find_by_id(
        &self,
        environment_id: &str,
    ) -> anyhow::Result<Option<EnvironmentInfo>>;

    /// All environments of an owner in ascending rank
    async fn environment_find_by_owner(
        &self,
        owner_id: &str,
    ) -> anyhow::Result<Vec<EnvironmentInfo>>;

    /// Delete an environment, its overrides and its consumer assignments
    async fn environment_delete(&self, environment_id: &str) -> anyhow::Result<bool>;
}
