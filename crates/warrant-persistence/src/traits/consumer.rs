//! Consumer persistence trait

use async_trait::async_trait;

use crate::model::{ConsumerCursor, ConsumerInfo};

/// Consumer persistence operations
#[async_trait]
pub trait ConsumerPersistence: Send + Sync {
    /// Create a consumer under an owner. A new id is generated when `id` is `None`.
    async fn consumer_create(
        &self,
        id: Option<&str>,
        owner_id: &str,
        name: &str,
        last_checkin: Option<i64>,
    ) -> anyhow::Result<ConsumerInfo>;

    /// Get a consumer by its ID, environments included in ascending rank
    async fn consumer_find_by_id(&self, consumer_id: &str) -> anyhow::Result<Option<ConsumerInfo>>;

    /// Record a check-in
    async fn consumer_update_checkin(
        &self,
        consumer_id: &str,
        last_checkin: i64,
    ) -> anyhow::Result<bool>;

    /// Delete a consumer with its overrides and environment assignments
    async fn consumer_delete(&self, consumer_id: &str) -> anyhow::Result<bool>;

    /// Replace the environments assigned to a consumer.
    ///
    /// Every environment must exist and belong to the consumer's owner.
    async fn consumer_set_environments(
        &self,
        consumer_id: &str,
        environment_ids: &[String],
    ) -> anyhow::Result<()>;

    /// One page of an owner's consumers ordered by id ascending, then last
    /// check-in ascending with "never checked in" first.
    ///
    /// With `after`, only consumers whose id is strictly greater than
    /// `after.after_id` are returned. At most `limit` rows are returned.
    async fn consumer_find_page(
        &self,
        owner_id: &str,
        after: Option<&ConsumerCursor>,
        limit: u64,
    ) -> anyhow::Result<Vec<ConsumerInfo>>;
}
