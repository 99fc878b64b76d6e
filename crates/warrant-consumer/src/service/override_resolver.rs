//! Effective content override resolution
//!
//! Overrides are layered from least to most specific: the consumer's
//! environments in ascending rank, then the consumer itself. A later layer
//! replaces the value of an earlier one for the same (content label, name).

use std::sync::Arc;

use tracing::debug;
use warrant_common::{WarrantError, is_blank};
use warrant_persistence::{ConsumerInfo, EnvironmentInfo, OverrideParent, PersistenceService};

use crate::model::EffectiveOverrides;

/// Resolves the effective content overrides of consumers
pub struct OverrideResolver {
    persistence: Arc<dyn PersistenceService>,
}

impl OverrideResolver {
    pub fn new(persistence: Arc<dyn PersistenceService>) -> Self {
        Self { persistence }
    }

    /// Effective overrides of the consumer with the given id.
    ///
    /// Fails with `InvalidArgument` for a blank id and `NotFound` when the
    /// consumer does not exist. A consumer without environments or overrides
    /// resolves to an empty mapping.
    pub async fn resolve_effective_overrides(
        &self,
        consumer_id: &str,
    ) -> Result<EffectiveOverrides, WarrantError> {
        if is_blank(Some(consumer_id)) {
            return Err(WarrantError::InvalidArgument(
                "consumer id is required".to_string(),
            ));
        }

        let consumer = self
            .persistence
            .consumer_find_by_id(consumer_id)
            .await?
            .ok_or_else(|| WarrantError::NotFound(format!("consumer '{}'", consumer_id)))?;

        self.resolve_for_consumer(&consumer).await
    }

    /// Effective overrides of an already loaded consumer
    pub async fn resolve_for_consumer(
        &self,
        consumer: &ConsumerInfo,
    ) -> Result<EffectiveOverrides, WarrantError> {
        let mut effective = EffectiveOverrides::new();

        let mut environments: Vec<&EnvironmentInfo> = consumer.environments.iter().collect();
        environments.sort_by_key(|e| e.rank);

        for env in environments {
            let layer = self
                .persistence
                .override_find_by_parent(&OverrideParent::Environment(env.id.clone()))
                .await?;
            for o in layer {
                effective.insert(o.key(), o.value().to_string());
            }
        }

        let own = self
            .persistence
            .override_find_by_parent(&OverrideParent::Consumer(consumer.id.clone()))
            .await?;
        for o in own {
            effective.insert(o.key(), o.value().to_string());
        }

        debug!(
            consumer_id = %consumer.id,
            environments = consumer.environments.len(),
            overrides = effective.len(),
            "Resolved effective content overrides"
        );

        Ok(effective)
    }
}
