//! Content override management for consumers and environments

use std::sync::Arc;

use tracing::{debug, info};
use warrant_common::{WarrantError, is_blank};
use warrant_persistence::{ContentOverride, OverrideParent, PersistenceService};

use crate::model::ContentOverrideDto;
use crate::validator::ContentOverrideValidator;

/// Manages the content overrides of one parent at a time
pub struct ContentOverrideService {
    persistence: Arc<dyn PersistenceService>,
    validator: ContentOverrideValidator,
}

impl ContentOverrideService {
    pub fn new(
        persistence: Arc<dyn PersistenceService>,
        validator: ContentOverrideValidator,
    ) -> Self {
        Self {
            persistence,
            validator,
        }
    }

    async fn ensure_parent(&self, parent: &OverrideParent) -> Result<(), WarrantError> {
        let exists = match parent {
            OverrideParent::Consumer(id) => {
                self.persistence.consumer_find_by_id(id).await?.is_some()
            }
            OverrideParent::Environment(id) => {
                self.persistence.environment_find_by_id(id).await?.is_some()
            }
        };

        if exists {
            Ok(())
        } else {
            Err(WarrantError::NotFound(parent.to_string()))
        }
    }

    async fn current(
        &self,
        parent: &OverrideParent,
    ) -> Result<Vec<ContentOverrideDto>, WarrantError> {
        Ok(self
            .persistence
            .override_find_by_parent(parent)
            .await?
            .iter()
            .map(ContentOverrideDto::from)
            .collect())
    }

    /// All overrides of the parent ordered by content label, then name
    pub async fn list(
        &self,
        parent: &OverrideParent,
    ) -> Result<Vec<ContentOverrideDto>, WarrantError> {
        self.ensure_parent(parent).await?;
        self.current(parent).await
    }

    /// Add or update overrides, then return the parent's full list.
    ///
    /// Every entry is validated before anything is written, and the entries
    /// are saved in one atomic write: either all of them are stored or none.
    pub async fn add(
        &self,
        parent: &OverrideParent,
        entries: &[ContentOverrideDto],
    ) -> Result<Vec<ContentOverrideDto>, WarrantError> {
        self.validator.validate(entries)?;
        self.ensure_parent(parent).await?;

        let overrides = entries
            .iter()
            .map(|entry| entry.to_override(parent))
            .collect::<Result<Vec<ContentOverride>, _>>()?;

        self.persistence.override_upsert_all(&overrides).await?;

        info!(parent = %parent, count = overrides.len(), "Content overrides saved");
        self.current(parent).await
    }

    /// Remove overrides, then return what is left.
    ///
    /// An empty request, or an entry without a content label, removes every
    /// override of the parent. An entry with a label but no name removes all
    /// overrides of that label. Otherwise the single (label, name) override
    /// is removed.
    pub async fn delete(
        &self,
        parent: &OverrideParent,
        entries: &[ContentOverrideDto],
    ) -> Result<Vec<ContentOverrideDto>, WarrantError> {
        self.ensure_parent(parent).await?;

        let mut removed = 0u64;
        if entries.is_empty() {
            removed += self.persistence.override_remove_by_parent(parent).await?;
        } else {
            for entry in entries {
                let label = entry.content_label.as_deref();
                let name = entry.name.as_deref();

                match (label, name) {
                    (l, _) if is_blank(l) => {
                        removed += self.persistence.override_remove_by_parent(parent).await?;
                        break;
                    }
                    (Some(l), n) if is_blank(n) => {
                        removed += self
                            .persistence
                            .override_remove_by_content_label(parent, l)
                            .await?;
                    }
                    (Some(l), Some(n)) => {
                        removed += self
                            .persistence
                            .override_remove_by_name(parent, l, n)
                            .await?;
                    }
                    _ => {}
                }
            }
        }

        debug!(parent = %parent, removed, "Content overrides removed");
        self.current(parent).await
    }
}
