//! SQL-based persistence backend (MySQL/PostgreSQL via SeaORM)
//!
//! This module implements the `PersistenceService` trait directly on top of
//! the SeaORM entities in `crate::entity`.

pub mod schema;

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sea_orm::{prelude::Expr, sea_query::NullOrdering, *};
use warrant_common::{WarrantError, generate_id, is_valid_key, now_millis};

use crate::entity::{consumer, consumer_environment, content_override, environment, owner};
use crate::model::*;
use crate::traits::*;

/// External database persistence service
///
/// Wraps a SeaORM `DatabaseConnection` and implements all persistence traits
/// with direct database queries.
pub struct ExternalDbPersistService {
    db: DatabaseConnection,
}

impl ExternalDbPersistService {
    /// Create a new ExternalDbPersistService with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Environments assigned to each of the given consumers, in ascending rank
    async fn load_environments<C: ConnectionTrait>(
        conn: &C,
        consumer_ids: &[String],
    ) -> anyhow::Result<HashMap<String, Vec<EnvironmentInfo>>> {
        let mut result: HashMap<String, Vec<EnvironmentInfo>> = HashMap::new();
        if consumer_ids.is_empty() {
            return Ok(result);
        }

        let links = consumer_environment::Entity::find()
            .filter(consumer_environment::Column::ConsumerId.is_in(consumer_ids.iter().cloned()))
            .all(conn)
            .await?;
        if links.is_empty() {
            return Ok(result);
        }

        let environment_ids: BTreeSet<String> =
            links.iter().map(|l| l.environment_id.clone()).collect();
        let environments: HashMap<String, EnvironmentInfo> = environment::Entity::find()
            .filter(environment::Column::Id.is_in(environment_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), environment_to_info(m)))
            .collect();

        for link in links {
            if let Some(env) = environments.get(&link.environment_id) {
                result
                    .entry(link.consumer_id)
                    .or_default()
                    .push(env.clone());
            }
        }
        for list in result.values_mut() {
            list.sort_by_key(|e| e.rank);
        }

        Ok(result)
    }

    /// Parent of every override; fails before anything is written when one
    /// is missing or unknown
    async fn override_parents(
        &self,
        overrides: &[ContentOverride],
    ) -> anyhow::Result<Vec<OverrideParent>> {
        let mut parents: Vec<OverrideParent> = Vec::with_capacity(overrides.len());
        for o in overrides {
            let parent = o.parent().ok_or_else(|| {
                WarrantError::InvalidArgument("content override has no parent".to_string())
            })?;
            if !parents.contains(&parent) && !self.parent_exists(&parent).await? {
                return Err(WarrantError::NotFound(parent.to_string()).into());
            }
            parents.push(parent);
        }
        Ok(parents)
    }

    /// Update or insert every override inside one transaction
    async fn write_overrides(
        &self,
        overrides: &[ContentOverride],
        parents: &[OverrideParent],
    ) -> Result<Vec<content_override::Model>, DbErr> {
        let tx = self.db.begin().await?;
        let now = now_millis();
        let mut saved = Vec::with_capacity(overrides.len());

        for (o, parent) in overrides.iter().zip(parents) {
            let existing = content_override::Entity::find()
                .filter(parent_condition(parent))
                .filter(content_override::Column::ContentLabel.eq(o.content_label()))
                .filter(content_override::Column::Name.eq(o.name()))
                .one(&tx)
                .await?;

            let model = match existing {
                Some(entity) => {
                    let mut active: content_override::ActiveModel = entity.into();
                    active.value = Set(o.value().to_string());
                    active.modified_time = Set(now);
                    active.update(&tx).await?
                }
                None => {
                    let (consumer_id, environment_id) = match parent {
                        OverrideParent::Consumer(id) => (Some(id.clone()), None),
                        OverrideParent::Environment(id) => (None, Some(id.clone())),
                    };
                    content_override::ActiveModel {
                        id: Set(generate_id()),
                        override_kind: Set(parent.kind().as_str().to_string()),
                        consumer_id: Set(consumer_id),
                        environment_id: Set(environment_id),
                        content_label: Set(o.content_label().to_string()),
                        name: Set(o.name().to_string()),
                        value: Set(o.value().to_string()),
                        created_time: Set(now),
                        modified_time: Set(now),
                    }
                    .insert(&tx)
                    .await?
                }
            };
            saved.push(model);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn parent_exists(&self, parent: &OverrideParent) -> anyhow::Result<bool> {
        let count = match parent {
            OverrideParent::Consumer(id) => {
                consumer::Entity::find_by_id(id.as_str())
                    .count(&self.db)
                    .await?
            }
            OverrideParent::Environment(id) => {
                environment::Entity::find_by_id(id.as_str())
                    .count(&self.db)
                    .await?
            }
        };
        Ok(count > 0)
    }
}

fn owner_to_info(m: owner::Model) -> OwnerInfo {
    OwnerInfo {
        id: m.id,
        key: m.owner_key,
        display_name: m.display_name,
        created_time: m.created_time,
        modified_time: m.modified_time,
    }
}

fn environment_to_info(m: environment::Model) -> EnvironmentInfo {
    EnvironmentInfo {
        id: m.id,
        owner_id: m.owner_id,
        name: m.name,
        rank: m.env_rank,
        created_time: m.created_time,
        modified_time: m.modified_time,
    }
}

fn consumer_to_info(m: consumer::Model, environments: Vec<EnvironmentInfo>) -> ConsumerInfo {
    ConsumerInfo {
        id: m.id,
        uuid: m.uuid,
        owner_id: m.owner_id,
        name: m.name,
        last_checkin: m.last_checkin,
        environments,
        created_time: m.created_time,
        modified_time: m.modified_time,
    }
}

fn override_to_model(m: content_override::Model) -> anyhow::Result<ContentOverride> {
    let kind: OverrideKind = m.override_kind.parse().map_err(anyhow::Error::msg)?;
    let parent_id = match kind {
        OverrideKind::Consumer => m.consumer_id,
        OverrideKind::Environment => m.environment_id,
    };

    Ok(ContentOverride {
        id: Some(m.id),
        kind,
        parent_id,
        content_label: m.content_label,
        name: m.name,
        value: m.value,
        created_time: m.created_time,
        modified_time: m.modified_time,
    })
}

/// Rows belonging to one override parent
fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn rank_taken(owner_id: &str, rank: i32) -> anyhow::Error {
    WarrantError::InvalidArgument(format!(
        "rank {} is already used by another environment of owner '{}'",
        rank, owner_id
    ))
    .into()
}

fn parent_condition(parent: &OverrideParent) -> Condition {
    let kind = content_override::Column::OverrideKind.eq(parent.kind().as_str());
    match parent {
        OverrideParent::Consumer(id) => Condition::all()
            .add(kind)
            .add(content_override::Column::ConsumerId.eq(id.as_str())),
        OverrideParent::Environment(id) => Condition::all()
            .add(kind)
            .add(content_override::Column::EnvironmentId.eq(id.as_str())),
    }
}

// ============================================================================
// PersistenceService implementation
// ============================================================================

#[async_trait]
impl PersistenceService for ExternalDbPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        // Execute a simple query to verify connectivity
        owner::Entity::find()
            .select_only()
            .column_as(Expr::cust("1"), "health")
            .into_tuple::<i32>()
            .one(&self.db)
            .await?;
        Ok(())
    }
}

// ============================================================================
// OwnerPersistence implementation
// ============================================================================

#[async_trait]
impl OwnerPersistence for ExternalDbPersistService {
    async fn owner_create(&self, key: &str, display_name: &str) -> anyhow::Result<OwnerInfo> {
        if !is_valid_key(key) {
            return Err(WarrantError::InvalidArgument(format!("invalid owner key '{}'", key)).into());
        }

        let exists = owner::Entity::find()
            .filter(owner::Column::OwnerKey.eq(key))
            .count(&self.db)
            .await?
            > 0;
        if exists {
            return Err(
                WarrantError::InvalidArgument(format!("owner key '{}' already exists", key)).into(),
            );
        }

        let now = now_millis();
        let model = owner::ActiveModel {
            id: Set(generate_id()),
            owner_key: Set(key.to_string()),
            display_name: Set(display_name.to_string()),
            created_time: Set(now),
            modified_time: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(owner_to_info(model))
    }

    async fn owner_find_by_id(&self, owner_id: &str) -> anyhow::Result<Option<OwnerInfo>> {
        Ok(owner::Entity::find_by_id(owner_id)
            .one(&self.db)
            .await?
            .map(owner_to_info))
    }

    async fn owner_find_by_key(&self, key: &str) -> anyhow::Result<Option<OwnerInfo>> {
        Ok(owner::Entity::find()
            .filter(owner::Column::OwnerKey.eq(key))
            .one(&self.db)
            .await?
            .map(owner_to_info))
    }

    async fn owner_delete(&self, owner_id: &str) -> anyhow::Result<bool> {
        let tx = self.db.begin().await?;

        let consumer_ids: Vec<String> = consumer::Entity::find()
            .select_only()
            .column(consumer::Column::Id)
            .filter(consumer::Column::OwnerId.eq(owner_id))
            .into_tuple::<String>()
            .all(&tx)
            .await?;
        let environment_ids: Vec<String> = environment::Entity::find()
            .select_only()
            .column(environment::Column::Id)
            .filter(environment::Column::OwnerId.eq(owner_id))
            .into_tuple::<String>()
            .all(&tx)
            .await?;

        content_override::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(content_override::Column::ConsumerId.is_in(consumer_ids.clone()))
                    .add(content_override::Column::EnvironmentId.is_in(environment_ids.clone())),
            )
            .exec(&tx)
            .await?;
        consumer_environment::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(consumer_environment::Column::ConsumerId.is_in(consumer_ids))
                    .add(consumer_environment::Column::EnvironmentId.is_in(environment_ids)),
            )
            .exec(&tx)
            .await?;
        consumer::Entity::delete_many()
            .filter(consumer::Column::OwnerId.eq(owner_id))
            .exec(&tx)
            .await?;
        environment::Entity::delete_many()
            .filter(environment::Column::OwnerId.eq(owner_id))
            .exec(&tx)
            .await?;
        let result = owner::Entity::delete_by_id(owner_id).exec(&tx).await?;

        tx.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

// ============================================================================
// EnvironmentPersistence implementation
// ============================================================================

#[async_trait]
impl EnvironmentPersistence for ExternalDbPersistService {
    async fn environment_create(
        &self,
        owner_id: &str,
        name: &str,
        rank: i32,
    ) -> anyhow::Result<EnvironmentInfo> {
        if owner::Entity::find_by_id(owner_id)
            .count(&self.db)
            .await?
            == 0
        {
            return Err(WarrantError::NotFound(format!("owner '{}'", owner_id)).into());
        }

        let taken = environment::Entity::find()
            .filter(environment::Column::OwnerId.eq(owner_id))
            .filter(environment::Column::EnvRank.eq(rank))
            .count(&self.db)
            .await?
            > 0;
        if taken {
            return Err(rank_taken(owner_id, rank));
        }

        let now = now_millis();
        let model = environment::ActiveModel {
            id: Set(generate_id()),
            owner_id: Set(owner_id.to_string()),
            name: Set(name.to_string()),
            env_rank: Set(rank),
            created_time: Set(now),
            modified_time: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                rank_taken(owner_id, rank)
            } else {
                e.into()
            }
        })?;

        Ok(environment_to_info(model))
    }

    async fn environment_find_by_id(
        &self,
        environment_id: &str,
    ) -> anyhow::Result<Option<EnvironmentInfo>> {
        Ok(environment::Entity::find_by_id(environment_id)
            .one(&self.db)
            .await?
            .map(environment_to_info))
    }

    async fn environment_find_by_owner(
        &self,
        owner_id: &str,
    ) -> anyhow::Result<Vec<EnvironmentInfo>> {
        Ok(environment::Entity::find()
            .filter(environment::Column::OwnerId.eq(owner_id))
            .order_by_asc(environment::Column::EnvRank)
            .all(&self.db)
            .await?
            .into_iter()
            .map(environment_to_info)
            .collect())
    }

    async fn environment_delete(&self, environment_id: &str) -> anyhow::Result<bool> {
        let tx = self.db.begin().await?;

        content_override::Entity::delete_many()
            .filter(parent_condition(&OverrideParent::Environment(
                environment_id.to_string(),
            )))
            .exec(&tx)
            .await?;
        consumer_environment::Entity::delete_many()
            .filter(consumer_environment::Column::EnvironmentId.eq(environment_id))
            .exec(&tx)
            .await?;
        let result = environment::Entity::delete_by_id(environment_id)
            .exec(&tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

// ============================================================================
// ConsumerPersistence implementation
// ============================================================================

#[async_trait]
impl ConsumerPersistence for ExternalDbPersistService {
    async fn consumer_create(
        &self,
        id: Option<&str>,
        owner_id: &str,
        name: &str,
        last_checkin: Option<i64>,
    ) -> anyhow::Result<ConsumerInfo> {
        if owner::Entity::find_by_id(owner_id)
            .count(&self.db)
            .await?
            == 0
        {
            return Err(WarrantError::NotFound(format!("owner '{}'", owner_id)).into());
        }

        let id = id.map(str::to_string).unwrap_or_else(generate_id);
        if !is_valid_key(&id) {
            return Err(WarrantError::InvalidArgument(format!("invalid consumer id '{}'", id)).into());
        }
        if consumer::Entity::find_by_id(id.as_str())
            .count(&self.db)
            .await?
            > 0
        {
            return Err(
                WarrantError::InvalidArgument(format!("consumer '{}' already exists", id)).into(),
            );
        }

        let now = now_millis();
        let model = consumer::ActiveModel {
            id: Set(id),
            uuid: Set(generate_id()),
            owner_id: Set(owner_id.to_string()),
            name: Set(name.to_string()),
            last_checkin: Set(last_checkin),
            created_time: Set(now),
            modified_time: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(consumer_to_info(model, Vec::new()))
    }

    async fn consumer_find_by_id(&self, consumer_id: &str) -> anyhow::Result<Option<ConsumerInfo>> {
        let Some(model) = consumer::Entity::find_by_id(consumer_id)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut environments =
            Self::load_environments(&self.db, &[consumer_id.to_string()]).await?;
        let environments = environments.remove(consumer_id).unwrap_or_default();

        Ok(Some(consumer_to_info(model, environments)))
    }

    async fn consumer_update_checkin(
        &self,
        consumer_id: &str,
        last_checkin: i64,
    ) -> anyhow::Result<bool> {
        match consumer::Entity::find_by_id(consumer_id)
            .one(&self.db)
            .await?
        {
            Some(entity) => {
                let mut active: consumer::ActiveModel = entity.into();
                active.last_checkin = Set(Some(last_checkin));
                active.modified_time = Set(now_millis());
                active.update(&self.db).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consumer_delete(&self, consumer_id: &str) -> anyhow::Result<bool> {
        let tx = self.db.begin().await?;

        content_override::Entity::delete_many()
            .filter(parent_condition(&OverrideParent::Consumer(
                consumer_id.to_string(),
            )))
            .exec(&tx)
            .await?;
        consumer_environment::Entity::delete_many()
            .filter(consumer_environment::Column::ConsumerId.eq(consumer_id))
            .exec(&tx)
            .await?;
        let result = consumer::Entity::delete_by_id(consumer_id).exec(&tx).await?;

        tx.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn consumer_set_environments(
        &self,
        consumer_id: &str,
        environment_ids: &[String],
    ) -> anyhow::Result<()> {
        let consumer = consumer::Entity::find_by_id(consumer_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| WarrantError::NotFound(format!("consumer '{}'", consumer_id)))?;

        let unique_ids: BTreeSet<&String> = environment_ids.iter().collect();
        for environment_id in &unique_ids {
            let env = environment::Entity::find_by_id(environment_id.as_str())
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    WarrantError::NotFound(format!("environment '{}'", environment_id))
                })?;
            if env.owner_id != consumer.owner_id {
                return Err(WarrantError::InvalidArgument(format!(
                    "environment '{}' does not belong to the owner of consumer '{}'",
                    environment_id, consumer_id
                ))
                .into());
            }
        }

        let tx = self.db.begin().await?;
        consumer_environment::Entity::delete_many()
            .filter(consumer_environment::Column::ConsumerId.eq(consumer_id))
            .exec(&tx)
            .await?;
        if !unique_ids.is_empty() {
            let links = unique_ids
                .into_iter()
                .map(|environment_id| consumer_environment::ActiveModel {
                    consumer_id: Set(consumer_id.to_string()),
                    environment_id: Set(environment_id.clone()),
                });
            consumer_environment::Entity::insert_many(links)
                .exec_without_returning(&tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!(consumer_id, count = environment_ids.len(), "Consumer environments replaced");
        Ok(())
    }

    async fn consumer_find_page(
        &self,
        owner_id: &str,
        after: Option<&ConsumerCursor>,
        limit: u64,
    ) -> anyhow::Result<Vec<ConsumerInfo>> {
        let mut query = consumer::Entity::find().filter(consumer::Column::OwnerId.eq(owner_id));
        if let Some(after) = after {
            query = query.filter(consumer::Column::Id.gt(after.after_id.as_str()));
        }

        let models = query
            .order_by_asc(consumer::Column::Id)
            .order_by_with_nulls(
                consumer::Column::LastCheckin,
                Order::Asc,
                NullOrdering::First,
            )
            .limit(limit)
            .all(&self.db)
            .await?;

        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let mut environments = Self::load_environments(&self.db, &ids).await?;

        Ok(models
            .into_iter()
            .map(|m| {
                let envs = environments.remove(&m.id).unwrap_or_default();
                consumer_to_info(m, envs)
            })
            .collect())
    }
}

// ============================================================================
// ContentOverridePersistence implementation
// ============================================================================

#[async_trait]
impl ContentOverridePersistence for ExternalDbPersistService {
    async fn override_find_by_parent(
        &self,
        parent: &OverrideParent,
    ) -> anyhow::Result<Vec<ContentOverride>> {
        content_override::Entity::find()
            .filter(parent_condition(parent))
            .order_by_asc(content_override::Column::ContentLabel)
            .order_by_asc(content_override::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(override_to_model)
            .collect()
    }

    async fn override_retrieve(
        &self,
        parent: &OverrideParent,
        content_label: &str,
        name: &str,
    ) -> anyhow::Result<Option<ContentOverride>> {
        content_override::Entity::find()
            .filter(parent_condition(parent))
            .filter(content_override::Column::ContentLabel.eq(content_label))
            .filter(content_override::Column::Name.eq(name.to_lowercase()))
            .one(&self.db)
            .await?
            .map(override_to_model)
            .transpose()
    }

    async fn override_upsert(
        &self,
        content_override: &ContentOverride,
    ) -> anyhow::Result<ContentOverride> {
        self.override_upsert_all(std::slice::from_ref(content_override))
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("content override was not saved"))
    }

    async fn override_upsert_all(
        &self,
        overrides: &[ContentOverride],
    ) -> anyhow::Result<Vec<ContentOverride>> {
        let parents = self.override_parents(overrides).await?;
        if overrides.is_empty() {
            return Ok(Vec::new());
        }

        let models = match self.write_overrides(overrides, &parents).await {
            // Another writer inserted one of the keys first; the retry updates it
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!("Content override inserted concurrently, retrying as update");
                self.write_overrides(overrides, &parents).await?
            }
            result => result?,
        };

        models.into_iter().map(override_to_model).collect()
    }

    async fn override_remove_by_name(
        &self,
        parent: &OverrideParent,
        content_label: &str,
        name: &str,
    ) -> anyhow::Result<u64> {
        let result = content_override::Entity::delete_many()
            .filter(parent_condition(parent))
            .filter(content_override::Column::ContentLabel.eq(content_label))
            .filter(content_override::Column::Name.eq(name.to_lowercase()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn override_remove_by_content_label(
        &self,
        parent: &OverrideParent,
        content_label: &str,
    ) -> anyhow::Result<u64> {
        let result = content_override::Entity::delete_many()
            .filter(parent_condition(parent))
            .filter(content_override::Column::ContentLabel.eq(content_label))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn override_remove_by_parent(&self, parent: &OverrideParent) -> anyhow::Result<u64> {
        let result = content_override::Entity::delete_many()
            .filter(parent_condition(parent))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_service() -> (ExternalDbPersistService, TempDir) {
        let tmp_dir = TempDir::new().unwrap();
        let url = format!(
            "sqlite://{}?mode=rwc",
            tmp_dir.path().join("warrant.db").display()
        );
        let db = Database::connect(url).await.unwrap();
        schema::create_tables(&db).await.unwrap();
        (ExternalDbPersistService::new(db), tmp_dir)
    }

    // ==================== Owner Tests ====================

    #[tokio::test]
    async fn test_owner_create_and_find() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme Corp").await.unwrap();
        assert_eq!(owner.key, "acme");
        assert!(owner.created_time > 0);

        let by_id = svc.owner_find_by_id(&owner.id).await.unwrap().unwrap();
        assert_eq!(by_id, owner);
        let by_key = svc.owner_find_by_key("acme").await.unwrap().unwrap();
        assert_eq!(by_key.id, owner.id);

        assert!(svc.owner_find_by_key("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_owner_duplicate_key_rejected() {
        let (svc, _tmp) = create_test_service().await;

        svc.owner_create("acme", "Acme").await.unwrap();
        let err = WarrantError::from(svc.owner_create("acme", "Other").await.unwrap_err());
        assert!(matches!(err, WarrantError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_owner_delete_cascades() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        let env = svc.environment_create(&owner.id, "dev", 1).await.unwrap();
        let consumer = svc
            .consumer_create(Some("c1"), &owner.id, "host", None)
            .await
            .unwrap();
        svc.consumer_set_environments(&consumer.id, &[env.id.clone()])
            .await
            .unwrap();
        let parent = OverrideParent::Consumer(consumer.id.clone());
        let o = ContentOverride::for_parent(&parent, "repo", "enabled", "1").unwrap();
        svc.override_upsert(&o).await.unwrap();

        assert!(svc.owner_delete(&owner.id).await.unwrap());
        assert!(svc.consumer_find_by_id("c1").await.unwrap().is_none());
        assert!(svc.environment_find_by_id(&env.id).await.unwrap().is_none());
        assert!(svc.override_find_by_parent(&parent).await.unwrap().is_empty());
        assert!(!svc.owner_delete(&owner.id).await.unwrap());
    }

    // ==================== Environment Tests ====================

    #[tokio::test]
    async fn test_environment_rank_unique_per_owner() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        let other = svc.owner_create("other", "Other").await.unwrap();
        svc.environment_create(&owner.id, "dev", 1).await.unwrap();

        let err = WarrantError::from(
            svc.environment_create(&owner.id, "qa", 1)
                .await
                .unwrap_err(),
        );
        assert!(matches!(err, WarrantError::InvalidArgument(_)));

        // Same rank under another owner is fine
        svc.environment_create(&other.id, "dev", 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_environment_find_by_owner_sorted_by_rank() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        svc.environment_create(&owner.id, "prod", 3).await.unwrap();
        svc.environment_create(&owner.id, "dev", 1).await.unwrap();
        svc.environment_create(&owner.id, "qa", 2).await.unwrap();

        let names: Vec<String> = svc
            .environment_find_by_owner(&owner.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["dev", "qa", "prod"]);
    }

    #[tokio::test]
    async fn test_environment_create_unknown_owner() {
        let (svc, _tmp) = create_test_service().await;

        let err = WarrantError::from(svc.environment_create("nope", "dev", 1).await.unwrap_err());
        assert!(err.is_not_found());
    }

    // ==================== Consumer Tests ====================

    #[tokio::test]
    async fn test_consumer_environments_in_rank_order() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        let high = svc.environment_create(&owner.id, "high", 5).await.unwrap();
        let low = svc.environment_create(&owner.id, "low", 1).await.unwrap();
        svc.consumer_create(Some("c1"), &owner.id, "host", None)
            .await
            .unwrap();

        svc.consumer_set_environments("c1", &[high.id.clone(), low.id.clone()])
            .await
            .unwrap();

        let consumer = svc.consumer_find_by_id("c1").await.unwrap().unwrap();
        let ranks: Vec<i32> = consumer.environments.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 5]);
    }

    #[tokio::test]
    async fn test_consumer_set_environments_rejects_foreign_owner() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        let other = svc.owner_create("other", "Other").await.unwrap();
        let foreign = svc.environment_create(&other.id, "dev", 1).await.unwrap();
        svc.consumer_create(Some("c1"), &owner.id, "host", None)
            .await
            .unwrap();

        let err = WarrantError::from(
            svc.consumer_set_environments("c1", &[foreign.id])
                .await
                .unwrap_err(),
        );
        assert!(matches!(err, WarrantError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_consumer_update_checkin() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        svc.consumer_create(Some("c1"), &owner.id, "host", None)
            .await
            .unwrap();

        assert!(svc.consumer_update_checkin("c1", 42).await.unwrap());
        assert!(!svc.consumer_update_checkin("c2", 42).await.unwrap());

        let consumer = svc.consumer_find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(consumer.last_checkin, Some(42));
    }

    #[tokio::test]
    async fn test_consumer_find_page_keyset() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        let other = svc.owner_create("other", "Other").await.unwrap();
        for (id, checkin) in [
            ("c3", Some(30)),
            ("c1", None),
            ("c5", Some(10)),
            ("c2", Some(20)),
            ("c4", None),
        ] {
            svc.consumer_create(Some(id), &owner.id, id, checkin)
                .await
                .unwrap();
        }
        svc.consumer_create(Some("c0"), &other.id, "foreign", None)
            .await
            .unwrap();

        let first: Vec<String> = svc
            .consumer_find_page(&owner.id, None, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(first, vec!["c1", "c2"]);

        let cursor = ConsumerCursor::new("c3", Some(30));
        let rest: Vec<String> = svc
            .consumer_find_page(&owner.id, Some(&cursor), 10)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(rest, vec!["c4", "c5"]);

        assert_eq!(
            svc.consumer_find_page(&owner.id, None, 100)
                .await
                .unwrap()
                .len(),
            5
        );
        assert!(
            svc.consumer_find_page("unknown", None, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }

    // ==================== Content Override Tests ====================

    #[tokio::test]
    async fn test_override_upsert_replaces_value() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        svc.consumer_create(Some("c1"), &owner.id, "host", None)
            .await
            .unwrap();
        let parent = OverrideParent::Consumer("c1".to_string());

        let first = ContentOverride::for_parent(&parent, "repo", "Enabled", "1").unwrap();
        let saved = svc.override_upsert(&first).await.unwrap();
        assert!(saved.id().is_some());
        assert_eq!(saved.name(), "enabled");

        let second = ContentOverride::for_parent(&parent, "repo", "ENABLED", "0").unwrap();
        svc.override_upsert(&second).await.unwrap();

        let all = svc.override_find_by_parent(&parent).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value(), "0");
        assert_eq!(all[0].parent(), Some(parent));
    }

    #[tokio::test]
    async fn test_override_upsert_requires_parent() {
        let (svc, _tmp) = create_test_service().await;

        let o = ContentOverride::for_consumer("repo", "enabled", "1").unwrap();
        let err = WarrantError::from(svc.override_upsert(&o).await.unwrap_err());
        assert!(matches!(err, WarrantError::InvalidArgument(_)));

        let mut o = o;
        o.set_parent(Some("ghost"));
        let err = WarrantError::from(svc.override_upsert(&o).await.unwrap_err());
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_override_retrieve_case_insensitive() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        let env = svc.environment_create(&owner.id, "dev", 1).await.unwrap();
        let parent = OverrideParent::Environment(env.id.clone());
        let o = ContentOverride::for_parent(&parent, "repo", "gpgcheck", "0").unwrap();
        svc.override_upsert(&o).await.unwrap();

        let found = svc
            .override_retrieve(&parent, "repo", "GPGCheck")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.value(), "0");

        // Same id under the other kind does not match
        let as_consumer = OverrideParent::Consumer(env.id.clone());
        assert!(
            svc.override_retrieve(&as_consumer, "repo", "gpgcheck")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_override_remove_operations() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        svc.consumer_create(Some("c1"), &owner.id, "host", None)
            .await
            .unwrap();
        let parent = OverrideParent::Consumer("c1".to_string());
        for (label, name) in [("a", "x"), ("a", "y"), ("b", "x"), ("c", "z")] {
            let o = ContentOverride::for_parent(&parent, label, name, "v").unwrap();
            svc.override_upsert(&o).await.unwrap();
        }

        assert_eq!(
            svc.override_remove_by_name(&parent, "a", "X").await.unwrap(),
            1
        );
        assert_eq!(
            svc.override_remove_by_content_label(&parent, "b")
                .await
                .unwrap(),
            1
        );
        let remaining: Vec<String> = svc
            .override_find_by_parent(&parent)
            .await
            .unwrap()
            .iter()
            .map(|o| o.key().to_string())
            .collect();
        assert_eq!(remaining, vec!["a:y", "c:z"]);

        assert_eq!(svc.override_remove_by_parent(&parent).await.unwrap(), 2);
    }

    fn raw_override(consumer_id: &str, label: &str, name: &str) -> content_override::ActiveModel {
        content_override::ActiveModel {
            id: Set(generate_id()),
            override_kind: Set(OverrideKind::Consumer.as_str().to_string()),
            consumer_id: Set(Some(consumer_id.to_string())),
            environment_id: Set(None),
            content_label: Set(label.to_string()),
            name: Set(name.to_string()),
            value: Set("1".to_string()),
            created_time: Set(0),
            modified_time: Set(0),
        }
    }

    #[tokio::test]
    async fn test_schema_rejects_duplicate_override_key() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        svc.consumer_create(Some("c1"), &owner.id, "host", None)
            .await
            .unwrap();
        let env = svc.environment_create(&owner.id, "dev", 1).await.unwrap();

        raw_override("c1", "repo", "enabled")
            .insert(&svc.db)
            .await
            .unwrap();
        let err = raw_override("c1", "repo", "enabled")
            .insert(&svc.db)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        // The same key under another parent is a different override
        let mut other = raw_override("c1", "repo", "enabled");
        other.override_kind = Set(OverrideKind::Environment.as_str().to_string());
        other.consumer_id = Set(None);
        other.environment_id = Set(Some(env.id.clone()));
        other.insert(&svc.db).await.unwrap();

        let parent = OverrideParent::Consumer("c1".to_string());
        assert_eq!(svc.override_find_by_parent(&parent).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_schema_rejects_duplicate_environment_rank() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        svc.environment_create(&owner.id, "dev", 1).await.unwrap();

        let err = environment::ActiveModel {
            id: Set(generate_id()),
            owner_id: Set(owner.id.clone()),
            name: Set("qa".to_string()),
            env_rank: Set(1),
            created_time: Set(0),
            modified_time: Set(0),
        }
        .insert(&svc.db)
        .await
        .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_override_upsert_all_is_atomic() {
        let (svc, _tmp) = create_test_service().await;

        let owner = svc.owner_create("acme", "Acme").await.unwrap();
        svc.consumer_create(Some("c1"), &owner.id, "host", None)
            .await
            .unwrap();
        let parent = OverrideParent::Consumer("c1".to_string());
        let ghost = OverrideParent::Consumer("ghost".to_string());

        let err = svc
            .override_upsert_all(&[
                ContentOverride::for_parent(&parent, "repo", "enabled", "1").unwrap(),
                ContentOverride::for_parent(&ghost, "repo", "enabled", "1").unwrap(),
            ])
            .await
            .unwrap_err();
        assert!(WarrantError::from(err).is_not_found());
        assert!(svc.override_find_by_parent(&parent).await.unwrap().is_empty());

        let saved = svc
            .override_upsert_all(&[
                ContentOverride::for_parent(&parent, "repo", "enabled", "1").unwrap(),
                ContentOverride::for_parent(&parent, "repo", "gpgcheck", "0").unwrap(),
                ContentOverride::for_parent(&parent, "repo", "Enabled", "0").unwrap(),
            ])
            .await
            .unwrap();
        assert_eq!(saved.len(), 3);

        let all = svc.override_find_by_parent(&parent).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name(), "enabled");
        assert_eq!(all[0].value(), "0");
    }

    #[tokio::test]
    async fn test_health_check() {
        let (svc, _tmp) = create_test_service().await;
        svc.health_check().await.unwrap();
        assert_eq!(svc.storage_mode(), StorageMode::ExternalDb);
    }
}
