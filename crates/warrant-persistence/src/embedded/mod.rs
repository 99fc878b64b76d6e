// Embedded persistence backend using RocksDB
// Provides standalone (single-node) storage without an external database

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use warrant_common::{KEY_SEPARATOR, WarrantError, generate_id, is_valid_key, now_millis};

use crate::model::{
    ConsumerCursor, ConsumerInfo, ContentOverride, EnvironmentInfo, OverrideKind, OverrideParent,
    OwnerInfo, StorageMode,
};
use crate::traits::{
    ConsumerPersistence, ContentOverridePersistence, EnvironmentPersistence, OwnerPersistence,
    PersistenceService,
};

pub const CF_OWNERS: &str = "owners";
pub const CF_OWNER_KEYS: &str = "owner_keys";
pub const CF_ENVIRONMENTS: &str = "environments";
pub const CF_CONSUMERS: &str = "consumers";
pub const CF_CONSUMER_INDEX: &str = "consumer_index";
pub const CF_CONSUMER_ENVIRONMENTS: &str = "consumer_environments";
pub const CF_OVERRIDES: &str = "overrides";

const ALL_CFS: [&str; 7] = [
    CF_OWNERS,
    CF_OWNER_KEYS,
    CF_ENVIRONMENTS,
    CF_CONSUMERS,
    CF_CONSUMER_INDEX,
    CF_CONSUMER_ENVIRONMENTS,
    CF_OVERRIDES,
];

/// Standalone embedded persistence using RocksDB
///
/// Key layout:
/// - `consumers`: `owner_id@@consumer_id`, so an owner's consumers are
///   contiguous and sorted by id
/// - `consumer_index`: `consumer_id` -> `owner_id`
/// - `consumer_environments`: `consumer_id@@environment_id`
/// - `overrides`: `kind@@parent_id@@<label length>:content_label@@name`; the
///   length prefix keeps a label containing `@@` from running into the name
pub struct EmbeddedPersistService {
    db: Arc<DB>,
}

impl EmbeddedPersistService {
    /// Open (or create) a RocksDB database with every Warrant column family
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let mut cf_opts = Options::default();
        cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let cfs = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, cf_opts.clone()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cfs)
            .map_err(|e| anyhow::anyhow!("RocksDB open error: {}", e))?;

        tracing::info!(path = %path.as_ref().display(), "Embedded storage opened");
        Ok(Self::new(Arc::new(db)))
    }

    /// Create from a raw RocksDB instance
    pub fn new(db: Arc<DB>) -> Self {
        Self { db }
    }

    /// Get a column family handle
    fn cf(&self, name: &str) -> anyhow::Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| anyhow::anyhow!("Column family '{}' not found", name))
    }

    fn get_json(&self, cf_name: &str, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let cf = self.cf(cf_name)?;
        match self
            .db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| anyhow::anyhow!("RocksDB get error: {}", e))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_string(&self, cf_name: &str, key: &str) -> anyhow::Result<Option<String>> {
        let cf = self.cf(cf_name)?;
        Ok(self
            .db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| anyhow::anyhow!("RocksDB get error: {}", e))?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Write a JSON value to a column family
    fn put_json(&self, cf_name: &str, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        let cf = self.cf(cf_name)?;
        self.db
            .put_cf(cf, key.as_bytes(), value.to_string().as_bytes())
            .map_err(|e| anyhow::anyhow!("RocksDB put error: {}", e))
    }

    fn write(&self, batch: WriteBatch) -> anyhow::Result<()> {
        self.db
            .write(batch)
            .map_err(|e| anyhow::anyhow!("RocksDB write error: {}", e))
    }

    /// Every (key, value) of a column family whose key starts with `prefix`
    fn scan_prefix(&self, cf_name: &str, prefix: &str) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
        let cf = self.cf(cf_name)?;
        let mut entries = Vec::new();

        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );
        for item in iter {
            let (key, value) = item.map_err(|e| anyhow::anyhow!("RocksDB iterator error: {}", e))?;
            let key_str = String::from_utf8_lossy(&key);
            if !key_str.starts_with(prefix) {
                break;
            }
            entries.push((key_str.into_owned(), value.to_vec()));
        }

        Ok(entries)
    }

    fn consumer_key(owner_id: &str, consumer_id: &str) -> String {
        format!("{}{}{}", owner_id, KEY_SEPARATOR, consumer_id)
    }

    fn link_key(consumer_id: &str, environment_id: &str) -> String {
        format!("{}{}{}", consumer_id, KEY_SEPARATOR, environment_id)
    }

    fn parent_prefix(parent: &OverrideParent) -> String {
        format!(
            "{}{sep}{}{sep}",
            parent.kind().as_str(),
            parent.id(),
            sep = KEY_SEPARATOR
        )
    }

    fn label_prefix(parent: &OverrideParent, content_label: &str) -> String {
        format!(
            "{}{}:{}{}",
            Self::parent_prefix(parent),
            content_label.len(),
            content_label,
            KEY_SEPARATOR
        )
    }

    fn override_key(parent: &OverrideParent, content_label: &str, name: &str) -> String {
        format!(
            "{}{}",
            Self::label_prefix(parent, content_label),
            name.to_lowercase()
        )
    }

    fn all_environments(&self) -> anyhow::Result<Vec<EnvironmentInfo>> {
        self.scan_prefix(CF_ENVIRONMENTS, "")?
            .into_iter()
            .map(|(_, value)| Ok(serde_json::from_slice::<EnvironmentInfo>(&value)?))
            .collect()
    }

    /// Environments assigned to a consumer, in ascending rank
    fn consumer_environments(&self, consumer_id: &str) -> anyhow::Result<Vec<EnvironmentInfo>> {
        let prefix = Self::link_key(consumer_id, "");
        let mut environments = Vec::new();
        for (key, _) in self.scan_prefix(CF_CONSUMER_ENVIRONMENTS, &prefix)? {
            let environment_id = &key[prefix.len()..];
            if let Some(v) = self.get_json(CF_ENVIRONMENTS, environment_id)? {
                environments.push(serde_json::from_value::<EnvironmentInfo>(v)?);
            }
        }
        environments.sort_by_key(|e| e.rank);
        Ok(environments)
    }

    /// Convert a JSON value from RocksDB to ConsumerInfo (without environments)
    pub fn json_to_consumer(v: &serde_json::Value) -> ConsumerInfo {
        ConsumerInfo {
            id: v["id"].as_str().unwrap_or("").to_string(),
            uuid: v["uuid"].as_str().unwrap_or("").to_string(),
            owner_id: v["owner_id"].as_str().unwrap_or("").to_string(),
            name: v["name"].as_str().unwrap_or("").to_string(),
            last_checkin: v["last_checkin"].as_i64(),
            environments: Vec::new(),
            created_time: v["created_time"].as_i64().unwrap_or(0),
            modified_time: v["modified_time"].as_i64().unwrap_or(0),
        }
    }

    fn consumer_to_json(c: &ConsumerInfo) -> serde_json::Value {
        serde_json::json!({
            "id": c.id,
            "uuid": c.uuid,
            "owner_id": c.owner_id,
            "name": c.name,
            "last_checkin": c.last_checkin,
            "created_time": c.created_time,
            "modified_time": c.modified_time,
        })
    }

    /// Convert a JSON value from RocksDB to ContentOverride
    pub fn json_to_override(v: &serde_json::Value) -> anyhow::Result<ContentOverride> {
        let kind: OverrideKind = v["kind"]
            .as_str()
            .unwrap_or("")
            .parse()
            .map_err(anyhow::Error::msg)?;

        Ok(ContentOverride {
            id: v["id"].as_str().map(str::to_string),
            kind,
            parent_id: v["parent_id"].as_str().map(str::to_string),
            content_label: v["content_label"].as_str().unwrap_or("").to_string(),
            name: v["name"].as_str().unwrap_or("").to_string(),
            value: v["value"].as_str().unwrap_or("").to_string(),
            created_time: v["created_time"].as_i64().unwrap_or(0),
            modified_time: v["modified_time"].as_i64().unwrap_or(0),
        })
    }

    fn override_to_json(o: &ContentOverride) -> serde_json::Value {
        serde_json::json!({
            "id": o.id,
            "kind": o.kind.as_str(),
            "parent_id": o.parent_id,
            "content_label": o.content_label,
            "name": o.name,
            "value": o.value,
            "created_time": o.created_time,
            "modified_time": o.modified_time,
        })
    }

    fn find_overrides(&self, parent: &OverrideParent) -> anyhow::Result<Vec<(String, ContentOverride)>> {
        self.scan_prefix(CF_OVERRIDES, &Self::parent_prefix(parent))?
            .into_iter()
            .map(|(key, value)| {
                let json: serde_json::Value = serde_json::from_slice(&value)?;
                Ok((key, Self::json_to_override(&json)?))
            })
            .collect()
    }

    /// Queue removal of a consumer and everything hanging off it
    fn delete_consumer_into(
        &self,
        batch: &mut WriteBatch,
        owner_id: &str,
        consumer_id: &str,
    ) -> anyhow::Result<()> {
        let parent = OverrideParent::Consumer(consumer_id.to_string());
        for (key, _) in self.scan_prefix(CF_OVERRIDES, &Self::parent_prefix(&parent))? {
            batch.delete_cf(self.cf(CF_OVERRIDES)?, key.as_bytes());
        }
        for (key, _) in self.scan_prefix(CF_CONSUMER_ENVIRONMENTS, &Self::link_key(consumer_id, ""))?
        {
            batch.delete_cf(self.cf(CF_CONSUMER_ENVIRONMENTS)?, key.as_bytes());
        }
        batch.delete_cf(self.cf(CF_CONSUMER_INDEX)?, consumer_id.as_bytes());
        batch.delete_cf(
            self.cf(CF_CONSUMERS)?,
            Self::consumer_key(owner_id, consumer_id).as_bytes(),
        );
        Ok(())
    }

    /// Queue removal of an environment, its overrides and its assignments
    fn delete_environment_into(
        &self,
        batch: &mut WriteBatch,
        environment_id: &str,
    ) -> anyhow::Result<()> {
        let parent = OverrideParent::Environment(environment_id.to_string());
        for (key, _) in self.scan_prefix(CF_OVERRIDES, &Self::parent_prefix(&parent))? {
            batch.delete_cf(self.cf(CF_OVERRIDES)?, key.as_bytes());
        }

        let suffix = format!("{}{}", KEY_SEPARATOR, environment_id);
        for (key, _) in self.scan_prefix(CF_CONSUMER_ENVIRONMENTS, "")? {
            if key.ends_with(&suffix) {
                batch.delete_cf(self.cf(CF_CONSUMER_ENVIRONMENTS)?, key.as_bytes());
            }
        }
        batch.delete_cf(self.cf(CF_ENVIRONMENTS)?, environment_id.as_bytes());
        Ok(())
    }

    fn parent_exists(&self, parent: &OverrideParent) -> anyhow::Result<bool> {
        let cf_name = match parent {
            OverrideParent::Consumer(_) => CF_CONSUMER_INDEX,
            OverrideParent::Environment(_) => CF_ENVIRONMENTS,
        };
        let cf = self.cf(cf_name)?;
        Ok(self
            .db
            .get_cf(cf, parent.id().as_bytes())
            .map_err(|e| anyhow::anyhow!("RocksDB get error: {}", e))?
            .is_some())
    }
}

#[async_trait]
impl OwnerPersistence for EmbeddedPersistService {
    async fn owner_create(&self, key: &str, display_name: &str) -> anyhow::Result<OwnerInfo> {
        if !is_valid_key(key) {
            return Err(WarrantError::InvalidArgument(format!("invalid owner key '{}'", key)).into());
        }
        if self.get_string(CF_OWNER_KEYS, key)?.is_some() {
            return Err(
                WarrantError::InvalidArgument(format!("owner key '{}' already exists", key)).into(),
            );
        }

        let now = now_millis();
        let owner = OwnerInfo {
            id: generate_id(),
            key: key.to_string(),
            display_name: display_name.to_string(),
            created_time: now,
            modified_time: now,
        };

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_OWNERS)?,
            owner.id.as_bytes(),
            serde_json::to_vec(&owner)?,
        );
        batch.put_cf(self.cf(CF_OWNER_KEYS)?, key.as_bytes(), owner.id.as_bytes());
        self.write(batch)?;

        Ok(owner)
    }

    async fn owner_find_by_id(&self, owner_id: &str) -> anyhow::Result<Option<OwnerInfo>> {
        self.get_json(CF_OWNERS, owner_id)?
            .map(|v| Ok(serde_json::from_value(v)?))
            .transpose()
    }

    async fn owner_find_by_key(&self, key: &str) -> anyhow::Result<Option<OwnerInfo>> {
        match self.get_string(CF_OWNER_KEYS, key)? {
            Some(owner_id) => self.owner_find_by_id(&owner_id).await,
            None => Ok(None),
        }
    }

    async fn owner_delete(&self, owner_id: &str) -> anyhow::Result<bool> {
        let Some(owner) = self.owner_find_by_id(owner_id).await? else {
            return Ok(false);
        };

        let mut batch = WriteBatch::default();
        let prefix = Self::consumer_key(owner_id, "");
        for (key, _) in self.scan_prefix(CF_CONSUMERS, &prefix)? {
            self.delete_consumer_into(&mut batch, owner_id, &key[prefix.len()..])?;
        }
        for env in self.all_environments()? {
            if env.owner_id == owner_id {
                self.delete_environment_into(&mut batch, &env.id)?;
            }
        }
        batch.delete_cf(self.cf(CF_OWNER_KEYS)?, owner.key.as_bytes());
        batch.delete_cf(self.cf(CF_OWNERS)?, owner_id.as_bytes());
        self.write(batch)?;

        Ok(true)
    }
}

#[async_trait]
impl EnvironmentPersistence for EmbeddedPersistService {
    async fn environment_create(
        &self,
        owner_id: &str,
        name: &str,
        rank: i32,
    ) -> anyhow::Result<EnvironmentInfo> {
        if self.get_json(CF_OWNERS, owner_id)?.is_none() {
            return Err(WarrantError::NotFound(format!("owner '{}'", owner_id)).into());
        }

        let siblings = self.environment_find_by_owner(owner_id).await?;
        if siblings.iter().any(|e| e.rank == rank) {
            return Err(WarrantError::InvalidArgument(format!(
                "rank {} is already used by another environment of owner '{}'",
                rank, owner_id
            ))
            .into());
        }

        let now = now_millis();
        let env = EnvironmentInfo {
            id: generate_id(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            rank,
            created_time: now,
            modified_time: now,
        };
        self.put_json(CF_ENVIRONMENTS, &env.id, &serde_json::to_value(&env)?)?;

        Ok(env)
    }

    async fn environment_find_by_id(
        &self,
        environment_id: &str,
    ) -> anyhow::Result<Option<EnvironmentInfo>> {
        self.get_json(CF_ENVIRONMENTS, environment_id)?
            .map(|v| Ok(serde_json::from_value(v)?))
            .transpose()
    }

    async fn environment_find_by_owner(
        &self,
        owner_id: &str,
    ) -> anyhow::Result<Vec<EnvironmentInfo>> {
        let mut environments: Vec<EnvironmentInfo> = self
            .all_environments()?
            .into_iter()
            .filter(|e| e.owner_id == owner_id)
            .collect();
        environments.sort_by_key(|e| e.rank);
        Ok(environments)
    }

    async fn environment_delete(&self, environment_id: &str) -> anyhow::Result<bool> {
        if self.get_json(CF_ENVIRONMENTS, environment_id)?.is_none() {
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        self.delete_environment_into(&mut batch, environment_id)?;
        self.write(batch)?;
        Ok(true)
    }
}

#[async_trait]
impl ConsumerPersistence for EmbeddedPersistService {
    async fn consumer_create(
        &self,
        id: Option<&str>,
        owner_id: &str,
        name: &str,
        last_checkin: Option<i64>,
    ) -> anyhow::Result<ConsumerInfo> {
        if self.get_json(CF_OWNERS, owner_id)?.is_none() {
            return Err(WarrantError::NotFound(format!("owner '{}'", owner_id)).into());
        }

        let id = id.map(str::to_string).unwrap_or_else(generate_id);
        if !is_valid_key(&id) {
            return Err(WarrantError::InvalidArgument(format!("invalid consumer id '{}'", id)).into());
        }
        if self.get_string(CF_CONSUMER_INDEX, &id)?.is_some() {
            return Err(
                WarrantError::InvalidArgument(format!("consumer '{}' already exists", id)).into(),
            );
        }

        let now = now_millis();
        let consumer = ConsumerInfo {
            id,
            uuid: generate_id(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            last_checkin,
            environments: Vec::new(),
            created_time: now,
            modified_time: now,
        };

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_CONSUMERS)?,
            Self::consumer_key(owner_id, &consumer.id).as_bytes(),
            Self::consumer_to_json(&consumer).to_string().as_bytes(),
        );
        batch.put_cf(
            self.cf(CF_CONSUMER_INDEX)?,
            consumer.id.as_bytes(),
            owner_id.as_bytes(),
        );
        self.write(batch)?;

        Ok(consumer)
    }

    async fn consumer_find_by_id(&self, consumer_id: &str) -> anyhow::Result<Option<ConsumerInfo>> {
        let Some(owner_id) = self.get_string(CF_CONSUMER_INDEX, consumer_id)? else {
            return Ok(None);
        };
        let Some(json) = self.get_json(CF_CONSUMERS, &Self::consumer_key(&owner_id, consumer_id))?
        else {
            return Ok(None);
        };

        let mut consumer = Self::json_to_consumer(&json);
        consumer.environments = self.consumer_environments(consumer_id)?;
        Ok(Some(consumer))
    }

    async fn consumer_update_checkin(
        &self,
        consumer_id: &str,
        last_checkin: i64,
    ) -> anyhow::Result<bool> {
        let Some(owner_id) = self.get_string(CF_CONSUMER_INDEX, consumer_id)? else {
            return Ok(false);
        };
        let key = Self::consumer_key(&owner_id, consumer_id);
        let Some(json) = self.get_json(CF_CONSUMERS, &key)? else {
            return Ok(false);
        };

        let mut consumer = Self::json_to_consumer(&json);
        consumer.last_checkin = Some(last_checkin);
        consumer.modified_time = now_millis();
        self.put_json(CF_CONSUMERS, &key, &Self::consumer_to_json(&consumer))?;
        Ok(true)
    }

    async fn consumer_delete(&self, consumer_id: &str) -> anyhow::Result<bool> {
        let Some(owner_id) = self.get_string(CF_CONSUMER_INDEX, consumer_id)? else {
            return Ok(false);
        };

        let mut batch = WriteBatch::default();
        self.delete_consumer_into(&mut batch, &owner_id, consumer_id)?;
        self.write(batch)?;
        Ok(true)
    }

    async fn consumer_set_environments(
        &self,
        consumer_id: &str,
        environment_ids: &[String],
    ) -> anyhow::Result<()> {
        let owner_id = self
            .get_string(CF_CONSUMER_INDEX, consumer_id)?
            .ok_or_else(|| WarrantError::NotFound(format!("consumer '{}'", consumer_id)))?;

        for environment_id in environment_ids {
            let env = self
                .environment_find_by_id(environment_id)
                .await?
                .ok_or_else(|| {
                    WarrantError::NotFound(format!("environment '{}'", environment_id))
                })?;
            if env.owner_id != owner_id {
                return Err(WarrantError::InvalidArgument(format!(
                    "environment '{}' does not belong to the owner of consumer '{}'",
                    environment_id, consumer_id
                ))
                .into());
            }
        }

        let cf = self.cf(CF_CONSUMER_ENVIRONMENTS)?;
        let mut batch = WriteBatch::default();
        for (key, _) in self.scan_prefix(CF_CONSUMER_ENVIRONMENTS, &Self::link_key(consumer_id, ""))?
        {
            batch.delete_cf(cf, key.as_bytes());
        }
        for environment_id in environment_ids {
            batch.put_cf(cf, Self::link_key(consumer_id, environment_id).as_bytes(), b"");
        }
        self.write(batch)?;

        tracing::debug!(consumer_id, count = environment_ids.len(), "Consumer environments replaced");
        Ok(())
    }

    async fn consumer_find_page(
        &self,
        owner_id: &str,
        after: Option<&ConsumerCursor>,
        limit: u64,
    ) -> anyhow::Result<Vec<ConsumerInfo>> {
        let cf = self.cf(CF_CONSUMERS)?;
        let prefix = Self::consumer_key(owner_id, "");
        let start = match after {
            Some(cursor) => Self::consumer_key(owner_id, &cursor.after_id),
            None => prefix.clone(),
        };

        let mut consumers = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(start.as_bytes(), Direction::Forward));
        for item in iter {
            if consumers.len() as u64 >= limit {
                break;
            }
            let (key, value) = item.map_err(|e| anyhow::anyhow!("RocksDB iterator error: {}", e))?;
            let key_str = String::from_utf8_lossy(&key);
            if !key_str.starts_with(&prefix) {
                break;
            }
            let consumer_id = &key_str[prefix.len()..];
            if after.is_some_and(|cursor| !cursor.admits(consumer_id)) {
                continue;
            }

            let json: serde_json::Value = serde_json::from_slice(&value)?;
            let mut consumer = Self::json_to_consumer(&json);
            consumer.environments = self.consumer_environments(&consumer.id)?;
            consumers.push(consumer);
        }

        Ok(consumers)
    }
}

#[async_trait]
impl ContentOverridePersistence for EmbeddedPersistService {
    async fn override_find_by_parent(
        &self,
        parent: &OverrideParent,
    ) -> anyhow::Result<Vec<ContentOverride>> {
        let mut overrides: Vec<ContentOverride> = self
            .find_overrides(parent)?
            .into_iter()
            .map(|(_, o)| o)
            .collect();
        overrides.sort_by(|a, b| {
            (a.content_label(), a.name()).cmp(&(b.content_label(), b.name()))
        });
        Ok(overrides)
    }

    async fn override_retrieve(
        &self,
        parent: &OverrideParent,
        content_label: &str,
        name: &str,
    ) -> anyhow::Result<Option<ContentOverride>> {
        self.get_json(CF_OVERRIDES, &Self::override_key(parent, content_label, name))?
            .map(|v| Self::json_to_override(&v))
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
        let mut parents: Vec<OverrideParent> = Vec::with_capacity(overrides.len());
        for o in overrides {
            let parent = o.parent().ok_or_else(|| {
                WarrantError::InvalidArgument("content override has no parent".to_string())
            })?;
            if !parents.contains(&parent) && !self.parent_exists(&parent)? {
                return Err(WarrantError::NotFound(parent.to_string()).into());
            }
            parents.push(parent);
        }

        let cf = self.cf(CF_OVERRIDES)?;
        let now = now_millis();
        let mut batch = WriteBatch::default();
        // Records queued in this batch, so a repeated key updates the queued one
        let mut pending: HashMap<String, ContentOverride> = HashMap::new();
        let mut saved = Vec::with_capacity(overrides.len());

        for (o, parent) in overrides.iter().zip(&parents) {
            let key = Self::override_key(parent, o.content_label(), o.name());
            let existing = match pending.get(&key) {
                Some(queued) => Some(queued.clone()),
                None => self
                    .get_json(CF_OVERRIDES, &key)?
                    .map(|v| Self::json_to_override(&v))
                    .transpose()?,
            };

            let record = match existing {
                Some(mut existing) => {
                    existing.set_value(o.value());
                    existing.modified_time = now;
                    existing
                }
                None => {
                    let mut created = o.clone();
                    created.id = Some(generate_id());
                    created.created_time = now;
                    created.modified_time = now;
                    created
                }
            };

            batch.put_cf(
                cf,
                key.as_bytes(),
                Self::override_to_json(&record).to_string().as_bytes(),
            );
            pending.insert(key, record.clone());
            saved.push(record);
        }
        self.write(batch)?;

        Ok(saved)
    }

    async fn override_remove_by_name(
        &self,
        parent: &OverrideParent,
        content_label: &str,
        name: &str,
    ) -> anyhow::Result<u64> {
        let key = Self::override_key(parent, content_label, name);
        if self.get_json(CF_OVERRIDES, &key)?.is_none() {
            return Ok(0);
        }
        let cf = self.cf(CF_OVERRIDES)?;
        self.db
            .delete_cf(cf, key.as_bytes())
            .map_err(|e| anyhow::anyhow!("RocksDB delete error: {}", e))?;
        Ok(1)
    }

    async fn override_remove_by_content_label(
        &self,
        parent: &OverrideParent,
        content_label: &str,
    ) -> anyhow::Result<u64> {
        let cf = self.cf(CF_OVERRIDES)?;
        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for (key, _) in
            self.scan_prefix(CF_OVERRIDES, &Self::label_prefix(parent, content_label))?
        {
            batch.delete_cf(cf, key.as_bytes());
            removed += 1;
        }
        self.write(batch)?;
        Ok(removed)
    }

    async fn override_remove_by_parent(&self, parent: &OverrideParent) -> anyhow::Result<u64> {
        let cf = self.cf(CF_OVERRIDES)?;
        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for (key, _) in self.scan_prefix(CF_OVERRIDES, &Self::parent_prefix(parent))? {
            batch.delete_cf(cf, key.as_bytes());
            removed += 1;
        }
        self.write(batch)?;
        Ok(removed)
    }
}

#[async_trait]
impl PersistenceService for EmbeddedPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::StandaloneEmbedded
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        // Verify we can access column families
        for name in ALL_CFS {
            self.cf(name)?;
        }
        Ok(())
    }
}
