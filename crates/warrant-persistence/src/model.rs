//! Domain model types shared by the persistence backends and the services

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use warrant_common::{WarrantError, is_blank};

/// Storage mode for the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageMode {
    /// External database (MySQL/PostgreSQL via SeaORM)
    ExternalDb,
    /// Standalone embedded RocksDB (single node, no external DB)
    StandaloneEmbedded,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::ExternalDb => write!(f, "external_db"),
            StorageMode::StandaloneEmbedded => write!(f, "standalone_embedded"),
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external_db" => Ok(StorageMode::ExternalDb),
            "standalone_embedded" => Ok(StorageMode::StandaloneEmbedded),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}

/// Owner (organisation) information
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerInfo {
    pub id: String,
    pub key: String,
    pub display_name: String,
    pub created_time: i64,
    pub modified_time: i64,
}

/// Environment information
///
/// Environments of one owner are totally ordered by `rank`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub rank: i32,
    pub created_time: i64,
    pub modified_time: i64,
}

/// Consumer information
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerInfo {
    pub id: String,
    pub uuid: String,
    pub owner_id: String,
    pub name: String,
    /// Epoch millis of the last check-in, `None` when never checked in
    pub last_checkin: Option<i64>,
    /// Assigned environments in ascending rank
    pub environments: Vec<EnvironmentInfo>,
    pub created_time: i64,
    pub modified_time: i64,
}

/// Position after which a consumer enumeration resumes
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerCursor {
    pub after_id: String,
    pub after_checkin: Option<i64>,
}

impl ConsumerCursor {
    pub fn new(after_id: impl Into<String>, after_checkin: Option<i64>) -> Self {
        Self {
            after_id: after_id.into(),
            after_checkin,
        }
    }

    pub fn from_consumer(consumer: &ConsumerInfo) -> Self {
        Self::new(consumer.id.clone(), consumer.last_checkin)
    }

    /// Whether a consumer id lies strictly after this position.
    ///
    /// Ids are unique, so every id at or before `after_id` is excluded whatever
    /// its check-in value; a consumer that checks in again never reappears.
    pub fn admits(&self, consumer_id: &str) -> bool {
        consumer_id > self.after_id.as_str()
    }
}

/// Which kind of entity an override is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    Consumer,
    Environment,
}

impl OverrideKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OverrideKind::Consumer => "consumer",
            OverrideKind::Environment => "environment",
        }
    }
}

impl std::fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OverrideKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consumer" => Ok(OverrideKind::Consumer),
            "environment" => Ok(OverrideKind::Environment),
            _ => Err(format!("Invalid override kind: {}", s)),
        }
    }
}

/// The entity that owns a content override
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum OverrideParent {
    Consumer(String),
    Environment(String),
}

impl OverrideParent {
    pub fn kind(&self) -> OverrideKind {
        match self {
            OverrideParent::Consumer(_) => OverrideKind::Consumer,
            OverrideParent::Environment(_) => OverrideKind::Environment,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            OverrideParent::Consumer(id) | OverrideParent::Environment(id) => id,
        }
    }

    pub fn from_parts(kind: OverrideKind, id: impl Into<String>) -> Self {
        match kind {
            OverrideKind::Consumer => OverrideParent::Consumer(id.into()),
            OverrideKind::Environment => OverrideParent::Environment(id.into()),
        }
    }
}

impl std::fmt::Display for OverrideParent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.kind(), self.id())
    }
}

/// Key of an effective override: content label plus (lowercase) property name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideKey {
    pub content_label: String,
    pub name: String,
}

impl OverrideKey {
    pub fn new(content_label: impl Into<String>, name: &str) -> Self {
        Self {
            content_label: content_label.into(),
            name: name.to_lowercase(),
        }
    }
}

impl std::fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.content_label, self.name)
    }
}

/// A content repository property override attached to a consumer or an environment.
///
/// The property name is always stored lowercase. Two overrides are equal when
/// they share parent, content label and name; value and timestamps are ignored.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentOverride {
    pub(crate) id: Option<String>,
    pub(crate) kind: OverrideKind,
    pub(crate) parent_id: Option<String>,
    pub(crate) content_label: String,
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) created_time: i64,
    pub(crate) modified_time: i64,
}

impl ContentOverride {
    /// Create an override without a parent.
    ///
    /// Label, name and value are required and must not be blank.
    pub fn new(
        kind: OverrideKind,
        content_label: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, WarrantError> {
        let content_label = content_label.into();
        let name = name.into();
        let value = value.into();

        for (field, v) in [("content label", &content_label), ("name", &name), ("value", &value)] {
            if is_blank(Some(v.as_str())) {
                return Err(WarrantError::InvalidArgument(format!(
                    "override {} is required",
                    field
                )));
            }
        }

        Ok(Self {
            id: None,
            kind,
            parent_id: None,
            content_label,
            name: name.to_lowercase(),
            value,
            created_time: 0,
            modified_time: 0,
        })
    }

    pub fn for_consumer(
        content_label: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, WarrantError> {
        Self::new(OverrideKind::Consumer, content_label, name, value)
    }

    pub fn for_environment(
        content_label: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, WarrantError> {
        Self::new(OverrideKind::Environment, content_label, name, value)
    }

    /// Create an override already attached to `parent`
    pub fn for_parent(
        parent: &OverrideParent,
        content_label: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, WarrantError> {
        let mut o = Self::new(parent.kind(), content_label, name, value)?;
        o.parent_id = Some(parent.id().to_string());
        Ok(o)
    }

    /// The effective parent, `None` until one is set
    pub fn parent(&self) -> Option<OverrideParent> {
        self.parent_id
            .as_ref()
            .map(|id| OverrideParent::from_parts(self.kind, id.clone()))
    }

    /// Attach to (or detach from) a parent of this override's kind
    pub fn set_parent(&mut self, parent_id: Option<&str>) {
        self.parent_id = parent_id.map(str::to_string);
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> OverrideKind {
        self.kind
    }

    pub fn content_label(&self) -> &str {
        &self.content_label
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_lowercase();
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn created_time(&self) -> i64 {
        self.created_time
    }

    pub fn modified_time(&self) -> i64 {
        self.modified_time
    }

    pub fn key(&self) -> OverrideKey {
        OverrideKey {
            content_label: self.content_label.clone(),
            name: self.name.clone(),
        }
    }
}

impl PartialEq for ContentOverride {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.parent_id == other.parent_id
            && self.content_label == other.content_label
            && self.name == other.name
    }
}

impl Eq for ContentOverride {}

impl Hash for ContentOverride {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.parent_id.hash(state);
        self.content_label.hash(state);
        self.name.hash(state);
    }
}
