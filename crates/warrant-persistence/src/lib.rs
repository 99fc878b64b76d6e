//! Warrant Persistence - Entity model and persistence layer
//!
//! This crate provides:
//! - Domain model types (owners, environments, consumers, content overrides)
//! - Persistence trait abstractions for unified storage
//! - SeaORM entity definitions and the external database backend
//! - The standalone embedded (RocksDB) backend

pub mod embedded;
pub mod entity;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export persistence traits
pub use traits::{
    ConsumerPersistence, ContentOverridePersistence, EnvironmentPersistence, OwnerPersistence,
    PersistenceService,
};

// Re-export SQL backend
pub use sql::ExternalDbPersistService;

// Re-export embedded backend
pub use embedded::EmbeddedPersistService;

// Re-export model types
pub use model::{
    ConsumerCursor, ConsumerInfo, ContentOverride, EnvironmentInfo, OverrideKey, OverrideKind,
    OverrideParent, OwnerInfo, StorageMode,
};
