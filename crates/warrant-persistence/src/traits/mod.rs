//! Persistence traits for the unified storage abstraction layer
//!
//! This module defines the persistence traits that abstract over the storage
//! backends: external database (MySQL/PostgreSQL) and standalone embedded
//! (RocksDB).

pub mod consumer;
pub mod content_override;
pub mod environment;
pub mod owner;

pub use consumer::ConsumerPersistence;
pub use content_override::ContentOverridePersistence;
pub use environment::EnvironmentPersistence;
pub use owner::OwnerPersistence;

use async_trait::async_trait;

use crate::model::StorageMode;

/// Unified persistence service trait
///
/// This is the main interface for all storage operations. Implementations
/// dispatch to the appropriate storage backend based on the configured mode.
#[async_trait]
pub trait PersistenceService:
    OwnerPersistence
    + EnvironmentPersistence
    + ConsumerPersistence
    + ContentOverridePersistence
    + Send
    + Sync
{
    /// Get the current storage mode
    fn storage_mode(&self) -> StorageMode;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;
}
