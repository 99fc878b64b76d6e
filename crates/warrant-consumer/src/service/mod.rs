//! Consumer service layer
//!
//! Stateless services over a shared `PersistenceService`. Each call reads the
//! store afresh; nothing is cached between calls.

pub mod consumer_feed;
pub mod content_override;
pub mod override_resolver;

pub use consumer_feed::ConsumerFeedService;
pub use content_override::ContentOverrideService;
pub use override_resolver::OverrideResolver;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use sea_orm::Database;
    use tempfile::TempDir;
    use warrant_persistence::sql::schema;
    use warrant_persistence::{
        EmbeddedPersistService, ExternalDbPersistService, PersistenceService,
    };

    pub fn create_test_persistence() -> (Arc<dyn PersistenceService>, TempDir) {
        let tmp_dir = TempDir::new().unwrap();
        let service = EmbeddedPersistService::open(tmp_dir.path()).unwrap();
        (Arc::new(service), tmp_dir)
    }

    /// SQLite-backed external database service with a fresh schema
    pub async fn create_sql_test_persistence() -> (Arc<dyn PersistenceService>, TempDir) {
        let tmp_dir = TempDir::new().unwrap();
        let url = format!(
            "sqlite://{}?mode=rwc",
            tmp_dir.path().join("warrant.db").display()
        );
        let db = Database::connect(url).await.unwrap();
        schema::create_tables(&db).await.unwrap();
        (Arc::new(ExternalDbPersistService::new(db)), tmp_dir)
    }
}
