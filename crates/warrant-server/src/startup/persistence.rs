//! Storage backend selection

use std::sync::Arc;

use tracing::info;
use warrant_common::WarrantError;
use warrant_persistence::{
    EmbeddedPersistService, ExternalDbPersistService, PersistenceService, StorageMode,
    sql::schema,
};

use crate::model::Configuration;

/// Open the backend selected by `warrant.persistence.mode`
pub async fn init_persistence(
    configuration: &Configuration,
) -> Result<Arc<dyn PersistenceService>, WarrantError> {
    let storage_mode = configuration.persistence_mode()?;
    info!("Persistence mode: {}", storage_mode);

    let persistence: Arc<dyn PersistenceService> = match storage_mode {
        StorageMode::ExternalDb => {
            let db = configuration.database_connection().await?;
            if configuration.db_init_schema() {
                schema::create_tables(&db).await?;
            }
            Arc::new(ExternalDbPersistService::new(db))
        }
        StorageMode::StandaloneEmbedded => {
            let data_dir = configuration.embedded_data_dir();
            info!("Initializing standalone embedded storage at: {}", data_dir);
            Arc::new(EmbeddedPersistService::open(&data_dir).map_err(|e| {
                WarrantError::DatabaseError(format!(
                    "failed to open embedded storage at {}: {:#}",
                    data_dir, e
                ))
            })?)
        }
    };

    Ok(persistence)
}

#[cfg(test)]
mod tests {
    use config::Config;

    use super::*;
    use crate::model::constants::{EMBEDDED_DATA_DIR_PROPERTY, PERSISTENCE_MODE_PROPERTY};

    #[tokio::test]
    async fn test_init_embedded_persistence() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::builder()
            .set_override(EMBEDDED_DATA_DIR_PROPERTY, tmp.path().to_str().unwrap())
            .unwrap()
            .build()
            .unwrap();

        let persistence = init_persistence(&Configuration::from_config(config))
            .await
            .unwrap();
        assert_eq!(persistence.storage_mode(), StorageMode::StandaloneEmbedded);
        persistence.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_mode_is_config_error() {
        let config = Config::builder()
            .set_override(PERSISTENCE_MODE_PROPERTY, "clustered")
            .unwrap()
            .build()
            .unwrap();

        let err = init_persistence(&Configuration::from_config(config))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, WarrantError::ConfigError(_)));
    }
}
