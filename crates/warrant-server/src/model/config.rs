//! Configuration management for the Warrant server
//!
//! Values are read from `conf/application.yml`, then `WARRANT_*` environment
//! variables, then command line options, later sources winning.

use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use warrant_common::WarrantError;
use warrant_consumer::{ContentOverrideValidator, CursorCodec, FeedOptions};
use warrant_persistence::StorageMode;

use super::constants::*;
use crate::command::Command;
use crate::startup::LoggingConfig;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "warrant-server", version, about = "Warrant administration tool")]
pub struct Cli {
    /// Configuration file (default: conf/application.yml, optional)
    #[arg(short = 'c', long = "config", global = true)]
    pub config_file: Option<String>,
    /// Storage backend: standalone_embedded or external_db
    #[arg(short = 'm', long = "mode", global = true)]
    pub mode: Option<String>,
    /// RocksDB data directory for the embedded backend
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<String>,
    #[arg(long = "db-url", env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,
    #[arg(long = "cursor-secret", env = "WARRANT_CURSOR_SECRET", global = true)]
    pub cursor_secret: Option<String>,
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

fn config_error(e: config::ConfigError) -> WarrantError {
    WarrantError::ConfigError(e.to_string())
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn new(cli: &Cli) -> Result<Self, WarrantError> {
        let config_file = match &cli.config_file {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut builder = Config::builder().add_source(config_file).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key(OVERRIDE_BLOCKLIST_PROPERTY),
        );

        let overrides = [
            (PERSISTENCE_MODE_PROPERTY, &cli.mode),
            (EMBEDDED_DATA_DIR_PROPERTY, &cli.data_dir),
            (DB_URL_PROPERTY, &cli.database_url),
            (CURSOR_SECRET_PROPERTY, &cli.cursor_secret),
            (LOGGING_LEVEL_PROPERTY, &cli.log_level),
        ];
        for (key, value) in overrides {
            if let Some(v) = value {
                builder = builder
                    .set_override(key, v.as_str())
                    .map_err(config_error)?;
            }
        }

        let config = builder.build().map_err(config_error)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Configuration { config }
    }

    // ========================================================================
    // Persistence Configuration
    // ========================================================================

    pub fn persistence_mode(&self) -> Result<StorageMode, WarrantError> {
        match self.config.get_string(PERSISTENCE_MODE_PROPERTY) {
            Ok(mode) => mode
                .trim()
                .parse::<StorageMode>()
                .map_err(WarrantError::ConfigError),
            Err(_) => Ok(StorageMode::StandaloneEmbedded),
        }
    }

    pub fn embedded_data_dir(&self) -> String {
        self.config
            .get_string(EMBEDDED_DATA_DIR_PROPERTY)
            .unwrap_or(DEFAULT_EMBEDDED_DATA_DIR.to_string())
    }

    pub fn db_init_schema(&self) -> bool {
        self.config.get_bool(DB_INIT_SCHEMA_PROPERTY).unwrap_or(true)
    }

    pub async fn database_connection(&self) -> Result<DatabaseConnection, WarrantError> {
        let max_connections = self
            .config
            .get_int(DB_MAX_CONNECTIONS_PROPERTY)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS.into()) as u32;
        let min_connections = self
            .config
            .get_int(DB_MIN_CONNECTIONS_PROPERTY)
            .unwrap_or(DEFAULT_DB_MIN_CONNECTIONS.into()) as u32;
        let connect_timeout = self
            .config
            .get_int(DB_CONNECT_TIMEOUT_PROPERTY)
            .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT as i64) as u64;
        let idle_timeout = self
            .config
            .get_int(DB_IDLE_TIMEOUT_PROPERTY)
            .unwrap_or(DEFAULT_DB_IDLE_TIMEOUT as i64) as u64;

        let url = self.config.get_string(DB_URL_PROPERTY).map_err(|_| {
            WarrantError::ConfigError(format!(
                "{} is required for the external_db persistence mode",
                DB_URL_PROPERTY
            ))
        })?;

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .sqlx_logging(false);

        tracing::info!(
            max_connections = max_connections,
            min_connections = min_connections,
            connect_timeout = connect_timeout,
            idle_timeout = idle_timeout,
            "Database connection pool configured"
        );

        Database::connect(opt)
            .await
            .map_err(|e| WarrantError::DatabaseError(e.to_string()))
    }

    // ========================================================================
    // Consumer Service Configuration
    // ========================================================================

    pub fn cursor_secret(&self) -> Option<String> {
        self.config
            .get_string(CURSOR_SECRET_PROPERTY)
            .ok()
            .filter(|s| !s.trim().is_empty())
    }

    /// Cursor codec keyed by `cursor.secret`, or by a random per-process key
    pub fn cursor_codec(&self) -> CursorCodec {
        match self.cursor_secret() {
            Some(secret) => CursorCodec::from_secret(&secret),
            None => {
                tracing::warn!(
                    "No cursor.secret configured, page cursors are only valid within this process"
                );
                CursorCodec::with_random_key()
            }
        }
    }

    pub fn feed_options(&self) -> FeedOptions {
        let defaults = FeedOptions::default();
        let max_page_size = self
            .config
            .get_int(FEED_MAX_PAGE_SIZE_PROPERTY)
            .map(|v| v.max(1) as u64)
            .unwrap_or(defaults.max_page_size);
        let default_page_size = self
            .config
            .get_int(FEED_DEFAULT_PAGE_SIZE_PROPERTY)
            .map(|v| v.max(1) as u64)
            .unwrap_or(defaults.default_page_size);

        FeedOptions::new(default_page_size, max_page_size)
    }

    pub fn override_blocklist(&self) -> Vec<String> {
        self.config
            .get::<Vec<String>>(OVERRIDE_BLOCKLIST_PROPERTY)
            .unwrap_or_default()
    }

    pub fn override_validator(&self) -> ContentOverrideValidator {
        ContentOverrideValidator::new(self.override_blocklist())
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config
                .get_string(LOGGING_DIR_PROPERTY)
                .unwrap_or(DEFAULT_LOGGING_DIR.to_string()),
            self.config.get_bool(LOGGING_CONSOLE_PROPERTY).unwrap_or(true),
            self.config.get_bool(LOGGING_FILE_PROPERTY).unwrap_or(false),
            &self
                .config
                .get_string(LOGGING_LEVEL_PROPERTY)
                .unwrap_or(DEFAULT_LOGGING_LEVEL.to_string()),
            &self
                .config
                .get_string(LOGGING_ROTATION_PROPERTY)
                .unwrap_or(DEFAULT_LOGGING_ROTATION.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tracing::Level;

    use super::*;
    use crate::startup::LogRotation;

    fn configuration(overrides: &[(&str, &str)]) -> Configuration {
        let mut builder = Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        Configuration::from_config(builder.build().unwrap())
    }

    #[test]
    fn test_defaults() {
        let config = configuration(&[]);

        assert_eq!(
            config.persistence_mode().unwrap(),
            StorageMode::StandaloneEmbedded
        );
        assert_eq!(config.embedded_data_dir(), DEFAULT_EMBEDDED_DATA_DIR);
        assert!(config.db_init_schema());
        assert!(config.cursor_secret().is_none());
        assert_eq!(config.feed_options(), FeedOptions::default());
        assert!(config.override_blocklist().is_empty());

        let logging = config.logging_config();
        assert_eq!(logging.log_dir, PathBuf::from(DEFAULT_LOGGING_DIR));
        assert!(logging.console_output);
        assert!(!logging.file_logging);
        assert_eq!(logging.level, Level::INFO);
        assert!(matches!(logging.rotation, LogRotation::Daily));

        let logging = configuration(&[(LOGGING_ROTATION_PROPERTY, "never")]).logging_config();
        assert!(matches!(logging.rotation, LogRotation::Never));
    }

    #[test]
    fn test_persistence_mode() {
        let config = configuration(&[(PERSISTENCE_MODE_PROPERTY, "external_db")]);
        assert_eq!(config.persistence_mode().unwrap(), StorageMode::ExternalDb);

        let config = configuration(&[(PERSISTENCE_MODE_PROPERTY, "distributed")]);
        assert!(matches!(
            config.persistence_mode(),
            Err(WarrantError::ConfigError(_))
        ));
    }

    #[test]
    fn test_feed_options_bounds() {
        let config = configuration(&[
            (FEED_DEFAULT_PAGE_SIZE_PROPERTY, "500"),
            (FEED_MAX_PAGE_SIZE_PROPERTY, "50"),
        ]);
        assert_eq!(
            config.feed_options(),
            FeedOptions {
                default_page_size: 50,
                max_page_size: 50,
            }
        );

        let config = configuration(&[(FEED_MAX_PAGE_SIZE_PROPERTY, "0")]);
        assert_eq!(config.feed_options().max_page_size, 1);
    }

    #[test]
    fn test_blank_cursor_secret_is_ignored() {
        let config = configuration(&[(CURSOR_SECRET_PROPERTY, "  ")]);
        assert!(config.cursor_secret().is_none());

        let config = configuration(&[(CURSOR_SECRET_PROPERTY, "s3cret")]);
        assert_eq!(config.cursor_secret().as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_override_blocklist() {
        let config = Configuration::from_config(
            Config::builder()
                .set_override(OVERRIDE_BLOCKLIST_PROPERTY, vec!["baseurl", "proxy"])
                .unwrap()
                .build()
                .unwrap(),
        );
        let validator = config.override_validator();
        assert!(validator.is_blocked("BaseURL"));
        assert!(validator.is_blocked("proxy"));
        assert!(validator.is_blocked("name"));
    }

    #[tokio::test]
    async fn test_database_connection_requires_url() {
        let config = configuration(&[(PERSISTENCE_MODE_PROPERTY, "external_db")]);
        assert!(matches!(
            config.database_connection().await,
            Err(WarrantError::ConfigError(_))
        ));
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("application.yml");
        std::fs::write(
            &file,
            "warrant:\n  embedded:\n    data-dir: /from/file\nfeed:\n  max-page-size: 10\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "warrant-server",
            "--config",
            file.to_str().unwrap(),
            "--data-dir",
            "/from/cli",
            "health",
        ])
        .unwrap();
        let config = Configuration::new(&cli).unwrap();

        assert_eq!(config.embedded_data_dir(), "/from/cli");
        assert_eq!(config.feed_options().max_page_size, 10);
    }

    #[test]
    fn test_missing_explicit_config_file_fails() {
        let cli = Cli::try_parse_from([
            "warrant-server",
            "--config",
            "/nonexistent/warrant.yml",
            "health",
        ])
        .unwrap();
        assert!(matches!(
            Configuration::new(&cli),
            Err(WarrantError::ConfigError(_))
        ));
    }
}
