//! Configuration keys and defaults for the Warrant server

// ============================================================================
// Persistence
// ============================================================================

pub const PERSISTENCE_MODE_PROPERTY: &str = "warrant.persistence.mode";
pub const EMBEDDED_DATA_DIR_PROPERTY: &str = "warrant.embedded.data-dir";
pub const DEFAULT_EMBEDDED_DATA_DIR: &str = "data/warrant";

pub const DB_URL_PROPERTY: &str = "db.url";
pub const DB_INIT_SCHEMA_PROPERTY: &str = "db.init-schema";
pub const DB_MAX_CONNECTIONS_PROPERTY: &str = "db.pool.max-connections";
pub const DB_MIN_CONNECTIONS_PROPERTY: &str = "db.pool.min-connections";
pub const DB_CONNECT_TIMEOUT_PROPERTY: &str = "db.pool.connect-timeout";
pub const DB_IDLE_TIMEOUT_PROPERTY: &str = "db.pool.idle-timeout";

pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
pub const DEFAULT_DB_MIN_CONNECTIONS: u32 = 1;
/// Seconds
pub const DEFAULT_DB_CONNECT_TIMEOUT: u64 = 30;
/// Seconds
pub const DEFAULT_DB_IDLE_TIMEOUT: u64 = 600;

// ============================================================================
// Consumer services
// ============================================================================

pub const CURSOR_SECRET_PROPERTY: &str = "cursor.secret";
pub const FEED_DEFAULT_PAGE_SIZE_PROPERTY: &str = "feed.default-page-size";
pub const FEED_MAX_PAGE_SIZE_PROPERTY: &str = "feed.max-page-size";
pub const OVERRIDE_BLOCKLIST_PROPERTY: &str = "override.blocklist";

// ============================================================================
// Logging
// ============================================================================

pub const LOGGING_DIR_PROPERTY: &str = "logging.dir";
pub const LOGGING_CONSOLE_PROPERTY: &str = "logging.console";
pub const LOGGING_FILE_PROPERTY: &str = "logging.file";
pub const LOGGING_LEVEL_PROPERTY: &str = "logging.level";
pub const LOGGING_ROTATION_PROPERTY: &str = "logging.rotation";
pub const DEFAULT_LOGGING_DIR: &str = "logs";
pub const DEFAULT_LOGGING_LEVEL: &str = "info";
pub const DEFAULT_LOGGING_ROTATION: &str = "daily";

// ============================================================================
// Sources
// ============================================================================

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const ENV_PREFIX: &str = "WARRANT";
