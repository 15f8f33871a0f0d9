use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub blob_dir: String,
    /// Maximum size of a single item's content in bytes.
    pub max_blob_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ItemsConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub delete_batch_size: u64,
    /// Key for signing pagination cursors.
    pub cursor_secret: String,
    /// 0 disables background blob collection.
    pub gc_interval_secs: u64,
    pub gc_grace_secs: u64,
}

impl Default for ItemsConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 1000,
            delete_batch_size: 500,
            cursor_secret: "change-me-cursor-secret".into(),
            gc_interval_secs: 3600,
            gc_grace_secs: 86400,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub items: ItemsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://data/items.db?mode=rwc")?
            .set_default("storage.blob_dir", "./data/blobs")?
            .set_default("storage.max_blob_size", 64 * 1024 * 1024)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., ITEMSTORE__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("ITEMSTORE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
