use hmdp_cache::{CacheConfig, ReadStrategy};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Cache core tunables (locks, retry, rebuild pool)
    #[serde(default)]
    pub cache: CacheConfig,
    /// Shop namespaces and read strategy
    #[serde(default)]
    pub shop: ShopCacheConfig,
    /// Backing store
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.redis.enabled && self.redis.url.trim().is_empty() {
            return Err("redis.enabled=true requires redis.url".into());
        }
        if self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        self.cache.validate()?;
        if self.shop.ttl_secs == 0 || self.shop.null_ttl_secs == 0 {
            return Err("shop TTLs must be > 0".into());
        }
        if self.shop.type_list_ttl_secs == 0 {
            return Err("shop.type_list_ttl_secs must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8081
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Use Redis as the cache store (falls back to in-process without it)
    /// Default: false
    #[serde(default)]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Pool wait/create/recycle timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Key layout and TTLs of the shop namespaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopCacheConfig {
    /// Strategy serving `GET /shop/{id}`
    /// Default: mutex
    #[serde(default)]
    pub strategy: ReadStrategy,

    #[serde(default = "default_shop_key_prefix")]
    pub key_prefix: String,

    #[serde(default = "default_shop_lock_prefix")]
    pub lock_prefix: String,

    /// Physical TTL, or logical window under `logical_expire`
    /// Default: 1800 (30 minutes)
    #[serde(default = "default_shop_ttl_secs")]
    pub ttl_secs: u64,

    /// Tombstone TTL
    /// Default: 120 (2 minutes)
    #[serde(default = "default_null_ttl_secs")]
    pub null_ttl_secs: u64,

    #[serde(default = "default_type_list_key")]
    pub type_list_key: String,

    /// Default: 1800 (30 minutes)
    #[serde(default = "default_shop_ttl_secs")]
    pub type_list_ttl_secs: u64,

    /// Shop ids provisioned at startup when the strategy is `logical_expire`
    #[serde(default)]
    pub warm_up_ids: Vec<i64>,
}

fn default_shop_key_prefix() -> String {
    "cache:shop:".into()
}
fn default_shop_lock_prefix() -> String {
    "lock:shop:".into()
}
fn default_shop_ttl_secs() -> u64 {
    30 * 60
}
fn default_null_ttl_secs() -> u64 {
    2 * 60
}
fn default_type_list_key() -> String {
    "cache:shopType".into()
}

impl Default for ShopCacheConfig {
    fn default() -> Self {
        Self {
            strategy: ReadStrategy::default(),
            key_prefix: default_shop_key_prefix(),
            lock_prefix: default_shop_lock_prefix(),
            ttl_secs: default_shop_ttl_secs(),
            null_ttl_secs: default_null_ttl_secs(),
            type_list_key: default_type_list_key(),
            type_list_ttl_secs: default_shop_ttl_secs(),
            warm_up_ids: Vec::new(),
        }
    }
}

impl ShopCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn null_ttl(&self) -> Duration {
        Duration::from_secs(self.null_ttl_secs)
    }

    pub fn type_list_ttl(&self) -> Duration {
        Duration::from_secs(self.type_list_ttl_secs)
    }
}

/// In-memory backing store settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// JSON file with `shops` and `shopTypes` arrays loaded at startup
    #[serde(default)]
    pub seed_path: Option<String>,

    /// Artificial latency added to every backing-store read, in milliseconds
    #[serde(default)]
    pub read_latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("hmdp.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., HMDP__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("HMDP")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.shop.key_prefix, "cache:shop:");
        assert_eq!(cfg.shop.null_ttl(), Duration::from_secs(120));
        assert_eq!(cfg.shop.strategy, ReadStrategy::Mutex);
        assert!(!cfg.redis.enabled);
    }

    #[test]
    fn test_invalid_log_level() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }
}
