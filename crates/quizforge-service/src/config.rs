//! Application configuration.
//!
//! Values come from an optional TOML file (`quizforge.toml` by default) with
//! environment overrides such as `QUIZFORGE__CACHE__TTL_SECS=60`. Every
//! section has serde defaults, so an empty file is a valid configuration.

use std::fmt;
use std::time::Duration;

use quizforge_db_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.storage.timeout_ms == 0 {
            return Err("storage.timeout_ms must be > 0".into());
        }
        if self.storage.backend == SourceBackend::Postgres {
            if self.postgres.url.trim().is_empty() {
                return Err("postgres.url must not be empty".into());
            }
            if self.postgres.pool_size == 0 {
                return Err("postgres.pool_size must be > 0".into());
            }
        }
        if self.cache.ttl_secs == 0 {
            return Err("cache.ttl_secs must be > 0".into());
        }
        if self.cache.key_stats_ttl_secs == 0 {
            return Err("cache.key_stats_ttl_secs must be > 0".into());
        }
        if self.cache.perf_buffer_size == 0 {
            return Err("cache.perf_buffer_size must be > 0".into());
        }
        if self.cache.backend == CacheBackendKind::Redis {
            if self.redis.url.trim().is_empty() {
                return Err("redis.url must not be empty when cache.backend = \"redis\"".into());
            }
            if self.redis.pool_size == 0 {
                return Err("redis.pool_size must be > 0".into());
            }
        }
        Ok(())
    }
}

/// Which relational source backs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    #[default]
    Postgres,
    /// In-process source seeded with the sample catalogue.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: SourceBackend,
    /// Deadline applied to every source call.
    #[serde(default = "default_storage_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_storage_timeout_ms() -> u64 {
    5000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: SourceBackend::default(),
            timeout_ms: default_storage_timeout_ms(),
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Connection settings for the distributed cache tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
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
    2000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Cache tier implementation, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Local,
    Redis,
}

impl CacheBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackendKind::Local => "local",
            CacheBackendKind::Redis => "redis",
        }
    }
}

impl fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendKind,

    /// Lifetime of an aggregate entry.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Lifetime of per-key access statistics.
    #[serde(default = "default_key_stats_ttl_secs")]
    pub key_stats_ttl_secs: u64,

    /// Number of performance samples kept.
    #[serde(default = "default_perf_buffer_size")]
    pub perf_buffer_size: usize,

    /// Operations slower than this are logged as warnings.
    #[serde(default = "default_slow_operation_ms")]
    pub slow_operation_ms: u64,

    /// Serialize concurrent cold loads of the same key.
    #[serde(default)]
    pub single_flight: bool,

    /// Related quizzes warmed by `prefetch`.
    #[serde(default = "default_prefetch_limit")]
    pub prefetch_limit: usize,
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_key_stats_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_perf_buffer_size() -> usize {
    100
}

fn default_slow_operation_ms() -> u64 {
    500
}

fn default_prefetch_limit() -> usize {
    3
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            ttl_secs: default_cache_ttl_secs(),
            key_stats_ttl_secs: default_key_stats_ttl_secs(),
            perf_buffer_size: default_perf_buffer_size(),
            slow_operation_ms: default_slow_operation_ms(),
            single_flight: false,
            prefetch_limit: default_prefetch_limit(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn key_stats_ttl(&self) -> Duration {
        Duration::from_secs(self.key_stats_ttl_secs)
    }

    pub fn slow_operation(&self) -> Duration {
        Duration::from_millis(self.slow_operation_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Line layout of stderr log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    /// One short line per event, without targets.
    Compact,
    /// Multi-line, for local debugging.
    Pretty,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_FILE: &str = "quizforge.toml";
    pub const ENV_PREFIX: &str = "QUIZFORGE";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        } else if let Some(p) = path {
            return Err(format!("config file not found: {p}"));
        }
        // Environment variable overrides, e.g., QUIZFORGE__CACHE__TTL_SECS=60
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
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
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(cfg.cache.key_stats_ttl_secs, 604_800);
        assert_eq!(cfg.cache.perf_buffer_size, 100);
        assert_eq!(cfg.cache.backend, CacheBackendKind::Local);
        assert!(!cfg.cache.single_flight);
    }

    #[test]
    fn validation_rejects_zero_ttl() {
        let mut cfg = AppConfig::default();
        cfg.cache.ttl_secs = 0;
        assert_eq!(cfg.validate().unwrap_err(), "cache.ttl_secs must be > 0");
    }

    #[test]
    fn redis_url_required_only_for_redis_backend() {
        let mut cfg = AppConfig::default();
        cfg.redis.url = String::new();
        assert!(cfg.validate().is_ok());

        cfg.cache.backend = CacheBackendKind::Redis;
        assert!(cfg.validate().unwrap_err().contains("redis.url"));
    }

    #[test]
    fn memory_backend_ignores_postgres_settings() {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = SourceBackend::Memory;
        cfg.postgres.url = String::new();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn backend_names_round_trip_through_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
[cache]
backend = "redis"
ttl_secs = 60

[storage]
backend = "memory"
"#,
        )
        .unwrap();
        assert_eq!(cfg.cache.backend, CacheBackendKind::Redis);
        assert_eq!(cfg.cache.ttl_secs, 60);
        assert_eq!(cfg.cache.prefetch_limit, 3);
        assert_eq!(cfg.storage.backend, SourceBackend::Memory);
        assert_eq!(cfg.storage.timeout_ms, 5000);
        assert_eq!(cfg.logging.format, LogFormat::Full);
    }

    #[test]
    fn log_format_parses_lowercase() {
        let cfg: AppConfig = toml::from_str(
            r#"
[logging]
level = "debug"
format = "compact"
"#,
        )
        .unwrap();
        assert_eq!(cfg.logging.format, LogFormat::Compact);
        assert_eq!(cfg.logging.level, "debug");
        assert!(toml::from_str::<AppConfig>("[logging]\nformat = \"json\"").is_err());
    }
}
