use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the crawl control-plane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cache: crate::cache::CacheConfig,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub features: FeatureFlags,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            cache: crate::cache::CacheConfig::default(),
            crawler: CrawlerConfig::default(),
            features: FeatureFlags::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &str) -> Result<Self, crate::Error> {
        use crate::Error;

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from environment variables, falling back to
    /// well-known file locations, and finally to defaults.
    pub fn from_env() -> Result<Self, crate::Error> {
        if let Ok(config_path) = std::env::var("CRAWLCTL_CONFIG") {
            return Self::load(&config_path);
        }

        let default_paths = [
            "./config/default.toml",
            "./config/production.toml",
            "/etc/crawlctl/config.toml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        use crate::Error;

        if self.server.port == 0 {
            return Err(Error::Config("Invalid server port".to_string()));
        }

        if self.database.pool_size == 0 {
            return Err(Error::Config("Database pool size must be > 0".to_string()));
        }

        if self.crawler.worker.total_instances == 0 {
            return Err(Error::Config("crawler.worker.totalInstances must be > 0".to_string()));
        }

        if self.crawler.worker.max_threads_per_instance == 0 {
            return Err(Error::Config(
                "crawler.worker.maxThreadsPerInstance must be > 0".to_string(),
            ));
        }

        if self.crawler.user_resource_limit.max_threads_per_window <= 0 {
            return Err(Error::Config(
                "crawler.user-resource-limit.maxThreadsPerWindow must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_workers")]
    pub worker_threads: usize,

    #[serde(default = "default_graceful_shutdown")]
    pub graceful_shutdown_timeout_secs: u64,

    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_threads: default_workers(),
            graceful_shutdown_timeout_secs: default_graceful_shutdown(),
            cors: CorsConfig::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    0 // 0 means use number of CPU cores
}

fn default_graceful_shutdown() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_true")]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allow_credentials: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Durable Job Store connection settings. Postgres only (§2 DJS).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    pub database: String,
    pub username: String,
    pub password: String,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    #[serde(default)]
    pub ssl_mode: SslMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_db_port(),
            database: "crawlctl".to_string(),
            username: "crawlctl".to_string(),
            password: "password".to_string(),
            pool_size: default_pool_size(),
            ssl_mode: SslMode::default(),
        }
    }
}

fn default_db_port() -> u16 {
    5432
}

fn default_pool_size() -> u32 {
    20
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SslMode {
    Disable,
    Prefer,
    Require,
}

impl Default for SslMode {
    fn default() -> Self {
        SslMode::Prefer
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LogFormat {
    Json,
    Text,
}

/// Crawler scheduling configuration (§6 configuration surface)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(rename = "user-resource-limit", default)]
    pub user_resource_limit: UserResourceLimitConfig,

    /// Dispatch tick interval, default 2000 ms (§4.1)
    #[serde(default = "default_dispatch_tick_ms")]
    pub dispatch_tick_ms: u64,

    /// Stats-cleanup interval, default 300 000 ms (§6)
    #[serde(default = "default_stats_cleanup_ms")]
    pub stats_cleanup_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            user_resource_limit: UserResourceLimitConfig::default(),
            dispatch_tick_ms: default_dispatch_tick_ms(),
            stats_cleanup_ms: default_stats_cleanup_ms(),
        }
    }
}

fn default_dispatch_tick_ms() -> u64 {
    2000
}

fn default_stats_cleanup_ms() -> u64 {
    300_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(rename = "totalInstances", default = "default_total_instances")]
    pub total_instances: i32,

    #[serde(rename = "maxThreadsPerInstance", default = "default_max_threads_per_instance")]
    pub max_threads_per_instance: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            total_instances: default_total_instances(),
            max_threads_per_instance: default_max_threads_per_instance(),
        }
    }
}

fn default_total_instances() -> i32 {
    1
}

fn default_max_threads_per_instance() -> i32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResourceLimitConfig {
    #[serde(rename = "timeWindowSeconds", default = "default_time_window_seconds")]
    pub time_window_seconds: u64,

    #[serde(rename = "maxThreadsPerWindow", default = "default_max_threads_per_window")]
    pub max_threads_per_window: i64,

    #[serde(rename = "maxJobsPerWindow", default = "default_max_jobs_per_window")]
    pub max_jobs_per_window: i64,
}

impl Default for UserResourceLimitConfig {
    fn default() -> Self {
        Self {
            time_window_seconds: default_time_window_seconds(),
            max_threads_per_window: default_max_threads_per_window(),
            max_jobs_per_window: default_max_jobs_per_window(),
        }
    }
}

fn default_time_window_seconds() -> u64 {
    3600
}

fn default_max_threads_per_window() -> i64 {
    50
}

fn default_max_jobs_per_window() -> i64 {
    10
}

/// Feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub debug_api: bool,

    #[serde(default = "default_true")]
    pub metrics: bool,

    #[serde(default = "default_true")]
    pub health_check: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            debug_api: true,
            metrics: true,
            health_check: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.pool_size, 20);
        assert_eq!(config.crawler.worker.total_instances, 1);
        assert_eq!(config.crawler.worker.max_threads_per_instance, 10);
        assert_eq!(config.crawler.dispatch_tick_ms, 2000);
        assert_eq!(config.crawler.stats_cleanup_ms, 300_000);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        config.server.port = 8080;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_user_resource_limit_defaults() {
        let limits = UserResourceLimitConfig::default();
        assert_eq!(limits.time_window_seconds, 3600);
        assert_eq!(limits.max_threads_per_window, 50);
        assert_eq!(limits.max_jobs_per_window, 10);
    }
}
