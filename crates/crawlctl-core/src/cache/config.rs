//! Redis cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable Redis-backed caching (live status, resource ledger, transport)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Redis connection configuration
    #[serde(default)]
    pub redis: RedisConfig,

    /// Live Status Cache configuration
    #[serde(default)]
    pub live_status: LiveStatusConfig,

    /// Resource Ledger configuration
    #[serde(default)]
    pub resource_ledger: ResourceLedgerConfig,

    /// Work-queue transport configuration
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis: RedisConfig::default(),
            live_status: LiveStatusConfig::default(),
            resource_ledger: ResourceLedgerConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Development configuration (local Redis, permissive)
    pub fn development() -> Self {
        Self {
            enabled: true,
            redis: RedisConfig::development(),
            ..Self::default()
        }
    }

    /// Production configuration (clustered, secure)
    pub fn production() -> Self {
        Self {
            enabled: true,
            redis: RedisConfig::production(),
            ..Self::default()
        }
    }
}

/// Redis connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis server URL (redis://host:port/db)
    pub url: String,

    /// Use TLS/SSL for connection
    #[serde(default = "default_false")]
    pub use_tls: bool,

    /// Verify TLS certificate
    #[serde(default = "default_true")]
    pub verify_certificate: bool,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connection timeout
    #[serde(default = "default_timeout")]
    pub connect_timeout_ms: u64,

    /// Read timeout
    #[serde(default = "default_timeout")]
    pub read_timeout_ms: u64,

    /// Write timeout
    #[serde(default = "default_timeout")]
    pub write_timeout_ms: u64,

    /// Retry failed connections
    #[serde(default = "default_true")]
    pub retry_on_failure: bool,

    /// Max retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry delay in ms
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Key prefix to avoid collisions
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Default TTL for keys (seconds)
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,

    /// Authentication password
    #[serde(default)]
    pub password: Option<String>,

    /// Database number (0-15)
    #[serde(default)]
    pub database: u8,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            use_tls: false,
            verify_certificate: true,
            pool_size: 20,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            retry_on_failure: true,
            max_retries: 3,
            retry_delay_ms: 1000,
            key_prefix: "crawlctl".to_string(),
            default_ttl_secs: 3600,
            password: None,
            database: 0,
        }
    }
}

impl RedisConfig {
    /// Development configuration (local Redis)
    pub fn development() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            pool_size: 5,
            connect_timeout_ms: 2000,
            ..Self::default()
        }
    }

    /// Production configuration (HA Redis)
    pub fn production() -> Self {
        Self {
            url: "redis://redis-cluster:6379/0".to_string(),
            use_tls: true,
            verify_certificate: true,
            pool_size: 50,
            connect_timeout_ms: 3000,
            retry_on_failure: true,
            max_retries: 5,
            retry_delay_ms: 500,
            key_prefix: "crawlctl:prod".to_string(),
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Live Status Cache configuration (§4.4)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveStatusConfig {
    /// TTL applied to (and refreshed on) every live status write
    #[serde(default = "default_live_status_ttl")]
    pub ttl_secs: u64,
}

impl Default for LiveStatusConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_live_status_ttl(),
        }
    }
}

impl LiveStatusConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_live_status_ttl() -> u64 {
    3600
}

/// Resource Ledger configuration (§4.3, §6)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLedgerConfig {
    /// TTL on the cluster running-set and thread-usage counter
    #[serde(default = "default_cluster_ttl")]
    pub cluster_ttl_secs: u64,

    /// Sliding window for per-user quota counters
    #[serde(default = "default_window")]
    pub time_window_seconds: u64,

    /// Max threads a single user may have in flight within the window
    #[serde(default = "default_max_threads_per_window")]
    pub max_threads_per_window: i64,

    /// Max jobs a single user may start within the window
    #[serde(default = "default_max_jobs_per_window")]
    pub max_jobs_per_window: i64,
}

impl Default for ResourceLedgerConfig {
    fn default() -> Self {
        Self {
            cluster_ttl_secs: default_cluster_ttl(),
            time_window_seconds: default_window(),
            max_threads_per_window: default_max_threads_per_window(),
            max_jobs_per_window: default_max_jobs_per_window(),
        }
    }
}

impl ResourceLedgerConfig {
    pub fn cluster_ttl(&self) -> Duration {
        Duration::from_secs(self.cluster_ttl_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.time_window_seconds)
    }
}

fn default_cluster_ttl() -> u64 {
    3600
}

fn default_window() -> u64 {
    3600
}

fn default_max_threads_per_window() -> i64 {
    50
}

fn default_max_jobs_per_window() -> i64 {
    10
}

/// Work-queue transport configuration (§6)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Stream/topic name
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Number of partitions (backed by `topic:{n}` streams)
    #[serde(default = "default_partitions")]
    pub partitions: u32,

    /// Consumer group name
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    /// Blocking read timeout per poll, in milliseconds
    #[serde(default = "default_poll_block_ms")]
    pub poll_block_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            partitions: default_partitions(),
            consumer_group: default_consumer_group(),
            poll_block_ms: default_poll_block_ms(),
        }
    }
}

fn default_topic() -> String {
    "crawlctl.jobs".to_string()
}

fn default_partitions() -> u32 {
    3
}

fn default_consumer_group() -> String {
    "crawlctl-intake".to_string()
}

fn default_poll_block_ms() -> u64 {
    5000
}

// Default value helper functions
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_pool_size() -> usize {
    20
}
fn default_timeout() -> u64 {
    5000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_key_prefix() -> String {
    "crawlctl".to_string()
}
fn default_ttl() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_default() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://127.0.0.1:6379/0");
        assert_eq!(config.pool_size, 20);
        assert_eq!(config.connect_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_redis_config_development() {
        let config = RedisConfig::development();
        assert_eq!(config.pool_size, 5);
        assert_eq!(config.connect_timeout(), Duration::from_millis(2000));
    }

    #[test]
    fn test_redis_config_production() {
        let config = RedisConfig::production();
        assert!(config.use_tls);
        assert_eq!(config.pool_size, 50);
        assert!(config.verify_certificate);
    }

    #[test]
    fn test_resource_ledger_config_defaults() {
        let config = ResourceLedgerConfig::default();
        assert_eq!(config.window(), Duration::from_secs(3600));
        assert_eq!(config.max_threads_per_window, 50);
        assert_eq!(config.max_jobs_per_window, 10);
    }

    #[test]
    fn test_live_status_config_ttl() {
        let config = LiveStatusConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_transport_config_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.partitions, 3);
        assert_eq!(config.topic, "crawlctl.jobs");
    }
}
