//! Redis-backed fast-path state: the Live Status Cache, the Resource Ledger,
//! and the work-queue transport.
//!
//! ## Performance characteristics
//!
//! - Connection pooling via `ConnectionManager`: reduces per-call overhead
//! - Async operations: non-blocking Redis calls
//! - TTL everywhere: every key that tracks in-flight state expires, bounding
//!   leakage from a crashed process to a single TTL window

pub mod config;
pub mod connection;
pub mod live_status;
pub mod resource_ledger;
pub mod transport;

pub use config::{CacheConfig, LiveStatusConfig, RedisConfig, ResourceLedgerConfig, TransportConfig};
pub use connection::{RedisConnection, RedisPool};
pub use live_status::LiveStatusCache;
pub use resource_ledger::ResourceLedger;
pub use transport::{StreamTransport, TransportMessage};

/// Cache result type alias
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    #[error("Operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Pool exhausted")]
    PoolExhausted,

    #[error("Timeout waiting for connection")]
    Timeout,
}

impl From<CacheError> for crate::Error {
    fn from(err: CacheError) -> Self {
        crate::Error::StoreError(err.to_string())
    }
}

/// Connection state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting,
    Failed,
    Exhausted,
}

/// Cache key prefix to avoid collisions between deployments
#[derive(Debug, Clone)]
pub struct KeyPrefix {
    prefix: String,
}

impl KeyPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, key: impl AsRef<str>) -> String {
        format!("{}:{}", self.prefix, key.as_ref())
    }
}

impl Default for KeyPrefix {
    fn default() -> Self {
        Self::new("crawlctl")
    }
}

/// Cache namespace for the two Redis-backed subsystems (§6 key-value store)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNamespace {
    LiveStatus,
    ResourceLedger,
}

impl CacheNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            CacheNamespace::LiveStatus => "scraping:job:live:status",
            CacheNamespace::ResourceLedger => "crawler",
        }
    }

    pub fn key(&self, key: impl AsRef<str>) -> String {
        format!("{}:{}", self.prefix(), key.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefix() {
        let prefix = KeyPrefix::new("test");
        assert_eq!(prefix.key("job:123"), "test:job:123");
    }

    #[test]
    fn test_cache_namespace() {
        assert_eq!(
            CacheNamespace::LiveStatus.key("abc-123"),
            "scraping:job:live:status:abc-123"
        );
    }
}
