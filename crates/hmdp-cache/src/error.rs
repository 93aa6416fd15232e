//! Error types for the cache layer.

use std::fmt;
use std::time::Duration;

/// Boxed error produced by a backing-store collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while reading through or writing around the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache store rejected or failed a command.
    #[error("Cache store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
    },

    /// A cached payload could not be encoded or decoded.
    #[error("Codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// The backing store failed to fetch or persist a record.
    #[error("Backing store error: {source}")]
    BackingStore {
        /// The collaborator's own error.
        #[source]
        source: BoxError,
    },

    /// The per-key lock could not be acquired within the allowed wait.
    #[error("Timed out after {waited:?} waiting for lock {key}")]
    LockTimeout {
        /// The lock key that stayed held.
        key: String,
        /// How long the caller waited.
        waited: Duration,
    },

    /// The rebuild dispatcher is shutting down and accepts no new work.
    #[error("Rebuild dispatcher is closed")]
    DispatcherClosed,
}

impl CacheError {
    /// Creates a new `Store` error.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates a new `Codec` error.
    #[must_use]
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Wraps a backing-store failure.
    pub fn backing_store(source: impl Into<BoxError>) -> Self {
        Self::BackingStore {
            source: source.into(),
        }
    }

    /// Creates a new `LockTimeout` error.
    #[must_use]
    pub fn lock_timeout(key: impl Into<String>, waited: Duration) -> Self {
        Self::LockTimeout {
            key: key.into(),
            waited,
        }
    }

    /// Returns `true` if the backing store failed.
    #[must_use]
    pub fn is_backing_store(&self) -> bool {
        matches!(self, Self::BackingStore { .. })
    }

    /// Returns `true` if the lock wait was exhausted.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Store { .. } => ErrorCategory::Infrastructure,
            Self::Codec { .. } => ErrorCategory::Codec,
            Self::BackingStore { .. } => ErrorCategory::BackingStore,
            Self::LockTimeout { .. } => ErrorCategory::Contention,
            Self::DispatcherClosed => ErrorCategory::Lifecycle,
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        Self::store(format!("redis: {e}"))
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        Self::store(format!("failed to get Redis connection: {e}"))
    }
}

/// Categories of cache errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Cache store unavailable or misbehaving.
    Infrastructure,
    /// Payload (de)serialization.
    Codec,
    /// System-of-record failure.
    BackingStore,
    /// Lock contention that outlasted the wait budget.
    Contention,
    /// Component started or stopped at the wrong time.
    Lifecycle,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Codec => write!(f, "codec"),
            Self::BackingStore => write!(f, "backing_store"),
            Self::Contention => write!(f, "contention"),
            Self::Lifecycle => write!(f, "lifecycle"),
        }
    }
}

/// Type alias for a cache result.
pub type CacheResult<T> = Result<T, CacheError>;
