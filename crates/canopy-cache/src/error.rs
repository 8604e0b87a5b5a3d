//! Error types for the tenancy cache.
//!
//! # Purpose
//! Classifies failures by where they came from (cache backend, relational
//! source, stored bytes) so callers can decide between surfacing an error and
//! degrading to a recompute.
//!
//! # Notes
//! A missing key is never an error; lookups return `Option` instead.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend could not be reached or rejected the command.
    #[error("cache backend unavailable: {0}")]
    BackendUnavailable(String),
    /// The relational source could not be read.
    #[error("relational source unavailable: {0}")]
    SourceUnavailable(String),
    /// A stored value could not be decoded.
    #[error("failed to decode {key}: {message}")]
    Deserialization { key: String, message: String },
    /// A value could not be encoded for storage.
    #[error("failed to encode value: {0}")]
    Serialization(String),
    /// Backend configuration was rejected before any connection was made.
    #[error("invalid backend configuration: {0}")]
    Config(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::BackendUnavailable(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        CacheError::BackendUnavailable(err.to_string())
    }
}

impl From<deadpool_redis::CreatePoolError> for CacheError {
    fn from(err: deadpool_redis::CreatePoolError) -> Self {
        CacheError::Config(err.to_string())
    }
}

impl From<sqlx::Error> for CacheError {
    fn from(err: sqlx::Error) -> Self {
        CacheError::SourceUnavailable(err.to_string())
    }
}
