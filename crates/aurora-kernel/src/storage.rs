//! Keyed JSON storage for questions, results and usage stats.
//!
//! Implementations can use in-memory maps, files, or a database. Keys are
//! short identifiers (`questions`, `results`, `stats`); values are whole JSON
//! documents.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored document is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    /// Key contains characters outside `[A-Za-z0-9_-]` or is empty.
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    /// `append` was called on a document that is not a JSON array.
    #[error("document '{0}' is not an array")]
    NotAnArray(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Generic keyed JSON storage
#[async_trait]
pub trait JsonStore: Send + Sync {
    /// Load a document by key. `Ok(None)` if the key doesn't exist.
    async fn read(&self, key: &str) -> StoreResult<Option<serde_json::Value>>;

    /// Create or replace a document.
    async fn write(&self, key: &str, value: &serde_json::Value) -> StoreResult<()>;

    /// Push `value` onto the array stored under `key`, creating it if absent.
    /// Returns the new array length.
    async fn append(&self, key: &str, value: serde_json::Value) -> StoreResult<usize>;

    /// List all keys.
    async fn list(&self) -> StoreResult<Vec<String>>;
}

/// Shared key validation for store implementations.
pub fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_restricted_to_safe_characters() {
        assert!(validate_key("results").is_ok());
        assert!(validate_key("ai-config_v2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a b").is_err());
    }
}
