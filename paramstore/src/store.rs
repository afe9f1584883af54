use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced when reading a parameter from the remote store.
///
/// None of these are retryable from the caller's perspective; the cache never
/// retries internally and any retry policy belongs to whoever resolves the
/// configuration.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Parameter not found: '{name}' at store path '{path}'")]
    NotFound { name: String, path: String },

    #[error("Access denied reading parameter '{name}': the store credential lacks decrypted-read access")]
    AccessDenied { name: String },

    #[error("Parameter store request failed for '{name}': {detail}")]
    Request { name: String, detail: String },
}

/// Remote source of named configuration values.
///
/// Implementations must request decrypted retrieval; callers receive
/// plaintext values and are responsible for keeping secrets out of logs.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<String, StoreError>;
}
