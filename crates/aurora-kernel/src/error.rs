//! Crate-level error type for `aurora-kernel`.
//!
//! [`KernelError`] composes the typed errors of every sub-module so startup
//! code can use `?` across config loading, validation and storage.

use crate::gateway::GatewayError;
use crate::llm::ProviderError;
use crate::storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// Admission configuration failed validation.
    #[error("Gateway config error: {0}")]
    Gateway(#[from] GatewayError),

    /// A configuration file could not be loaded (requires the `config` feature).
    #[cfg(feature = "config")]
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_gateway_error_with_context_prefix() {
        let err: KernelError = GatewayError::InvalidSessionTtl.into();
        assert_eq!(
            err.to_string(),
            "Gateway config error: session ttl must be greater than 0 seconds"
        );
    }
}
