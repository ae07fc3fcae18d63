//! Signing-key providers for the session codec.

use aurora_kernel::gateway::SecretProvider;
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{info, warn};

/// Length of a generated secret in bytes.
pub const EPHEMERAL_SECRET_LEN: usize = 32;

/// Secret supplied by the operator; survives restarts.
pub struct StaticSecret {
    key: Vec<u8>,
}

impl StaticSecret {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }
}

impl SecretProvider for StaticSecret {
    fn secret(&self) -> &[u8] {
        &self.key
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

/// Random secret generated once and held for the life of the process.
///
/// Every token minted under it becomes unverifiable after a restart.
pub struct EphemeralSecret {
    key: [u8; EPHEMERAL_SECRET_LEN],
}

impl EphemeralSecret {
    pub fn generate() -> Self {
        let mut key = [0u8; EPHEMERAL_SECRET_LEN];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }
}

impl SecretProvider for EphemeralSecret {
    fn secret(&self) -> &[u8] {
        &self.key
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// Pick the configured secret when present and non-blank, otherwise
/// generate an ephemeral one.
pub fn resolve_secret(configured: Option<&str>) -> Arc<dyn SecretProvider> {
    match configured.map(str::trim).filter(|s| !s.is_empty()) {
        Some(key) => {
            info!("session secret loaded from configuration");
            Arc::new(StaticSecret::new(key.as_bytes()))
        }
        None => {
            warn!(
                "no session secret configured; using a random per-process secret. \
                 Sessions will not survive a restart."
            );
            Arc::new(EphemeralSecret::generate())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_secret_is_persistent() {
        let provider = resolve_secret(Some("operator-key"));
        assert!(provider.is_persistent());
        assert_eq!(provider.secret(), b"operator-key");
    }

    #[test]
    fn blank_secret_falls_back_to_ephemeral() {
        for configured in [None, Some(""), Some("   ")] {
            let provider = resolve_secret(configured);
            assert!(!provider.is_persistent());
            assert_eq!(provider.secret().len(), EPHEMERAL_SECRET_LEN);
        }
    }

    #[test]
    fn ephemeral_secrets_differ() {
        let a = EphemeralSecret::generate();
        let b = EphemeralSecret::generate();
        assert_ne!(a.secret(), b.secret());
    }
}
