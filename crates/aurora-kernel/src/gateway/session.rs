//! Anonymous session contract.
//!
//! Sessions are stateless: everything needed to validate one travels inside
//! the signed token, so there is no server-side session table and no
//! revocation list. Validity ends at `expires_at` or as soon as the caller's
//! fingerprint changes.

use serde::{Deserialize, Serialize};

/// Default name of the anonymous session cookie.
pub const SESSION_COOKIE: &str = "aurora_anon_session";

/// Default session lifetime: 12 hours.
pub const SESSION_TTL_SECS: u64 = 12 * 60 * 60;

/// Source of the key used to sign session tokens.
///
/// Implementations decide the lifecycle: a configured secret is loaded once at
/// startup; without one, a random secret is generated once and held for the
/// life of the process.
pub trait SecretProvider: Send + Sync {
    /// Signing key bytes. Never empty.
    fn secret(&self) -> &[u8];

    /// `true` when the secret came from operator configuration and therefore
    /// survives restarts.
    fn is_persistent(&self) -> bool;
}

/// Payload carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sid: String,
    pub issued_at: u64,
    pub expires_at: u64,
    /// Hex digest of `ip|user_agent` at issuance.
    pub fingerprint: String,
}

/// A freshly minted token and the claims inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

/// Result of verifying a token. Deliberately carries no failure reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionVerification {
    Valid { sid: String },
    Invalid,
}

impl SessionVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionVerification::Valid { .. })
    }

    pub fn sid(&self) -> Option<&str> {
        match self {
            SessionVerification::Valid { sid } => Some(sid),
            SessionVerification::Invalid => None,
        }
    }
}
