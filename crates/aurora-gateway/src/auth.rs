//! Password-based admin authorization.
//!
//! A correct password is exchanged for an admin token minted by the session
//! codec under its own tag, so an anonymous visitor token can never pass as
//! an admin credential. Admin tokens carry the same fingerprint binding.

use crate::session::{ADMIN_TOKEN_TAG, SessionCodec};
use aurora_kernel::auth::AdminAuthorizer;
use aurora_kernel::gateway::{ClientFingerprint, SecretProvider};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{error, warn};

/// Cookie carrying the admin token.
pub const ADMIN_COOKIE: &str = "aurora_admin_session";
/// Admin token lifetime: 8 hours.
pub const ADMIN_TTL_SECS: u64 = 8 * 60 * 60;

pub struct PasswordAuthorizer {
    password_digest: Option<[u8; 32]>,
    codec: SessionCodec,
}

impl PasswordAuthorizer {
    /// `password` of `None` (or blank) disables the admin panel.
    pub fn new(password: Option<&str>, secret: Arc<dyn SecretProvider>) -> Self {
        let password_digest = password
            .filter(|p| !p.is_empty())
            .map(|p| Sha256::digest(p.as_bytes()).into());
        if password_digest.is_none() {
            warn!("no admin password configured; admin routes answer NOT_CONFIGURED");
        }
        Self {
            password_digest,
            codec: SessionCodec::new(secret)
                .with_tag(ADMIN_TOKEN_TAG)
                .with_ttl_secs(ADMIN_TTL_SECS),
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.codec.ttl_secs()
    }
}

impl AdminAuthorizer for PasswordAuthorizer {
    fn is_configured(&self) -> bool {
        self.password_digest.is_some()
    }

    fn authenticate(&self, password: &str, client: &ClientFingerprint) -> Option<String> {
        let expected = self.password_digest.as_ref()?;
        let offered: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        if !bool::from(offered[..].ct_eq(&expected[..])) {
            return None;
        }
        match self.codec.issue(client) {
            Ok(issued) => Some(issued.token),
            Err(e) => {
                error!(error = %e, "failed to mint admin token");
                None
            }
        }
    }

    fn is_authorized(&self, credential: Option<&str>, client: &ClientFingerprint) -> bool {
        self.is_configured()
            && credential.is_some_and(|token| self.codec.verify(token, client).is_valid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StaticSecret;

    fn secret() -> Arc<dyn SecretProvider> {
        Arc::new(StaticSecret::new("admin-test-secret"))
    }

    fn client() -> ClientFingerprint {
        ClientFingerprint::new("198.51.100.4", "Firefox")
    }

    #[test]
    fn login_round_trip() {
        let auth = PasswordAuthorizer::new(Some("correct horse"), secret());
        assert!(auth.is_configured());
        assert_eq!(auth.authenticate("wrong", &client()), None);

        let token = auth.authenticate("correct horse", &client()).unwrap();
        assert!(token.starts_with("adm1."));
        assert!(auth.is_authorized(Some(&token), &client()));
        let moved = ClientFingerprint::new("10.0.0.1", "Firefox");
        assert!(!auth.is_authorized(Some(&token), &moved));
        assert!(!auth.is_authorized(None, &client()));
    }

    #[test]
    fn anonymous_session_is_not_admin() {
        let secret = secret();
        let auth = PasswordAuthorizer::new(Some("pw"), secret.clone());
        let anon = SessionCodec::new(secret).issue(&client()).unwrap().token;
        assert!(!auth.is_authorized(Some(&anon), &client()));
    }

    #[test]
    fn unconfigured_rejects_everything() {
        let auth = PasswordAuthorizer::new(None, secret());
        assert!(!auth.is_configured());
        assert_eq!(auth.authenticate("", &client()), None);
        assert!(!PasswordAuthorizer::new(Some(""), secret()).is_configured());
    }
}
