//! Admin authorization predicate.
//!
//! The admission layer never inspects admin credentials itself; handlers for
//! the admin panel ask an [`AdminAuthorizer`] whether the caller may proceed.

use crate::gateway::ClientFingerprint;

pub trait AdminAuthorizer: Send + Sync {
    /// `false` when no admin credential is configured; admin routes then
    /// answer `NOT_CONFIGURED`.
    fn is_configured(&self) -> bool;

    /// Exchange a password for a bearer credential bound to `client`.
    /// `None` on a wrong password or when unconfigured.
    fn authenticate(&self, password: &str, client: &ClientFingerprint) -> Option<String>;

    /// Whether `credential` (cookie or bearer value) authorizes `client`.
    fn is_authorized(&self, credential: Option<&str>, client: &ClientFingerprint) -> bool;
}
