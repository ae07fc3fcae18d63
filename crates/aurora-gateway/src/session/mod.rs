//! Anonymous session tokens: codec, signing secrets and cookie formatting.

mod codec;
mod secret;

pub use codec::{ADMIN_TOKEN_TAG, ANON_TOKEN_TAG, SessionCodec, SessionError, fingerprint};
pub use secret::{EPHEMERAL_SECRET_LEN, EphemeralSecret, StaticSecret, resolve_secret};

/// `Set-Cookie` value for a session token.
pub fn format_set_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{name}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes `name` from the browser.
pub fn format_clear_cookie(name: &str, secure: bool) -> String {
    format_set_cookie(name, "", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_attributes() {
        let c = format_set_cookie("aurora_anon_session", "v1.a.b", 43_200, false);
        assert_eq!(
            c,
            "aurora_anon_session=v1.a.b; Path=/; Max-Age=43200; HttpOnly; SameSite=Lax"
        );
        assert!(format_set_cookie("n", "v", 1, true).ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let c = format_clear_cookie("aurora_admin", true);
        assert!(c.starts_with("aurora_admin=; "));
        assert!(c.contains("Max-Age=0"));
    }
}
