//! Signed, expiring session tokens bound to a client fingerprint.
//!
//! Token layout (three dot-separated segments):
//!
//! ```text
//! <tag> . base64url(payload) . base64url(HMAC-SHA256(secret, "<tag>.<payload-b64>"))
//! ```
//!
//! The payload is length-prefixed big-endian binary:
//!
//! ```text
//! u16 sid_len | sid | u64 issued_at | u64 expires_at | u16 fp_len | fingerprint
//! ```
//!
//! The tag is covered by the signature, so tokens minted under one tag (the
//! anonymous `v1` sessions) never verify under another (the `adm1` admin
//! tokens) even though both share the same secret.

use aurora_kernel::gateway::{
    ClientFingerprint, IssuedSession, SESSION_TTL_SECS, SecretProvider, SessionClaims,
    SessionVerification,
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Tag of anonymous visitor sessions.
pub const ANON_TOKEN_TAG: &str = "v1";
/// Tag of admin panel tokens.
pub const ADMIN_TOKEN_TAG: &str = "adm1";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session secret rejected by HMAC: {0}")]
    InvalidSecret(String),
    #[error("session field too long to encode")]
    FieldTooLong,
}

pub struct SessionCodec {
    secret: Arc<dyn SecretProvider>,
    tag: &'static str,
    ttl_secs: u64,
}

impl SessionCodec {
    /// Codec for anonymous sessions with the default 12 h lifetime.
    pub fn new(secret: Arc<dyn SecretProvider>) -> Self {
        Self {
            secret,
            tag: ANON_TOKEN_TAG,
            ttl_secs: SESSION_TTL_SECS,
        }
    }

    pub fn with_tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Mint a token for `client` valid from now.
    pub fn issue(&self, client: &ClientFingerprint) -> Result<IssuedSession, SessionError> {
        self.issue_at(client, unix_now())
    }

    pub fn issue_at(
        &self,
        client: &ClientFingerprint,
        now: u64,
    ) -> Result<IssuedSession, SessionError> {
        let claims = SessionClaims {
            sid: Uuid::new_v4().simple().to_string(),
            issued_at: now,
            expires_at: now.saturating_add(self.ttl_secs),
            fingerprint: fingerprint(client),
        };
        let payload = URL_SAFE_NO_PAD.encode(encode_claims(&claims)?);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload)?);
        Ok(IssuedSession {
            token: format!("{}.{}.{}", self.tag, payload, signature),
            claims,
        })
    }

    /// Verify `token` for the current caller.
    pub fn verify(&self, token: &str, client: &ClientFingerprint) -> SessionVerification {
        self.verify_at(token, client, unix_now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        client: &ClientFingerprint,
        now: u64,
    ) -> SessionVerification {
        self.check(token, client, now)
            .map(|sid| SessionVerification::Valid { sid })
            .unwrap_or(SessionVerification::Invalid)
    }

    fn check(&self, token: &str, client: &ClientFingerprint, now: u64) -> Option<String> {
        let mut parts = token.split('.');
        let (tag, payload, signature) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || tag != self.tag {
            return None;
        }

        let provided = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let expected = self.sign(payload).ok()?;
        if provided.len() != expected.len() || !bool::from(provided.ct_eq(&expected)) {
            return None;
        }

        let claims = decode_claims(&URL_SAFE_NO_PAD.decode(payload).ok()?)?;
        if claims.expires_at <= now || claims.expires_at <= claims.issued_at {
            return None;
        }
        let current = fingerprint(client);
        if !bool::from(current.as_bytes().ct_eq(claims.fingerprint.as_bytes())) {
            return None;
        }
        Some(claims.sid)
    }

    fn sign(&self, payload_b64: &str) -> Result<Vec<u8>, SessionError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.secret())
            .map_err(|e| SessionError::InvalidSecret(e.to_string()))?;
        mac.update(self.tag.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Hex SHA-256 of `ip|user_agent`.
pub fn fingerprint(client: &ClientFingerprint) -> String {
    let mut hasher = Sha256::new();
    hasher.update(client.ip.as_bytes());
    hasher.update(b"|");
    hasher.update(client.user_agent.as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn encode_claims(claims: &SessionClaims) -> Result<Vec<u8>, SessionError> {
    let sid = claims.sid.as_bytes();
    let fp = claims.fingerprint.as_bytes();
    let sid_len = u16::try_from(sid.len()).map_err(|_| SessionError::FieldTooLong)?;
    let fp_len = u16::try_from(fp.len()).map_err(|_| SessionError::FieldTooLong)?;

    let mut out = Vec::with_capacity(2 + sid.len() + 16 + 2 + fp.len());
    out.extend_from_slice(&sid_len.to_be_bytes());
    out.extend_from_slice(sid);
    out.extend_from_slice(&claims.issued_at.to_be_bytes());
    out.extend_from_slice(&claims.expires_at.to_be_bytes());
    out.extend_from_slice(&fp_len.to_be_bytes());
    out.extend_from_slice(fp);
    Ok(out)
}

fn decode_claims(bytes: &[u8]) -> Option<SessionClaims> {
    let mut reader = Reader(bytes);
    let sid_len = reader.u16()? as usize;
    let sid = std::str::from_utf8(reader.take(sid_len)?).ok()?.to_string();
    let issued_at = reader.u64()?;
    let expires_at = reader.u64()?;
    let fp_len = reader.u16()? as usize;
    let fingerprint = std::str::from_utf8(reader.take(fp_len)?).ok()?.to_string();
    if !reader.0.is_empty() || sid.is_empty() {
        return None;
    }
    Some(SessionClaims {
        sid,
        issued_at,
        expires_at,
        fingerprint,
    })
}

struct Reader<'a>(&'a [u8]);

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let (head, tail) = self.0.split_at_checked(n)?;
        self.0 = tail;
        Some(head)
    }

    fn u16(&mut self) -> Option<u16> {
        Some(u16::from_be_bytes(self.take(2)?.try_into().ok()?))
    }

    fn u64(&mut self) -> Option<u64> {
        Some(u64::from_be_bytes(self.take(8)?.try_into().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StaticSecret;

    fn codec() -> SessionCodec {
        SessionCodec::new(Arc::new(StaticSecret::new("unit-test-secret-0123456789abcdef")))
    }

    fn alice() -> ClientFingerprint {
        ClientFingerprint::new("203.0.113.7", "Mozilla/5.0 (X11; Linux x86_64)")
    }

    fn flip(c: char) -> char {
        if c == 'A' { 'B' } else { 'A' }
    }

    #[test]
    fn issued_token_verifies_for_same_client() {
        let codec = codec();
        let issued = codec.issue(&alice()).unwrap();
        assert!(issued.token.starts_with("v1."));
        assert_eq!(issued.token.split('.').count(), 3);
        assert_eq!(
            codec.verify(&issued.token, &alice()),
            SessionVerification::Valid {
                sid: issued.claims.sid.clone()
            }
        );
        assert_eq!(
            issued.claims.expires_at - issued.claims.issued_at,
            12 * 60 * 60
        );
    }

    #[test]
    fn every_single_character_flip_is_rejected() {
        let codec = codec();
        let token = codec.issue(&alice()).unwrap().token;
        let payload_start = token.find('.').unwrap() + 1;

        for (i, c) in token.char_indices().skip(payload_start) {
            if c == '.' {
                continue;
            }
            let mut tampered = token.clone();
            tampered.replace_range(i..i + 1, &flip(c).to_string());
            assert!(
                !codec.verify(&tampered, &alice()).is_valid(),
                "flip at {i} was accepted"
            );
        }
    }

    #[test]
    fn token_bound_to_ip_and_user_agent() {
        let codec = codec();
        let token = codec.issue(&alice()).unwrap().token;
        let moved = ClientFingerprint::new("198.51.100.1", alice().user_agent);
        let new_browser = ClientFingerprint::new(alice().ip, "curl/8.0");
        assert!(!codec.verify(&token, &moved).is_valid());
        assert!(!codec.verify(&token, &new_browser).is_valid());
    }

    #[test]
    fn expired_token_rejected() {
        let codec = codec();
        let long_ago = unix_now() - 13 * 60 * 60;
        let token = codec.issue_at(&alice(), long_ago).unwrap().token;
        assert!(!codec.verify(&token, &alice()).is_valid());

        let issued = codec.issue_at(&alice(), 1_000).unwrap();
        let exp = issued.claims.expires_at;
        assert!(codec.verify_at(&issued.token, &alice(), exp - 1).is_valid());
        assert!(!codec.verify_at(&issued.token, &alice(), exp).is_valid());
    }

    #[test]
    fn structural_garbage_rejected() {
        let codec = codec();
        let token = codec.issue(&alice()).unwrap().token;
        let (_, rest) = token.split_once('.').unwrap();
        for bad in [
            "",
            "v1",
            "v1..",
            "v1.a.b.c",
            "not-a-token",
            &format!("v2.{rest}"),
            &format!("{token}.extra"),
        ] {
            assert!(!codec.verify(bad, &alice()).is_valid(), "{bad:?}");
        }
    }

    #[test]
    fn other_secret_rejects() {
        let token = codec().issue(&alice()).unwrap().token;
        let other = SessionCodec::new(Arc::new(StaticSecret::new("a-completely-different-secret!!")));
        assert!(!other.verify(&token, &alice()).is_valid());
    }

    #[test]
    fn tags_do_not_cross_verify() {
        let secret: Arc<dyn SecretProvider> = Arc::new(StaticSecret::new("shared-secret-for-both-codecs"));
        let anon = SessionCodec::new(secret.clone());
        let admin = SessionCodec::new(secret).with_tag(ADMIN_TOKEN_TAG);

        let anon_token = anon.issue(&alice()).unwrap().token;
        let admin_token = admin.issue(&alice()).unwrap().token;
        assert!(!admin.verify(&anon_token, &alice()).is_valid());
        assert!(!anon.verify(&admin_token, &alice()).is_valid());

        // Swapping the tag text alone must not help either.
        let relabelled = anon_token.replacen("v1.", "adm1.", 1);
        assert!(!admin.verify(&relabelled, &alice()).is_valid());
    }

    #[test]
    fn claims_round_trip_through_binary_payload() {
        let claims = SessionClaims {
            sid: "abc".into(),
            issued_at: 7,
            expires_at: 9,
            fingerprint: "ff".into(),
        };
        let bytes = encode_claims(&claims).unwrap();
        assert_eq!(decode_claims(&bytes), Some(claims));
        assert_eq!(decode_claims(&bytes[..bytes.len() - 1]), None);
        let mut trailing = bytes.clone();
        trailing.push(0);
        assert_eq!(decode_claims(&trailing), None);
    }
}
