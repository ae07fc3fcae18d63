//! Core data types for the admission contract.
//!
//! These types are shared by every
//! [`AdmissionFilter`](super::filter::AdmissionFilter) and carry no runtime
//! dependencies beyond `serde` and `std`, so the gateway crate can translate
//! them to and from its HTTP framework of choice.

use super::envelope::ErrorCode;
use super::rate_limit::RateLimitDecision;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method as seen by the admission pipeline.
///
/// Methods outside the standard set are preserved in [`HttpMethod::Other`] so
/// that the transport policy can reject them with `405` instead of failing to
/// parse the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Other(String),
}

impl HttpMethod {
    /// Case-insensitive parse; never fails.
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            other => HttpMethod::Other(other.to_string()),
        }
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Other(m) => m.as_str(),
        }
    }
}

/// `true` when `path` equals `prefix` or lives under it as a path segment.
///
/// `/api/analysis/stream` is under `/api/analysis`; `/api/analysis-x` is not.
pub fn path_matches(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// Sentinel client address used when no forwarding header is present.
pub const UNKNOWN_CLIENT_IP: &str = "unknown";

/// An inbound request as seen by the admission pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRequest {
    /// Unique identifier for correlating this request across logs.
    pub id: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path without query string. Filters may rewrite it.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// HTTP headers (header names are lowercased).
    pub headers: HashMap<String, String>,
}

impl AdmissionRequest {
    /// Construct a minimal request with the given id, method and path.
    pub fn new(id: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            query: None,
            headers: HashMap::new(),
        }
    }

    /// Builder helper: attach a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Builder helper: set the query string.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Header lookup by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Resolved client address: first `X-Forwarded-For` entry, then
    /// `X-Real-IP`, then [`UNKNOWN_CLIENT_IP`].
    pub fn client_ip(&self) -> String {
        resolve_client_ip(
            self.header("x-forwarded-for"),
            self.header("x-real-ip"),
        )
    }

    /// `User-Agent` header, empty when absent.
    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or_default()
    }

    /// Value of the named cookie from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("cookie").and_then(|raw| find_cookie(raw, name))
    }

    /// Fingerprint inputs of the caller.
    pub fn fingerprint(&self) -> ClientFingerprint {
        ClientFingerprint::new(self.client_ip(), self.user_agent())
    }

    /// Media type of the body without parameters, lowercased.
    pub fn media_type(&self) -> Option<String> {
        self.header("content-type").map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

/// Shared client-address resolution used by both the admission pipeline and
/// the route handlers.
pub fn resolve_client_ip(forwarded_for: Option<&str>, real_ip: Option<&str>) -> String {
    forwarded_for
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| real_ip.map(str::trim).filter(|v| !v.is_empty()))
        .unwrap_or(UNKNOWN_CLIENT_IP)
        .to_string()
}

/// Parse a `Cookie` header and return the value of `name`.
pub fn find_cookie<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    raw.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k.trim() == name).then(|| v.trim())
    })
}

/// The two inputs a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFingerprint {
    pub ip: String,
    pub user_agent: String,
}

impl ClientFingerprint {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Synthetic responses
// ─────────────────────────────────────────────────────────────────────────────

/// A response produced by the pipeline itself (preflight, redirects).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl SyntheticResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Builder helper: attach a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into().to_lowercase(), value.into()));
        self
    }
}

/// How a decoration is applied to the outgoing header map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOp {
    /// Replace any existing value.
    Set,
    /// Add alongside existing values (`Set-Cookie`, `Vary`).
    Append,
}

/// Header decorations collected from the response hooks of every filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderPatch {
    entries: Vec<(HeaderOp, String, String)>,
}

impl HeaderPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing an earlier `set` of the same header in this patch.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.entries
            .retain(|(op, n, _)| !(*op == HeaderOp::Set && *n == name));
        self.entries.push((HeaderOp::Set, name, value.into()));
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((HeaderOp::Append, name.into().to_lowercase(), value.into()));
    }

    /// First value recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, n, _)| n == name)
            .map(|(_, _, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderOp, String, String)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request context
// ─────────────────────────────────────────────────────────────────────────────

/// Result of checking the session cookie of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// The session filter has not run yet.
    #[default]
    Unchecked,
    /// No session cookie was sent.
    Missing,
    /// A cookie was sent but failed verification.
    Invalid,
    /// The cookie verified; carries the session id.
    Valid { sid: String },
}

impl SessionStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionStatus::Valid { .. })
    }

    pub fn sid(&self) -> Option<&str> {
        match self {
            SessionStatus::Valid { sid } => Some(sid),
            _ => None,
        }
    }
}

/// Where the request ended up after the request phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdmissionOutcome {
    /// The request phase is still running.
    #[default]
    Pending,
    /// Handed to the route handlers.
    Forwarded,
    /// Blocked with an error envelope.
    Rejected(ErrorCode),
    /// Answered by the pipeline itself (CORS preflight).
    Answered,
    /// Redirected (locale routing).
    Redirected,
}

/// Mutable context that flows through the filter chain for a single request.
///
/// Filters read from and write to this context, enabling later filters to
/// act on decisions made by earlier ones (the rate limiter keys on the session
/// resolved by the session filter, for example).
#[derive(Debug, Clone)]
pub struct AdmissionContext {
    /// The inbound request (path possibly rewritten).
    pub request: AdmissionRequest,
    /// Path exactly as received.
    pub original_path: String,
    /// Outcome of session verification.
    pub session: SessionStatus,
    /// Endpoint class the request was counted against.
    pub endpoint_class: Option<String>,
    /// Rate-limit decision for this request, if it was counted.
    pub rate_limit: Option<RateLimitDecision>,
    /// Final request-phase outcome.
    pub outcome: AdmissionOutcome,
    /// Free-form attributes written and read by filters.
    pub attributes: HashMap<String, serde_json::Value>,
}

impl AdmissionContext {
    /// Create a fresh context from an inbound request.
    pub fn new(request: AdmissionRequest) -> Self {
        Self {
            original_path: request.path.clone(),
            request,
            session: SessionStatus::Unchecked,
            endpoint_class: None,
            rate_limit: None,
            outcome: AdmissionOutcome::Pending,
            attributes: HashMap::new(),
        }
    }

    /// `true` once a filter changed the request path.
    pub fn path_rewritten(&self) -> bool {
        self.original_path != self.request.path
    }

    /// Read a typed attribute, `None` if absent or of another shape.
    pub fn get_attr<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Write a serializable attribute.
    pub fn set_attr<T: serde::Serialize>(&mut self, key: impl Into<String>, val: &T) {
        if let Ok(v) = serde_json::to_value(val) {
            self.attributes.insert(key.into(), v);
        }
    }
}
