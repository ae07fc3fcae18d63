//! Admission filter trait and filter-chain types.
//!
//! The admission pipeline is an ordered list of [`AdmissionFilter`]
//! instances applied to every request and response. Filters are sorted by
//! their declared [`FilterOrder`] and executed in ascending order on the
//! request path and descending order on the response path.
//!
//! ```text
//! Request  ──► Rewrite ──► Session ──► RateLimit ──► Routing ──► Policy ──► Headers ──► Logging
//!                  (route handler runs here, unless a filter short-circuited)
//! Response ◄── Rewrite ◄── Session ◄── RateLimit ◄── Routing ◄── Policy ◄── Headers ◄── Logging
//! ```
//!
//! Response hooks run for *every* response, including short-circuited ones,
//! so decorations such as security headers are never skipped.

use super::envelope::ErrorCode;
use super::error::GatewayError;
use super::types::{AdmissionContext, HeaderPatch, SyntheticResponse};
use async_trait::async_trait;

// ─────────────────────────────────────────────────────────────────────────────
// Filter ordering
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric ordering slot for a filter in the chain.
///
/// Filters with equal order values are executed in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilterOrder(pub u32);

impl FilterOrder {
    /// Request rewriting before any policy is evaluated.
    pub const REWRITE: FilterOrder = FilterOrder(0);
    /// Session verification slot.
    pub const SESSION: FilterOrder = FilterOrder(100);
    /// Rate-limiting slot.
    pub const RATE_LIMIT: FilterOrder = FilterOrder(200);
    /// Page routing (locale resolution) slot.
    pub const ROUTING: FilterOrder = FilterOrder(250);
    /// Transport policy (methods, content type, preflight).
    pub const POLICY: FilterOrder = FilterOrder(300);
    /// Response header decoration.
    pub const HEADERS: FilterOrder = FilterOrder(400);
    /// Access logging, runs last on the request path.
    pub const LOGGING: FilterOrder = FilterOrder(500);
}

// ─────────────────────────────────────────────────────────────────────────────
// Filter action
// ─────────────────────────────────────────────────────────────────────────────

/// A blocked request: the error envelope to send plus extra headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub code: ErrorCode,
    pub message: String,
    pub headers: Vec<(String, String)>,
}

impl Rejection {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into().to_lowercase(), value.into()));
        self
    }
}

/// Instruction returned by [`AdmissionFilter::on_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    /// Pass the (possibly modified) request to the next filter or the handler.
    Continue,
    /// Short-circuit with an error envelope.
    Reject(Rejection),
    /// Short-circuit with a response built by the filter.
    Respond(SyntheticResponse),
    /// Short-circuit and redirect the caller to a different path.
    Redirect(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// AdmissionFilter trait
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for a single filter in the admission pipeline.
///
/// Implementations must be `Send + Sync` so they can be shared across Tokio
/// tasks without additional synchronization by the caller.
#[async_trait]
pub trait AdmissionFilter: Send + Sync {
    /// Stable, human-readable identifier for this filter (used in logs).
    fn name(&self) -> &str;

    /// Position in the filter chain.
    fn order(&self) -> FilterOrder;

    /// Called with the inbound request before it reaches a route handler.
    async fn on_request(&self, ctx: &mut AdmissionContext) -> Result<FilterAction, GatewayError>;

    /// Called before the response leaves the process; adds header
    /// decorations to `headers`. `ctx.outcome` tells how the request ended.
    async fn on_response(
        &self,
        _ctx: &AdmissionContext,
        _headers: &mut HeaderPatch,
    ) -> Result<(), GatewayError> {
        Ok(())
    }
}
