//! `aurora-gateway` - Aurora personality-test service runtime.
//!
//! Concrete implementations of the contracts defined in `aurora-kernel`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`SecretProvider`](gateway::SecretProvider) | [`session::StaticSecret`], [`session::EphemeralSecret`] |
//! | [`RateLimitStore`](gateway::RateLimitStore) | [`rate_limit::InMemoryRateLimitStore`] |
//! | [`AdmissionFilter`](gateway::AdmissionFilter) | everything in [`filter`] |
//! | [`JsonStore`](aurora_kernel::storage::JsonStore) | [`store::FileJsonStore`], [`store::InMemoryJsonStore`] |
//! | [`CompletionProvider`](aurora_kernel::llm::CompletionProvider) | [`backend::OpenAiBackend`] |
//! | [`AdminAuthorizer`](aurora_kernel::auth::AdminAuthorizer) | [`auth::PasswordAuthorizer`] |
//!
//! [`admission::AdmissionGateway`] runs the filter pipeline in front of any
//! axum router; [`server::GatewayServer`] wires it to the `/api` handlers
//! and the static pages.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use aurora_gateway::server::{GatewayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let config = ServerConfig {
//!         session_secret: std::env::var("AURORA_SESSION_SECRET").ok(),
//!         ..Default::default()
//!     };
//!     GatewayServer::from_config(config).await?.start().await?;
//!     Ok(())
//! }
//! ```

pub mod admission;
pub mod auth;
pub mod backend;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod personality;
pub mod rate_limit;
pub mod server;
pub mod session;
pub mod state;
pub mod store;

// Re-export the kernel gateway types for convenience.
pub use aurora_kernel::gateway;
