//! `aurora-kernel` - contracts of the Aurora personality-test service.
//!
//! Trait interfaces, data types and configuration validation for the request
//! admission layer, plus the collaborator contracts the route handlers
//! consume (keyed JSON storage, text completion, admin authorization).
//! Concrete implementations live in `aurora-gateway`.

// admin authorization predicate
pub mod auth;

// configuration file loading
#[cfg(feature = "config")]
pub mod config;

// error module
pub mod error;

// admission gateway contracts
pub mod gateway;

// text completion capability
pub mod llm;

// keyed JSON storage
pub mod storage;

pub use error::{KernelError, KernelResult};
