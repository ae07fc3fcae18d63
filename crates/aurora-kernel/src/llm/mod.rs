//! Text-completion capability consumed by the AI route handlers.

pub mod provider;
pub mod types;

pub use provider::{CompletionProvider, TokenStream};
pub use types::{ChatMessage, CompletionRequest, ProviderError, Role};
