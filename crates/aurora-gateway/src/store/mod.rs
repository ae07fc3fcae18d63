//! [`JsonStore`](aurora_kernel::storage::JsonStore) implementations.

mod file;
mod memory;

pub use file::FileJsonStore;
pub use memory::InMemoryJsonStore;

/// Static question bank (optionally suffixed `-{locale}`).
pub const KEY_QUESTIONS: &str = "questions";
/// Array of computed results.
pub const KEY_RESULTS: &str = "results";
/// Usage counters.
pub const KEY_STATS: &str = "stats";
/// Persisted AI settings, without the API key.
pub const KEY_AI_CONFIG: &str = "ai-config";
