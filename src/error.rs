//! Error categories raised by the engine.

use thiserror::Error;

/// Typed root causes carried inside [`anyhow::Error`] chains.
///
/// Recover the category with `err.root_cause().downcast_ref::<EngineError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A configured value violates its allowed range. Raised before any tick runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Grid and population disagree about where an agent is. Indicates an engine bug.
    #[error("consistency error: {0}")]
    Consistency(String),
}
