//! Error types for fretscope-analysis.

use thiserror::Error;

/// Error type for analysis-engine operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] fretscope_core::Error),

    #[error("Analyzers must be registered before the engine starts")]
    RegisterWhileRunning,
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
