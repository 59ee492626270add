use thiserror::Error;

/// Errors reported by the core analyses.
///
/// All analyses are deterministic computation over validated input, so
/// nothing here is retried internally; recovery is the caller's business
/// (for the stochastic optimizer, typically re-running with another seed).
#[derive(Debug, Error)]
pub enum DsmError {
    /// A parameter is outside its documented range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The matrix or its bookkeeping is internally inconsistent.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A position argument is outside `[0, len)`.
    #[error("position {index} out of range for matrix of size {len}")]
    OutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, DsmError>;
