use thiserror::Error;

/// Structural failures that abort a run. Numerical degeneracy in a single
/// pair or parameter combination is never an error; those units are skipped.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("malformed price table: {0}")]
    MalformedTable(String),

    #[error("failed to parse price data at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("failed to read price file: {0}")]
    Io(#[from] std::io::Error),
}
