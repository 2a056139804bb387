use thiserror::Error;

/// Errors raised by the similarity core and its record loader.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Similarity thresholds must lie in `[0.0, 1.0]`.
    #[error("Threshold must be between 0.0 and 1.0, got {0}")]
    InvalidThreshold(f64),

    /// A JSON-lines input record could not be parsed.
    #[error("Invalid question record on line {line}: {message}")]
    InvalidRecord { line: usize, message: String },
}
