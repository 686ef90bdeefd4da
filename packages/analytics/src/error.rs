use thiserror::Error;

/// Errors raised by the analysis pipeline itself.
///
/// A degenerate fit (zero-variance pre-period) is not represented here: it
/// yields a valid, annotated result with a zero-width interval instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// Malformed or out-of-order request parameters. Never retried.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Pre-intervention window too short, or the observed series has gaps.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

/// Errors raised by an observed-series collaborator, kept distinct from the
/// core taxonomy so callers can message "couldn't load data" separately from
/// "your input parameters are invalid".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("unknown dealer {0}")]
    UnknownDealer(i64),

    #[error("failed to load observed series: {0}")]
    Fetch(String),
}
