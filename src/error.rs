//! Error types for Session Lens

use thiserror::Error;

/// Errors that can occur while analyzing a recorded session
///
/// Individual malformed events never surface here; they are skipped by the
/// schema adapter. These variants cover whole-input failures and the single
/// "nothing to analyze" condition callers must handle explicitly.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Failed to parse session recording: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("No meaningful interactions found in session ({event_count} events)")]
    NoMeaningfulInteractions { event_count: usize },

    #[error("Invalid analyzer configuration: {0}")]
    ConfigError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
