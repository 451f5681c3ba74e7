use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    /// No curated annotation source exists for the domain.
    #[error("No curated annotation data for domain {domain} (expected {path:?})")]
    MissingDomainData { domain: String, path: PathBuf },

    /// Match-column counts disagree across the rows of one alignment.
    #[error("Alignment inconsistency in {domain} for {sequence}: {message}")]
    AlignmentInconsistency { domain: String, sequence: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error: {field} - {message}")]
    ConfigurationError { field: String, message: String },
}

impl TransferError {
    /// Whether this error only degrades a unit instead of failing it.
    pub fn is_degrading(&self) -> bool {
        matches!(self, TransferError::MissingDomainData { .. })
    }
}

pub type TransferResult<T> = Result<T, TransferError>;

/// Extension trait for Result to add context
pub trait TransferResultExt<T> {
    /// Add context to an error
    fn with_context<F>(self, f: F) -> TransferResult<T>
    where
        F: FnOnce() -> String;

    /// Add context with a field name
    fn with_field_context(self, field: &str, message: &str) -> TransferResult<T>;
}

impl<T, E> TransferResultExt<T> for Result<T, E>
where
    E: Into<TransferError>,
{
    fn with_context<F>(self, f: F) -> TransferResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let context = f();
            match e.into() {
                // Keep the taxonomy variants intact so callers can still match on them
                err @ (TransferError::MissingDomainData { .. }
                | TransferError::AlignmentInconsistency { .. }) => err,
                TransferError::ValidationError { message } => {
                    TransferError::ValidationError { message: format!("{}: {}", context, message) }
                }
                TransferError::Parse(message) => {
                    TransferError::Parse(format!("{}: {}", context, message))
                }
                other => {
                    TransferError::ValidationError { message: format!("{}: {}", context, other) }
                }
            }
        })
    }

    fn with_field_context(self, field: &str, message: &str) -> TransferResult<T> {
        self.map_err(|e| TransferError::ConfigurationError {
            field: field.to_string(),
            message: format!("{}: {}", message, e.into()),
        })
    }
}
