use thiserror::Error;

/// Structural input failures. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("{context} has no header row")]
    EmptyFile { context: String },

    #[error("{context} is missing required column '{column}'")]
    MissingColumn { context: String, column: String },
}

impl IngestError {
    /// `true` for a required source that is missing or not the expected
    /// shape, as opposed to one that exists but could not be read.
    #[must_use]
    pub fn is_input_format(&self) -> bool {
        matches!(
            self,
            IngestError::FileNotFound { .. }
                | IngestError::Csv { .. }
                | IngestError::EmptyFile { .. }
                | IngestError::MissingColumn { .. }
        )
    }
}

/// A single field that could not be coerced. Recovered by the caller, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {field} from '{value}': {reason}")]
pub struct ParseError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
