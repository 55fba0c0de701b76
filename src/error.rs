//! Fatal error taxonomy returned by the Analysis Coordinator.
//!
//! Scoped-down relative to the teacher's `GuardianError`: this domain only
//! ever needs the four kinds below, so each is a struct variant carrying a
//! short user-facing `message` and a machine-readable `hint`.

use thiserror::Error;

use crate::model::CanonicalReport;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{message}")]
    Validation { message: String, hint: Option<String> },

    #[error("{message}")]
    SourceUnavailable { message: String, hint: Option<String> },

    #[error("{message}")]
    DeadlineExceeded {
        message: String,
        hint: Option<String>,
        partial: Option<Box<CanonicalReport>>,
    },

    #[error("{message}")]
    Internal { message: String, hint: Option<String> },
}

impl AnalysisError {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Validation { .. } => "validation_error",
            AnalysisError::SourceUnavailable { .. } => "source_unavailable",
            AnalysisError::DeadlineExceeded { .. } => "deadline_exceeded",
            AnalysisError::Internal { .. } => "internal_error",
        }
    }

    /// Exit code per the CLI surface: 0 success, 2 validation, 3 source
    /// unavailable, 4 deadline exceeded. Internal errors exit 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            AnalysisError::Validation { .. } => 2,
            AnalysisError::SourceUnavailable { .. } => 3,
            AnalysisError::DeadlineExceeded { .. } => 4,
            AnalysisError::Internal { .. } => 1,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AnalysisError::Validation { message: message.into(), hint: None }
    }

    pub fn validation_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        AnalysisError::Validation { message: message.into(), hint: Some(hint.into()) }
    }

    pub fn source_unavailable(message: impl Into<String>, hint: impl Into<String>) -> Self {
        AnalysisError::SourceUnavailable { message: message.into(), hint: Some(hint.into()) }
    }

    pub fn deadline_exceeded(partial: Option<CanonicalReport>) -> Self {
        AnalysisError::DeadlineExceeded {
            message: "analysis deadline exceeded".to_string(),
            hint: None,
            partial: partial.map(Box::new),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AnalysisError::Internal { message: message.into(), hint: None }
    }
}
