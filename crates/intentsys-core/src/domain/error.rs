//! Error taxonomy for the intent-to-system core.

use crate::domain::stage::Stage;
use intentsys_oracle::OracleError;

/// The caller supplied too little prior-stage state for a prompt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompilationError {
    #[error("{stage} prompt requires {field}, which was not supplied")]
    MissingInput { stage: Stage, field: &'static str },

    #[error("{stage} prompt could not encode {field}: {reason}")]
    Encoding {
        stage: Stage,
        field: &'static str,
        reason: String,
    },
}

/// Oracle output held no recoverable structured payload.
///
/// Carries the raw text so a caller can inspect or retry by hand.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not normalize {stage} response: {reason}")]
pub struct NormalizationError {
    pub stage: Stage,
    pub reason: String,
    pub raw: String,
}

impl NormalizationError {
    pub fn new(stage: Stage, reason: impl Into<String>, raw: &str) -> Self {
        NormalizationError {
            stage,
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

/// Structural defect in an architecture's module/edge references.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphIntegrityError {
    #[error("edge #{edge_index} ({from} -> {to}) references unknown module {missing}")]
    UnknownEndpoint {
        edge_index: usize,
        from: String,
        to: String,
        missing: String,
    },

    #[error("module id {id} is declared more than once")]
    DuplicateModuleId { id: String },
}

/// Any failure that halts a stage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error(transparent)]
    GraphIntegrity(#[from] GraphIntegrityError),

    #[error("{stage} already completed for this report")]
    AlreadyCompleted { stage: Stage },
}

impl StageError {
    /// Stable class name for logs and exported failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Compilation(_) => "CompilationError",
            StageError::Oracle(OracleError::Unavailable { .. }) => "OracleUnavailable",
            StageError::Oracle(OracleError::Timeout { .. }) => "OracleTimeout",
            StageError::Oracle(OracleError::Rejected { .. }) => "OracleRejected",
            StageError::Oracle(OracleError::Config(_)) => "OracleConfig",
            StageError::Normalization(_) => "NormalizationError",
            StageError::GraphIntegrity(_) => "GraphIntegrityError",
            StageError::AlreadyCompleted { .. } => "AlreadyCompleted",
        }
    }

    /// Raw oracle text, when the failure was a normalization failure.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            StageError::Normalization(e) => Some(&e.raw),
            _ => None,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, StageError>;
