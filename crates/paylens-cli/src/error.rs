use paylens_core::{EnvelopeError, PipelineError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Pipeline(error) => pipeline_exit_code(error.code()),
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

/// Exit code for an envelope that carries errors. The first error decides.
pub fn envelope_exit_code(errors: &[EnvelopeError]) -> u8 {
    errors
        .first()
        .map(|error| pipeline_exit_code(error.code.as_str()))
        .unwrap_or(0)
}

const fn pipeline_exit_code(code: &str) -> u8 {
    if matches!(code.as_bytes(), b"store_unavailable") {
        3
    } else {
        2
    }
}
