use paylens_warehouse::WarehouseError;
use thiserror::Error;

/// Validation and contract errors for response envelopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,

    #[error("unknown case study '{value}'")]
    UnknownCaseStudy { value: String },
}

/// Failures of the fetch → filter → aggregate pipeline.
///
/// An empty slice is not represented here: empty views are ordinary values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("column '{column}' holds a non-numeric value at row {row}")]
    NonNumericValue { column: String, row: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl PipelineError {
    pub(crate) fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    /// Stable machine-readable code for envelopes.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::UnknownTable(_) => "unknown_table",
            Self::MissingColumn { .. } => "missing_column",
            Self::NonNumericValue { .. } => "non_numeric_value",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl From<WarehouseError> for PipelineError {
    fn from(error: WarehouseError) -> Self {
        match error {
            WarehouseError::UnknownTable(name) => Self::UnknownTable(name),
            WarehouseError::UnknownColumn { column, .. } => Self::MissingColumn { column },
            WarehouseError::StoreUnavailable(message) => Self::StoreUnavailable(message),
            WarehouseError::DuckDb(error) => Self::StoreUnavailable(error.to_string()),
        }
    }
}
