use lss_schemas::instruction::InstructionStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LssError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Unknown {kind} '{code}'")]
    UnknownEntity { kind: &'static str, code: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Instruction '{id}' cannot move from {from:?} to {to:?}")]
    BadTransition {
        id: String,
        from: InstructionStatus,
        to: InstructionStatus,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to process CSV file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),

    // Correctly handle different error types from external crates
    #[error("Failed to parse JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),
}
