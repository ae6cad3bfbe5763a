use thiserror::Error;

use crate::definitions::DefinitionCategory;

// Enum for handling library-level errors.
#[derive(Debug, Error)]
pub enum GearError {
    #[error("No {category} definition matches '{key}'")]
    DefinitionNotFound {
        category: DefinitionCategory,
        key: String,
    }, // Neither the GUID nor the name lookup found a record.

    #[error("Malformed definition file {file}: {source}")]
    DefinitionData {
        file: String,
        source: serde_json::Error,
    }, // A data file exists but does not match the expected shape.

    #[error("Missing definition file: {0}")]
    MissingDataFile(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error), // Errors related to save data serialization.

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error), // Input/output errors.

    #[error("Stale or unknown {0} handle")]
    InvalidHandle(&'static str), // The entity behind a handle was removed.

    #[error("{name} can only be added {limit} time(s) to a drug")]
    ComponentLimit { name: String, limit: u32 },

    #[error("A drug can only have one foundation")]
    DuplicateFoundation,

    #[error("Logger error: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error("Logger already set")]
    LoggerAlreadySet,

    #[error("Could not find the home directory")]
    NoHomeDirectory,

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<tokio::task::JoinError> for GearError {
    fn from(err: tokio::task::JoinError) -> Self {
        GearError::Runtime(err.to_string())
    }
}

// Errors raised while parsing or evaluating a rule expression.
// The rules pipeline swallows these and yields 0.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Empty expression")]
    Empty,

    #[error("Could not parse expression '{input}' near '{remaining}'")]
    Syntax { input: String, remaining: String },

    #[error("Wrong number of arguments for {name}: expected {expected}, got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Expression '{0}' did not produce a finite number")]
    NotFinite(String),
}
