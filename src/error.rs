//! Error types for the ingestion pipeline

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Pipeline error type
#[derive(Error, Debug)]
pub enum Error {
    /// Submission is missing required fields or is not a JSON object
    #[error("{0}")]
    Validation(String),

    /// The external analyzer could not produce a record
    #[error("External analyzer failed: {0}")]
    ExternalAnalyzer(#[from] AnalyzerError),

    /// The backing store file could not be read, parsed or written
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Search term rejected before touching the store
    #[error("{0}")]
    InvalidQuery(String),

    #[error("{0}")]
    NotFound(String),

    /// An append would overwrite an existing record
    #[error("Experience {0} already exists")]
    DuplicateId(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why one run of the external analyzer did not yield a record
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("NLP processing is disabled")]
    Disabled,

    #[error("NLP script not found at {}", .0.display())]
    ScriptMissing(PathBuf),

    #[error("Failed to start analyzer process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("NLP processing failed with code {}: {stderr}", exit_label(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("NLP processing timed out after {0:?}")]
    Timeout(Duration),

    #[error("Output file not created")]
    OutputMissing,

    #[error("Failed to parse analyzer output: {0}")]
    OutputMalformed(#[source] serde_json::Error),

    #[error("No processed experience returned")]
    EmptyResult,

    #[error("Failed to encode submission: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
