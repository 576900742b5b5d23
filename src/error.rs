use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Rejections raised by `submit` before any request is issued.
///
/// Neither variant changes the session status.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Please select a file first.")]
    NoFileSelected,

    #[error("An analysis is already in progress.")]
    AlreadyInFlight,
}

/// Failures of a single request to the analysis service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Unable to reach the analysis service: {0}")]
    Transport(String),

    #[error("Analysis service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Unexpected response from the analysis service: {0}")]
    MalformedResponse(String),
}

impl AnalysisError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Service { .. } => "service",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

#[derive(Error, Debug)]
pub enum FileError {
    #[error("Unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error("Unable to write preferences: {0}")]
    Io(#[from] io::Error),

    #[error("Unable to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid analysis service URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid {key} value '{value}': expected a positive integer")]
    InvalidNumber { key: &'static str, value: String },

    #[error("Unable to resolve a data directory; set CHEMVIZ_DATA_DIR")]
    NoDataDir,
}
