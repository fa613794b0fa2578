use std::path::PathBuf;

use thiserror::Error;

use crate::models::EntityKind;

/// A page could not be fetched. Transport errors, timeouts and non-2xx
/// statuses all collapse into this one signal.
#[derive(Debug, Error)]
#[error("failed to fetch {path}: {cause}")]
pub struct FetchError {
    pub path: String,
    pub cause: FetchCause,
}

#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("request timed out")]
    Timeout,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    #[must_use]
    pub fn new(path: &str, cause: FetchCause) -> Self {
        Self {
            path: path.to_owned(),
            cause,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid {field} selector {selector:?} for {kind}: {reason}")]
    Selector {
        kind: EntityKind,
        field: &'static str,
        selector: &'static str,
        reason: String,
    },

    #[error("{kind} entry #{index} is missing required field {field:?}")]
    MissingField {
        kind: EntityKind,
        index: usize,
        field: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has columns {found:?}, expected {expected:?}")]
    Header {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
