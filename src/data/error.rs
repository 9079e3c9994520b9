use thiserror::Error;

/// Errors raised by the data layer (opening, decoding and slicing datasets).
#[derive(Debug, Error)]
pub enum DataError {
    /// Every candidate URL in the fallback list failed.
    #[error("could not open dataset at {url}: {}", attempts.join("; "))]
    Open { url: String, attempts: Vec<String> },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("CSV decoding failed: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed server response.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("variable '{0}' not found in dataset")]
    MissingVariable(String),

    #[error("coordinate '{0}' not found in dataset")]
    MissingCoordinate(String),

    #[error("variable '{variable}' has unexpected dimension '{dimension}' of length {len}")]
    UnexpectedDimension {
        variable: String,
        dimension: String,
        len: usize,
    },

    #[error("dataset has no time steps")]
    EmptyTimeAxis,

    #[error("expected {expected} values but received {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

pub type DataResult<T> = Result<T, DataError>;
