use crate::record::RecordId;
use thiserror::Error;

/// Failure talking to the spreadsheet service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {operation}: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },

    #[error("file not found: {id}")]
    NotFound { id: String },
}

/// The record does not follow the configured layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("layout mismatch in {record}: no value for {}", missing.join(", "))]
    LayoutMismatch { record: RecordId, missing: Vec<String> },
}

/// Translation table failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate signature {key:?}: already named {existing:?}, refusing {attempted:?}")]
    DuplicateSignature {
        key: String,
        existing: String,
        attempted: String,
    },

    #[error("translation table I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("translation table format error: {0}")]
    Csv(#[from] csv::Error),

    #[error("translation table already exists: {0}")]
    AlreadyExists(String),

    #[error("translation spreadsheet error: {0}")]
    Service(#[from] ServiceError),
}

/// Per-record failure. The batch reports it and moves on.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Layout(#[from] ExtractError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Failure that ends the whole run
#[derive(Debug, Error)]
pub enum OrganizerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("reply does not match the pending request")]
    UnexpectedReply,
}
