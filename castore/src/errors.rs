use cid::Cid;
use thiserror::Error;
use tokio::task::JoinError;

use crate::ContentHash;

/// Errors related to communication with the store, or to interpreting
/// what's inside of it.
/// Absence of a block is not an error; it's signalled with `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    Integrity {
        expected: ContentHash,
        actual: ContentHash,
    },

    #[error("malformed node {cid}: {reason}")]
    MalformedNode { cid: Cid, reason: String },

    #[error("internal storage error: {0}")]
    StorageError(String),
}

impl Error {
    pub(crate) fn malformed(cid: &Cid, reason: impl Into<String>) -> Self {
        Error::MalformedNode {
            cid: *cid,
            reason: reason.into(),
        }
    }
}

impl From<JoinError> for Error {
    fn from(value: JoinError) -> Self {
        Error::StorageError(value.to_string())
    }
}

impl From<sled::Error> for Error {
    fn from(value: sled::Error) -> Self {
        Error::StorageError(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        if value.kind() == std::io::ErrorKind::InvalidInput {
            Error::InvalidRequest(value.to_string())
        } else {
            Error::StorageError(value.to_string())
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::InvalidRequest(msg) => Self::new(std::io::ErrorKind::InvalidInput, msg),
            Error::Integrity { .. } | Error::MalformedNode { .. } => {
                Self::new(std::io::ErrorKind::InvalidData, value.to_string())
            }
            Error::StorageError(msg) => Self::new(std::io::ErrorKind::Other, msg),
        }
    }
}
