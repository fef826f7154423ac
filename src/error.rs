// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// A single row could not be turned into a typed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("row {row}: expected {expected} fields, got {actual}")]
    FieldCount {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("row {row}: date {value:?} is not YYYYMMDD")]
    Date { row: usize, value: String },
}

impl DecodeError {
    /// Physical row index the error refers to.
    pub fn row(&self) -> usize {
        match self {
            DecodeError::FieldCount { row, .. } | DecodeError::Date { row, .. } => *row,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Connection, timeout or body read failure.
    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned {status}")]
    Status { url: String, status: u16 },

    /// The catalog page was fetched but no known layout matched it.
    #[error("no catalog content recognized in page {url}; the page layout may have changed")]
    CatalogLayout { url: String },

    #[error("catalog has no entries")]
    EmptyCatalog,

    #[error("zip container could not be read: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An archive, dbf or decode failure tagged with the archive it came from.
    #[error("{url}: {source}")]
    Payload {
        url: String,
        #[source]
        source: Box<Error>,
    },

    #[error("archive from {url} has no PIndx/NPIndx dbf member")]
    MemberNotFound { url: String },

    #[error("malformed dbf table: {0}")]
    Dbf(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration: {0}")]
    Config(String),
}

impl Error {
    /// Attach the archive URL to a failure in reading what it held.
    /// Transport and other errors already carry their own context.
    pub(crate) fn in_payload(self, url: &str) -> Self {
        match self {
            Error::Archive(_) | Error::Dbf(_) | Error::Decode(_) => Error::Payload {
                url: url.to_string(),
                source: Box::new(self),
            },
            other => other,
        }
    }

    /// The underlying error with any archive URL stripped.
    pub fn cause(&self) -> &Error {
        match self {
            Error::Payload { source, .. } => source.cause(),
            other => other,
        }
    }
}
