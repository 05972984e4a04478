//! Error types for scrollback.
//!
//! [`QueryError`] is what a [`crate::HistoryBackend`] reports for a single
//! query; [`HistoryError`] is what the history engine surfaces to callers and
//! handlers.

use std::{fmt, io};
use std::time::Duration;

use crate::cursor::Cursor;
use crate::message::ConversionError;

// ─── QueryError ───────────────────────────────────────────────────────────────

/// A failed history query, as reported by the backend.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryError {
    /// The server answered with a non-success status code.
    Status(u16),
    /// Network / I/O failure.
    Io(String),
    /// The response could not be decoded.
    Deserialize(String),
    /// The request was dropped (e.g. the connection went away mid-query).
    Dropped,
}

impl QueryError {
    /// Status returned when a message id is addressed with the wrong
    /// "sent by me" flag.
    pub const NOT_FOUND: u16 = 404;

    /// `true` if this is the "not found" class, which the server also uses
    /// when the anchor's ownership flag is wrong.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status(Self::NOT_FOUND))
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code)   => write!(f, "server responded with {code}"),
            Self::Io(e)          => write!(f, "I/O error: {e}"),
            Self::Deserialize(s) => write!(f, "deserialize error: {s}"),
            Self::Dropped        => write!(f, "query dropped"),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<io::Error> for QueryError {
    fn from(e: io::Error) -> Self { Self::Io(e.to_string()) }
}

// ─── HistoryError ─────────────────────────────────────────────────────────────

/// The error type returned from (or dispatched by) every history operation.
#[derive(Clone, Debug, PartialEq)]
pub enum HistoryError {
    /// Generic transport / protocol failure of a query.
    Query(QueryError),
    /// The anchor message was addressed with the wrong ownership guess.
    AmbiguousOwnership {
        message_id:  String,
        owner_guess: bool,
    },
    /// The first page of a backfill did not complete in time.
    Timeout(Duration),
    /// A record could not be turned into a [`crate::TypedMessage`].
    Conversion(ConversionError),
    /// The located message carries nothing that can be downloaded.
    NotDownloadable,
    /// The message id could not be resolved under either ownership flag.
    NotFound {
        message_id: String,
        cause:      Option<QueryError>,
    },
    /// The media fetch itself failed.
    Download(QueryError),
}

impl HistoryError {
    /// Classify a query failure against the cursor it was issued with.
    ///
    /// A "not found" answer for a non-empty anchor is reported as
    /// [`HistoryError::AmbiguousOwnership`]; everything else is a plain
    /// [`HistoryError::Query`].
    pub fn from_query(err: QueryError, cursor: &Cursor) -> Self {
        if err.is_not_found() && !cursor.anchor_id.is_empty() {
            Self::AmbiguousOwnership {
                message_id:  cursor.anchor_id.clone(),
                owner_guess: cursor.anchor_is_own,
            }
        } else {
            Self::Query(err)
        }
    }
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(e) => write!(f, "query failed: {e}"),
            Self::AmbiguousOwnership { message_id, owner_guess } => {
                write!(f, "message {message_id} not found with own-message flag {owner_guess}")
            }
            Self::Timeout(d)    => write!(f, "timed out after {d:?} waiting for the first page"),
            Self::Conversion(e) => write!(f, "{e}"),
            Self::NotDownloadable => write!(f, "message has no downloadable media"),
            Self::NotFound { message_id, cause: Some(e) } => {
                write!(f, "message {message_id} not found ({e})")
            }
            Self::NotFound { message_id, cause: None } => write!(f, "message {message_id} not found"),
            Self::Download(e) => write!(f, "media download failed: {e}"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Query(e) | Self::Download(e) => Some(e),
            Self::NotFound { cause: Some(e), .. } => Some(e),
            Self::Conversion(e) => Some(e),
            _ => None,
        }
    }
}

impl From<QueryError> for HistoryError {
    fn from(e: QueryError) -> Self { Self::Query(e) }
}

impl From<ConversionError> for HistoryError {
    fn from(e: ConversionError) -> Self { Self::Conversion(e) }
}
