use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error kind that represents failures reported by the [`crate::Client`].
///
/// The numeric value of each kind is attached to log records as the `event_id` key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server URL was not configured.
    MissingUrl = 1000,
    /// The configured server URL could not be parsed.
    InvalidUrl = 1001,
    /// The application name was not configured.
    MissingAppName = 1002,
    /// The configured refresh interval is zero.
    InvalidRefreshInterval = 1003,
    /// Initialization of the internal [`reqwest::Client`] failed.
    HttpClientInitFailure = 1004,
    /// The server rejected the request (401 Unauthorized, 403 Forbidden or 404 Not Found).
    Unauthorized = 1100,
    /// Invalid HTTP response was received (unexpected HTTP status code).
    UnexpectedHttpResponse = 1101,
    /// The HTTP request timed out.
    HttpRequestTimeout = 1102,
    /// The HTTP request failed (most likely, due to a local network issue).
    HttpRequestFailure = 1103,
    /// An invalid HTTP response was received (200 OK with an invalid content).
    InvalidHttpResponseContent = 1104,
    /// The backup could not be read or its content was invalid.
    BackupReadFailure = 2000,
    /// The backup could not be written.
    BackupWriteFailure = 2001,
    /// A feature references a strategy that is not registered in the client.
    UnknownStrategy = 3000,
    /// The evaluated feature was not found in the current feature set.
    FeatureNotFound = 3001,
    /// The client did not become ready in the given time.
    ClientInitTimedOut = 4000,
    /// The operation was rejected because the client is closed.
    ClientClosed = 4001,
}

impl ErrorKind {
    pub(crate) fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Returns `true` for the kinds that can only be produced while building a [`crate::Client`].
    pub fn is_configuration(&self) -> bool {
        (*self as u16) < 1100
    }
}

/// Error struct that holds the [`ErrorKind`] and message of the reported failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientError {
    /// Error kind that represents failures reported by the [`crate::Client`].
    pub kind: ErrorKind,
    /// The text representation of the failure.
    pub message: String,
}

impl ClientError {
    pub(crate) fn new(kind: ErrorKind, message: String) -> Self {
        Self { message, kind }
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl Error for ClientError {}
