/// Error types for a single transfer session.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Every failure is terminal for the session that raised it. Nothing is retried.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Resolve, connect, bind, listen or accept failed.
    #[error("connection error ({context}): {source}")]
    Connection {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The fixed-size header was short, unreadable or carries an unusable name.
    #[error("malformed header: {reason}")]
    MalformedHeader {
        reason: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Open, stat, create, read or write failed on the local filesystem.
    #[error("{context} {}: {source}", .path.display())]
    LocalIo {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The peer closed or errored before the declared byte count was reached,
    /// in either direction.
    #[error("transfer truncated: received {received} of {expected} bytes")]
    TruncatedTransfer {
        expected: u64,
        received: u64,
        #[source]
        source: Option<io::Error>,
    },

    /// The input path is not a regular file.
    #[error("{} is not a regular file", .path.display())]
    UnsupportedSource { path: PathBuf },
}

impl TransferError {
    pub(crate) fn connection(context: impl Into<String>, source: io::Error) -> Self {
        Self::Connection {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn malformed_io(reason: impl Into<String>, source: io::Error) -> Self {
        Self::MalformedHeader {
            reason: reason.into(),
            source: Some(source),
        }
    }

    pub(crate) fn local(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LocalIo {
            context,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = TransferError> = std::result::Result<T, E>;
