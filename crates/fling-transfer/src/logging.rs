/// Structured transfer events.
///
/// The sender and receiver report lifecycle events through a
/// [`TransferLogger`] so the binary can route them to `tracing` and tests can
/// collect or discard them.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Structured log entry for a transfer operation.
#[derive(Debug, Clone)]
pub struct TransferLog {
    pub component: &'static str,
    pub event: TransferEvent,
}

/// Transfer events that can be logged.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    /// Receiver: a peer connected
    ConnectionAccepted {
        peer: SocketAddr,
    },
    /// Sender: header written to the peer
    HeaderSent {
        name: String,
        size: u64,
    },
    /// Receiver: header decoded and name sanitized
    HeaderAccepted {
        name: String,
        size: u64,
    },
    /// Transfer complete
    TransferComplete {
        name: String,
        total_bytes: u64,
        duration_ms: u64,
    },
    /// Receiver: partial output deleted after a failure
    PartialRemoved {
        path: PathBuf,
    },
    /// Error occurred
    Error {
        message: String,
    },
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionAccepted { peer } => {
                write!(f, "Accepted connection from client of {}", peer)
            }
            Self::HeaderSent { name, size } => {
                write!(f, "Sending file: name {}, size {}", name, size)
            }
            Self::HeaderAccepted { name, size } => {
                write!(f, "Accepting file: name {}, size {}...", name, size)
            }
            Self::TransferComplete { name, total_bytes, duration_ms } => {
                write!(f, "File {} transferred: {} bytes in {} ms", name, total_bytes, duration_ms)
            }
            Self::PartialRemoved { path } => {
                write!(f, "Removed partial file {}", path.display())
            }
            Self::Error { message } => {
                write!(f, "error: {}", message)
            }
        }
    }
}

/// Trait for transfer logging. Implementations can write to tracing, collect
/// entries, or discard them.
pub trait TransferLogger: Send + Sync {
    fn log(&self, entry: TransferLog);
}

/// Logger that uses the `tracing` crate.
pub struct TracingLogger;

impl TransferLogger for TracingLogger {
    fn log(&self, entry: TransferLog) {
        match &entry.event {
            TransferEvent::Error { .. } => {
                tracing::warn!(component = entry.component, "{}", entry.event);
            }
            TransferEvent::HeaderSent { .. } => {
                tracing::debug!(component = entry.component, "{}", entry.event);
            }
            _ => {
                tracing::info!(component = entry.component, "{}", entry.event);
            }
        }
    }
}

/// No-op logger that discards all log entries.
pub struct NullLogger;

impl TransferLogger for NullLogger {
    fn log(&self, _entry: TransferLog) {}
}

/// Forward `event` to `logger` when one is configured.
pub(crate) fn emit(
    logger: &Option<Arc<dyn TransferLogger>>,
    component: &'static str,
    event: TransferEvent,
) {
    if let Some(logger) = logger {
        logger.log(TransferLog { component, event });
    }
}
