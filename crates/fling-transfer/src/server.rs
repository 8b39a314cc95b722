/// Serial receive loop.
///
/// Connections are served one at a time: the next one is accepted only after
/// the current transfer has finished or failed. A failed session is logged
/// and never stops the loop.

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::{Result, TransferError};
use crate::logging::{TransferEvent, emit};
use crate::net::{TransportConfig, accept};
use crate::receiver::{ReceiveResult, ReceiverConfig, receive_file};

/// Pause after a failed `accept`, e.g. when out of file descriptors.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept one connection and receive a single file from it. The connection is
/// closed on return.
pub fn serve_one(
    listener: &TcpListener,
    config: &ReceiverConfig,
    transport: &TransportConfig,
) -> Result<ReceiveResult> {
    let (mut stream, peer) = accept(listener, transport)?;
    emit(
        &config.logger,
        "receiver",
        TransferEvent::ConnectionAccepted { peer },
    );
    receive_file(&mut stream, config, None)
}

/// Run the receive loop until the process is killed.
pub fn run_server(listener: &TcpListener, config: &ReceiverConfig, transport: &TransportConfig) {
    loop {
        match serve_one(listener, config, transport) {
            Ok(result) => {
                info!(
                    "File {} received successfully ({} bytes)",
                    result.name,
                    result.total_bytes
                );
            }
            Err(e) => {
                if let Some(pause) = backoff_after(&e) {
                    error!("Connection failed: {}", e);
                    thread::sleep(pause);
                } else {
                    warn!("Transfer failed: {}", e);
                }
            }
        }
    }
}

/// Only listener-level failures wait before the next `accept`; a bad peer
/// does not delay the next one.
fn backoff_after(err: &TransferError) -> Option<Duration> {
    match err {
        TransferError::Connection { .. } => Some(ACCEPT_BACKOFF),
        _ => None,
    }
}
