/// Receiving side of a transfer.
///
/// ```text
/// [Peer] --> header (264 B) --> sanitize name --> create <dir>/<name>
///        --> exactly `size` bytes in 256 KB reads --> [File] --> sync
/// ```
///
/// The declared size is authoritative. Bytes past it are never read; a peer
/// that closes before it truncates the transfer. Used by the server loop for
/// every accepted connection.

use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::copier::{CopyMode, copy_chunks};
use crate::error::{Result, TransferError};
use crate::logging::{NullLogger, TracingLogger, TransferEvent, TransferLogger, emit};
use crate::progress::ProgressObserver;
use crate::protocol::{CHUNK_SIZE, FileHeader, read_header};
use crate::sanitize::{is_usable, sanitize};
use crate::session::TransferSession;

const COMPONENT: &str = "receiver";

/// Configuration for the receiver.
#[derive(Clone)]
pub struct ReceiverConfig {
    /// Directory incoming files are written to.
    pub output_dir: PathBuf,
    pub chunk_size: usize,
    /// Delete the partially written file when a transfer fails. Off by
    /// default: partial output is left on disk as-is.
    pub remove_partial: bool,
    pub logger: Option<Arc<dyn TransferLogger>>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            chunk_size: CHUNK_SIZE,
            remove_partial: false,
            logger: Some(Arc::new(TracingLogger)),
        }
    }
}

impl ReceiverConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Config that reports nothing.
    pub fn quiet(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            logger: Some(Arc::new(NullLogger)),
            ..Self::new(output_dir)
        }
    }
}

/// Result of a completed receive.
#[derive(Debug, Clone)]
pub struct ReceiveResult {
    /// Sanitized name the file was stored under.
    pub name: String,
    pub path: PathBuf,
    pub total_bytes: u64,
    pub elapsed: Duration,
    pub throughput_bps: u64,
}

/// Receive one file from `stream`. Blocks until the declared size has been
/// written or the transfer fails. No file is created when the header is
/// malformed.
pub fn receive_file<R: Read + ?Sized>(
    stream: &mut R,
    config: &ReceiverConfig,
    observer: Option<&mut dyn ProgressObserver>,
) -> Result<ReceiveResult> {
    let mut session = TransferSession::receiver();

    let header = match accept_header(stream, config) {
        Ok(h) => h,
        Err(e) => {
            session.fail();
            report_error(config, &e);
            return Err(e);
        }
    };
    session.header_received(header.size);

    let path = config.output_dir.join(&header.name);
    let mut file = match create_output(&path) {
        Ok(f) => f,
        Err(e) => {
            session.fail();
            report_error(config, &e);
            return Err(e);
        }
    };

    session.streaming();
    let copied = {
        let mut tracked = session.observe(observer);
        copy_chunks(
            stream,
            &mut file,
            header.size,
            config.chunk_size,
            CopyMode::Exact,
            &path,
            Some(&mut tracked),
        )
        .and_then(|n| {
            file.sync_all()
                .map_err(|e| TransferError::local("sync", &path, e))?;
            Ok(n)
        })
    };

    match copied {
        Ok(total_bytes) => {
            session.done(total_bytes);
            let elapsed = session.elapsed();
            emit(
                &config.logger,
                COMPONENT,
                TransferEvent::TransferComplete {
                    name: header.name.clone(),
                    total_bytes,
                    duration_ms: elapsed.as_millis() as u64,
                },
            );
            Ok(ReceiveResult {
                name: header.name,
                path,
                total_bytes,
                elapsed,
                throughput_bps: session.throughput_bps(),
            })
        }
        Err(e) => {
            session.fail();
            drop(file);
            report_error(config, &e);
            if config.remove_partial {
                remove_partial(&path, config);
            }
            Err(e)
        }
    }
}

/// Read and decode the header, then replace the peer's name with its
/// sanitized form.
fn accept_header<R: Read + ?Sized>(stream: &mut R, config: &ReceiverConfig) -> Result<FileHeader> {
    let raw = read_header(stream)?;
    let name = sanitize(&raw.name);
    if !is_usable(&name) {
        return Err(TransferError::malformed(format!(
            "unusable file name {:?}",
            raw.name
        )));
    }
    if name != raw.name {
        tracing::warn!(raw = %raw.name, sanitized = %name, "stripped path from file name");
    }
    emit(
        &config.logger,
        COMPONENT,
        TransferEvent::HeaderAccepted {
            name: name.clone(),
            size: raw.size,
        },
    );
    Ok(FileHeader::new(name, raw.size))
}

/// Create or truncate the output file with standard permissions (0644).
fn create_output(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options
        .open(path)
        .map_err(|e| TransferError::local("create", path, e))
}

fn remove_partial(path: &Path, config: &ReceiverConfig) {
    match fs::remove_file(path) {
        Ok(()) => emit(
            &config.logger,
            COMPONENT,
            TransferEvent::PartialRemoved {
                path: path.to_path_buf(),
            },
        ),
        Err(e) => tracing::warn!("Cannot remove partial file {}: {}", path.display(), e),
    }
}

fn report_error(config: &ReceiverConfig, e: &TransferError) {
    emit(
        &config.logger,
        COMPONENT,
        TransferEvent::Error {
            message: e.to_string(),
        },
    );
}
