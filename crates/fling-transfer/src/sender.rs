/// Sending side of a transfer.
///
/// ```text
/// [SourceFile::open] --> header --> [Peer] --> chunks until EOF --> [Peer]
///  stat, reject           264 B                256 KB reads
///  non-regular files
/// ```

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::copier::{CopyMode, copy_chunks};
use crate::error::{Result, TransferError};
use crate::logging::{NullLogger, TracingLogger, TransferEvent, TransferLogger, emit};
use crate::progress::ProgressObserver;
use crate::protocol::{CHUNK_SIZE, FileHeader, write_header};
use crate::sanitize::sanitize;
use crate::session::TransferSession;

const COMPONENT: &str = "sender";

/// Configuration for the sender.
#[derive(Clone)]
pub struct SenderConfig {
    pub chunk_size: usize,
    pub logger: Option<Arc<dyn TransferLogger>>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            logger: Some(Arc::new(TracingLogger)),
        }
    }
}

impl SenderConfig {
    /// Config that reports nothing.
    pub fn quiet() -> Self {
        Self {
            logger: Some(Arc::new(NullLogger)),
            ..Self::default()
        }
    }
}

/// Result of a completed send.
#[derive(Debug, Clone)]
pub struct SendResult {
    pub name: String,
    pub total_bytes: u64,
    pub elapsed: Duration,
    pub throughput_bps: u64,
}

/// A local regular file opened for sending, with its header prepared.
#[derive(Debug)]
pub struct SourceFile {
    file: File,
    path: PathBuf,
    header: FileHeader,
}

impl SourceFile {
    /// Open `path` and stat it. Directories, devices and other non-regular
    /// files are rejected before any connection is made.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TransferError::local("open", path, e))?;
        let meta = file
            .metadata()
            .map_err(|e| TransferError::local("stat", path, e))?;
        if !meta.is_file() {
            return Err(TransferError::UnsupportedSource {
                path: path.to_path_buf(),
            });
        }

        // Names travel as UTF-8; invalid bytes become U+FFFD.
        let raw = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let header = FileHeader::new(sanitize(&raw), meta.len());

        Ok(Self {
            file,
            path: path.to_path_buf(),
            header,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Send the header and the whole file over `stream`. Blocks until the file is
/// exhausted or an error occurs. The file is closed on return either way.
pub fn send_file<W: Write + ?Sized>(
    source: SourceFile,
    stream: &mut W,
    config: &SenderConfig,
    observer: Option<&mut dyn ProgressObserver>,
) -> Result<SendResult> {
    let SourceFile {
        mut file,
        path,
        header,
    } = source;
    let mut session = TransferSession::sender(header.size);

    match stream_file(&mut session, &mut file, &path, &header, stream, config, observer) {
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
            Ok(SendResult {
                name: header.name,
                total_bytes,
                elapsed,
                throughput_bps: session.throughput_bps(),
            })
        }
        Err(e) => {
            session.fail();
            emit(
                &config.logger,
                COMPONENT,
                TransferEvent::Error {
                    message: format!(
                        "{} after {} of {} bytes: {}",
                        header.name,
                        session.transferred(),
                        header.size,
                        e
                    ),
                },
            );
            Err(e)
        }
    }
}

fn stream_file<W: Write + ?Sized>(
    session: &mut TransferSession,
    file: &mut File,
    path: &Path,
    header: &FileHeader,
    stream: &mut W,
    config: &SenderConfig,
    observer: Option<&mut dyn ProgressObserver>,
) -> Result<u64> {
    write_header(stream, header)?;
    session.header_sent();
    emit(
        &config.logger,
        COMPONENT,
        TransferEvent::HeaderSent {
            name: header.name.clone(),
            size: header.size,
        },
    );

    session.streaming();
    let total = header.size;
    let mut tracked = session.observe(observer);
    copy_chunks(
        file,
        stream,
        total,
        config.chunk_size,
        CopyMode::UntilEof,
        path,
        Some(&mut tracked),
    )
}
