/// Chunked copy between a local file and the peer stream.
///
/// ```text
/// send:    [File] --read chunk--> buf --write_all--> [Peer]    until EOF
/// receive: [Peer] --read chunk--> buf --write_all--> [File]    until declared size
/// ```
///
/// One algorithm serves both directions; [`CopyMode`] says which end is the
/// peer and what ends the copy.

use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{Result, TransferError};
use crate::progress::ProgressObserver;

/// Direction and stop condition of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// File → peer. Stream until the file is exhausted; the total only feeds
    /// the observer.
    UntilEof,
    /// Peer → file. Consume exactly the declared total, never more. A peer
    /// that closes early truncates the transfer.
    Exact,
}

/// Copy `source` into `destination` in chunks of at most `chunk_size` bytes.
///
/// `local_path` names the file end of the copy for error reporting. Returns
/// the number of bytes copied.
pub fn copy_chunks<R, W>(
    source: &mut R,
    destination: &mut W,
    total: u64,
    chunk_size: usize,
    mode: CopyMode,
    local_path: &Path,
    mut observer: Option<&mut dyn ProgressObserver>,
) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut copied: u64 = 0;

    loop {
        let want = match mode {
            CopyMode::UntilEof => buf.len(),
            CopyMode::Exact => {
                let left = total - copied;
                if left == 0 {
                    break;
                }
                buf.len().min(usize::try_from(left).unwrap_or(usize::MAX))
            }
        };

        let n = match source.read(&mut buf[..want]) {
            Ok(0) => match mode {
                CopyMode::UntilEof => break,
                CopyMode::Exact => {
                    return Err(TransferError::TruncatedTransfer {
                        expected: total,
                        received: copied,
                        source: None,
                    });
                }
            },
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(mode, e, total, copied, local_path)),
        };

        destination
            .write_all(&buf[..n])
            .map_err(|e| write_error(mode, e, total, copied, local_path))?;
        copied += n as u64;

        if let Some(obs) = observer.as_deref_mut() {
            obs.on_progress(copied, total);
        }
    }

    destination
        .flush()
        .map_err(|e| write_error(mode, e, total, copied, local_path))?;
    Ok(copied)
}

fn read_error(mode: CopyMode, e: io::Error, total: u64, copied: u64, local_path: &Path) -> TransferError {
    match mode {
        CopyMode::UntilEof => TransferError::local("read", local_path, e),
        CopyMode::Exact => TransferError::TruncatedTransfer {
            expected: total,
            received: copied,
            source: Some(e),
        },
    }
}

fn write_error(mode: CopyMode, e: io::Error, total: u64, copied: u64, local_path: &Path) -> TransferError {
    match mode {
        CopyMode::UntilEof => TransferError::TruncatedTransfer {
            expected: total,
            received: copied,
            source: Some(e),
        },
        CopyMode::Exact => TransferError::local("write", local_path, e),
    }
}
