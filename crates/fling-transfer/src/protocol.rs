/// Wire format for a single-file transfer.
///
/// ```text
/// [0..256]    File name, NUL-terminated, zero padded (255 usable bytes)
/// [256..264]  Declared payload size (u64, native byte order)
/// [264..]     Payload: exactly `size` raw bytes, no framing, no trailer
/// ```
///
/// Names are UTF-8. A local name that is not is sent with U+FFFD in place of
/// the invalid bytes, and invalid bytes from a peer are replaced the same way,
/// so such files arrive under a lossy name.
///
/// The size field keeps the host byte order so the header stays byte-for-byte
/// compatible with existing peers. Hosts of different endianness cannot
/// interoperate.

use std::io::{self, Read, Write};

use crate::error::{Result, TransferError};

/// Maximum usable bytes in the name field.
pub const MAX_NAME_LEN: usize = 255;

/// Name field size on the wire (usable bytes + terminator).
pub const NAME_FIELD: usize = MAX_NAME_LEN + 1;

/// Size field width.
pub const SIZE_FIELD: usize = 8;

/// Total header size. Both ends must agree on it.
pub const HEADER_SIZE: usize = NAME_FIELD + SIZE_FIELD;

/// Chunk size for streaming: 256 KB.
pub const CHUNK_SIZE: usize = 256 * 1024;

/// Fixed-layout header sent first on every transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub name: String,
    pub size: u64,
}

impl FileHeader {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Serialize into the fixed-size wire block. Names longer than
    /// `MAX_NAME_LEN` bytes are truncated at a character boundary.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let name = truncate_name(&self.name);
        buf[..name.len()].copy_from_slice(name.as_bytes());
        buf[NAME_FIELD..].copy_from_slice(&self.size.to_ne_bytes());
        buf
    }

    /// Parse a header block. The name field is taken as exactly `NAME_FIELD`
    /// bytes and cut at the first NUL, or at `MAX_NAME_LEN` when the peer
    /// sent no terminator.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(TransferError::malformed(format!(
                "expected {} bytes, got {}",
                HEADER_SIZE,
                data.len()
            )));
        }
        let field = &data[..MAX_NAME_LEN];
        let end = field.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
        let name = String::from_utf8_lossy(&field[..end]).into_owned();

        let mut size = [0u8; SIZE_FIELD];
        size.copy_from_slice(&data[NAME_FIELD..HEADER_SIZE]);

        Ok(Self {
            name,
            size: u64::from_ne_bytes(size),
        })
    }
}

/// Longest prefix of `name` that fits `MAX_NAME_LEN` bytes without splitting a
/// character.
pub(crate) fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Read exactly one header from `reader`. A stream that ends before
/// `HEADER_SIZE` bytes is a malformed header, not an empty transfer.
pub fn read_header<R: Read + ?Sized>(reader: &mut R) -> Result<FileHeader> {
    let mut buf = [0u8; HEADER_SIZE];
    let mut filled = 0;
    while filled < HEADER_SIZE {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(TransferError::malformed(format!(
                    "unexpected amount of bytes: {}",
                    filled
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(TransferError::malformed_io(
                    format!("read failed after {} bytes", filled),
                    e,
                ));
            }
        }
    }
    FileHeader::decode(&buf)
}

/// Write the whole header block or fail. A peer that goes away here has
/// received none of the declared payload.
pub fn write_header<W: Write + ?Sized>(writer: &mut W, header: &FileHeader) -> Result<()> {
    writer
        .write_all(&header.encode())
        .map_err(|e| TransferError::TruncatedTransfer {
            expected: header.size,
            received: 0,
            source: Some(e),
        })
}
