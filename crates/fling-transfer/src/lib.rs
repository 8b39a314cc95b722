/// fling: single-file transfer over raw TCP.
///
/// A transfer is one connection carrying:
/// - a fixed 264-byte header (file name + declared size)
/// - exactly `size` raw payload bytes
///
/// The receiver trusts the declared size as the only stop condition, strips
/// every directory component from the peer's file name, and serves one
/// connection at a time. No encryption, authentication or integrity checks.

pub mod copier;
pub mod error;
pub mod logging;
pub mod net;
pub mod progress;
pub mod protocol;
pub mod receiver;
pub mod sanitize;
pub mod sender;
pub mod server;
pub mod session;

// Re-export key types for convenience.
pub use copier::{CopyMode, copy_chunks};
pub use error::{Result, TransferError};
pub use logging::{NullLogger, TracingLogger, TransferEvent, TransferLog, TransferLogger};
pub use net::{DEFAULT_PORT, TransportConfig, accept, connect, listen};
pub use progress::{ProgressObserver, TerminalProgress, Throttle};
pub use protocol::{CHUNK_SIZE, FileHeader, HEADER_SIZE, MAX_NAME_LEN, read_header, write_header};
pub use receiver::{ReceiveResult, ReceiverConfig, receive_file};
pub use sanitize::sanitize;
pub use sender::{SendResult, SenderConfig, SourceFile, send_file};
pub use server::{run_server, serve_one};
pub use session::{Direction, SessionState, TransferSession};
