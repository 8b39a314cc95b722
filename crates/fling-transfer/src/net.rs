/// TCP transport: connect on the sending side, listen/accept on the receiving
/// side.
///
/// Socket tuning (buffer sizes, `TCP_NODELAY`, address reuse) only affects
/// throughput. Failing to apply it is logged and otherwise ignored.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tracing::{debug, info, warn};

use crate::error::{Result, TransferError};

/// Default port for both `serve` and `send`.
pub const DEFAULT_PORT: u16 = 8080;

/// 512 KB socket buffers.
pub const SOCKET_BUF_SIZE: usize = 512 * 1024;

/// Pending connections queued by the listener.
pub const LISTEN_BACKLOG: i32 = 10;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Local address the listener binds to.
    pub bind_addr: IpAddr,
    pub send_buffer: usize,
    pub recv_buffer: usize,
    pub nodelay: bool,
    /// Read/write timeout on connected sockets. `None` blocks indefinitely.
    pub io_timeout: Option<Duration>,
    /// Connect timeout. `None` leaves it to the OS.
    pub connect_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            send_buffer: SOCKET_BUF_SIZE,
            recv_buffer: SOCKET_BUF_SIZE,
            nodelay: true,
            io_timeout: None,
            connect_timeout: None,
        }
    }
}

/// Resolve `host` and connect to the first address that accepts.
pub fn connect(host: &str, port: u16, config: &TransportConfig) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| TransferError::connection(format!("resolve {}", host), e))?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        debug!("connect {}...", addr);
        match connect_addr(addr, config) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("connect {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(TransferError::connection(
        format!("connect {}:{}", host, port),
        last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses resolved")),
    ))
}

fn connect_addr(addr: SocketAddr, config: &TransportConfig) -> io::Result<TcpStream> {
    let sock = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    if let Err(e) = sock.set_send_buffer_size(config.send_buffer) {
        warn!("setsockopt SO_SNDBUF: {}", e);
    }
    if let Err(e) = sock.set_reuse_address(true) {
        warn!("setsockopt SO_REUSEADDR: {}", e);
    }
    if let Err(e) = sock.set_nodelay(config.nodelay) {
        warn!("setsockopt TCP_NODELAY: {}", e);
    }

    match config.connect_timeout {
        Some(timeout) => sock.connect_timeout(&addr.into(), timeout)?,
        None => sock.connect(&addr.into())?,
    }

    let stream: TcpStream = sock.into();
    apply_timeouts(&stream, config)?;
    Ok(stream)
}

/// Bind a listener on `config.bind_addr:port`. Port 0 picks a free port.
pub fn listen(port: u16, config: &TransportConfig) -> Result<TcpListener> {
    let addr = SocketAddr::new(config.bind_addr, port);
    let sock = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| TransferError::connection("socket", e))?;
    if let Err(e) = sock.set_reuse_address(true) {
        warn!("setsockopt SO_REUSEADDR: {}", e);
    }
    sock.bind(&addr.into())
        .map_err(|e| TransferError::connection(format!("bind {}", addr), e))?;
    sock.listen(LISTEN_BACKLOG)
        .map_err(|e| TransferError::connection("listen", e))?;

    let listener: TcpListener = sock.into();
    let local = listener.local_addr().unwrap_or(addr);
    info!("Listening on {}...", local);
    Ok(listener)
}

/// Accept one connection and tune it for receiving.
pub fn accept(listener: &TcpListener, config: &TransportConfig) -> Result<(TcpStream, SocketAddr)> {
    let (stream, peer) = listener
        .accept()
        .map_err(|e| TransferError::connection("accept", e))?;

    let sock_ref = SockRef::from(&stream);
    if let Err(e) = sock_ref.set_recv_buffer_size(config.recv_buffer) {
        warn!("setsockopt SO_RCVBUF: {}", e);
    }
    if let Err(e) = sock_ref.set_nodelay(config.nodelay) {
        warn!("setsockopt TCP_NODELAY: {}", e);
    }
    apply_timeouts(&stream, config).map_err(|e| TransferError::connection("set timeout", e))?;

    Ok((stream, peer))
}

fn apply_timeouts(stream: &TcpStream, config: &TransportConfig) -> io::Result<()> {
    stream.set_read_timeout(config.io_timeout)?;
    stream.set_write_timeout(config.io_timeout)?;
    Ok(())
}
