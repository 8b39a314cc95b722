/// Integration test: hand-crafted and hostile payloads against a real
/// receiver over TCP loopback.

use std::fs;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, TcpStream};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use fling_transfer::{
    CHUNK_SIZE, FileHeader, ReceiveResult, ReceiverConfig, TransferError, TransportConfig, listen,
    run_server, serve_one,
};
use tempdir::TempDir;

fn loopback() -> TransportConfig {
    TransportConfig {
        bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        io_timeout: Some(Duration::from_secs(30)),
        ..TransportConfig::default()
    }
}

/// Start a receiver for a single connection. Returns the port and a channel
/// carrying the session result.
fn spawn_receiver(config: ReceiverConfig) -> (u16, Receiver<Result<ReceiveResult, TransferError>>) {
    let listener = listen(0, &loopback()).unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let _ = tx.send(serve_one(&listener, &config, &loopback()));
    });
    (port, rx)
}

/// Write raw bytes as a misbehaving peer would, then close. Write errors are
/// ignored: the receiver may hang up once it has what it wants.
fn send_raw(port: u16, header: &FileHeader, payload: &[u8]) {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let _ = stream.write_all(&header.encode());
    let _ = stream.write_all(payload);
}

fn wait(rx: &Receiver<Result<ReceiveResult, TransferError>>) -> Result<ReceiveResult, TransferError> {
    rx.recv_timeout(Duration::from_secs(30))
        .expect("receiver did not finish")
}

#[test]
fn path_traversal_is_contained() {
    let root = TempDir::new("fling-recv").unwrap();
    let inbox = root.path().join("inbox");
    fs::create_dir(&inbox).unwrap();

    let (port, rx) = spawn_receiver(ReceiverConfig::quiet(&inbox));
    send_raw(port, &FileHeader::new("../escaped.dat", 0), b"");

    let result = wait(&rx).unwrap();
    assert_eq!(result.name, "escaped.dat");
    assert!(inbox.join("escaped.dat").exists(), "file not found inside the receive dir");
    assert!(!root.path().join("escaped.dat").exists(), "file was written outside the receive dir");
}

#[test]
fn file_size_mismatch_actual_size_is_larger() {
    let dir = TempDir::new("fling-recv").unwrap();
    let (port, rx) = spawn_receiver(ReceiverConfig::quiet(dir.path()));
    send_raw(port, &FileHeader::new("mismatch-1-1.dat", 2), &[b'a'; 5]);

    let result = wait(&rx).unwrap();
    assert_eq!(result.total_bytes, 2);
    assert_eq!(fs::read(dir.path().join("mismatch-1-1.dat")).unwrap(), b"aa");
}

#[test]
fn file_size_mismatch_actual_size_is_larger_across_chunks() {
    let dir = TempDir::new("fling-recv").unwrap();
    let (port, rx) = spawn_receiver(ReceiverConfig::quiet(dir.path()));
    let payload = vec![b'a'; CHUNK_SIZE + 5];
    send_raw(port, &FileHeader::new("mismatch-1-2.dat", (CHUNK_SIZE + 2) as u64), &payload);

    let result = wait(&rx).unwrap();
    assert_eq!(result.total_bytes, (CHUNK_SIZE + 2) as u64);
    let written = fs::read(dir.path().join("mismatch-1-2.dat")).unwrap();
    assert_eq!(written.len(), CHUNK_SIZE + 2);
}

#[test]
fn file_size_mismatch_actual_size_is_smaller() {
    let dir = TempDir::new("fling-recv").unwrap();
    let (port, rx) = spawn_receiver(ReceiverConfig::quiet(dir.path()));
    send_raw(port, &FileHeader::new("mismatch-2.dat", 5), &[b'a'; 3]);

    let err = wait(&rx).unwrap_err();
    assert!(
        matches!(err, TransferError::TruncatedTransfer { expected: 5, received: 3, .. }),
        "unexpected error: {err}"
    );
    // Partial output stays on disk unless removal is configured.
    assert_eq!(fs::read(dir.path().join("mismatch-2.dat")).unwrap().len(), 3);
}

#[test]
fn short_header_is_malformed() {
    let dir = TempDir::new("fling-recv").unwrap();
    let (port, rx) = spawn_receiver(ReceiverConfig::quiet(dir.path()));
    {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.write_all(&FileHeader::new("half.dat", 1).encode()[..100]).unwrap();
    }

    let err = wait(&rx).unwrap_err();
    assert!(matches!(err, TransferError::MalformedHeader { .. }));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

fn wait_for_file(path: &Path, len: u64) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if fs::metadata(path).map(|m| m.len() == len).unwrap_or(false) {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn server_keeps_serving_after_bad_client() {
    let dir = TempDir::new("fling-recv").unwrap();
    let listener = listen(0, &loopback()).unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = ReceiverConfig::quiet(dir.path());

    // The loop never returns; the thread ends with the test process.
    thread::spawn(move || run_server(&listener, &config, &loopback()));

    send_raw(port, &FileHeader::new("broken.dat", 100), b"only a few bytes");
    send_raw(port, &FileHeader::new("good.dat", 4), b"good");

    assert!(wait_for_file(&dir.path().join("good.dat"), 4));
    assert_eq!(fs::read(dir.path().join("good.dat")).unwrap(), b"good");
}
