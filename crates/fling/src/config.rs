use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use fling_transfer::{DEFAULT_PORT, ReceiverConfig, TransportConfig};

#[derive(Parser, Debug)]
#[command(name = "fling", version, about = "Send a single file over raw TCP")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub transport: TransportArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive files, one connection at a time
    Serve {
        /// Port to listen on
        #[arg(env = "FLING_PORT", default_value_t = DEFAULT_PORT, value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,

        /// Directory received files are written to
        #[arg(long, env = "FLING_RECV_DIR", default_value = ".")]
        dir: PathBuf,

        /// Delete partially received files when a transfer fails
        #[arg(long, env = "FLING_REMOVE_PARTIAL")]
        remove_partial: bool,
    },
    /// Send a file
    Send {
        /// File to send
        file: PathBuf,

        /// Receiver host name or address
        host: String,

        /// Receiver port
        #[arg(env = "FLING_PORT", default_value_t = DEFAULT_PORT, value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,

        /// Do not draw the progress bar
        #[arg(long, env = "FLING_NO_PROGRESS")]
        no_progress: bool,
    },
}

#[derive(Args, Debug)]
pub struct TransportArgs {
    /// Address the receiver binds to
    #[arg(long, global = true, env = "FLING_BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Read/write timeout in seconds (blocks forever when unset)
    #[arg(long, global = true, env = "FLING_IO_TIMEOUT_SECS")]
    pub io_timeout_secs: Option<u64>,

    /// Connect timeout in seconds
    #[arg(long, global = true, env = "FLING_CONNECT_TIMEOUT_SECS")]
    pub connect_timeout_secs: Option<u64>,
}

impl TransportArgs {
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            bind_addr: self.bind,
            io_timeout: self.io_timeout_secs.map(Duration::from_secs),
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
            ..TransportConfig::default()
        }
    }
}

pub fn receiver_config(dir: PathBuf, remove_partial: bool) -> ReceiverConfig {
    ReceiverConfig {
        remove_partial,
        ..ReceiverConfig::new(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_uses_default_port() {
        let cli = Cli::try_parse_from(["fling", "send", "a.bin", "example.org"]).unwrap();
        match cli.command {
            Command::Send { file, host, port, no_progress } => {
                assert_eq!(file, PathBuf::from("a.bin"));
                assert_eq!(host, "example.org");
                assert_eq!(port, DEFAULT_PORT);
                assert!(!no_progress);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_takes_port_and_options() {
        let cli = Cli::try_parse_from([
            "fling",
            "serve",
            "9000",
            "--dir",
            "/tmp/in",
            "--remove-partial",
            "--io-timeout-secs",
            "5",
        ])
        .unwrap();
        match cli.command {
            Command::Serve { port, dir, remove_partial } => {
                assert_eq!(port, 9000);
                assert_eq!(dir, PathBuf::from("/tmp/in"));
                assert!(remove_partial);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        let transport = cli.transport.transport_config();
        assert_eq!(transport.io_timeout, Some(Duration::from_secs(5)));
        assert_eq!(transport.connect_timeout, None);
    }

    #[test]
    fn rejects_port_zero() {
        assert!(Cli::try_parse_from(["fling", "serve", "0"]).is_err());
    }

    #[test]
    fn send_requires_host() {
        assert!(Cli::try_parse_from(["fling", "send", "a.bin"]).is_err());
    }

    #[test]
    fn receiver_config_keeps_defaults() {
        let config = receiver_config(PathBuf::from("in"), true);
        assert_eq!(config.output_dir, PathBuf::from("in"));
        assert!(config.remove_partial);
        assert_eq!(config.chunk_size, fling_transfer::CHUNK_SIZE);
    }
}
