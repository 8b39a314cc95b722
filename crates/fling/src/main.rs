mod config;

use std::path::Path;

use clap::Parser;
use tracing::info;

use fling_transfer::{
    ProgressObserver, SenderConfig, SourceFile, TerminalProgress, TransportConfig, connect, listen,
    run_server, send_file,
};

use crate::config::{Cli, Command, receiver_config};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fling=info,fling_transfer=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Argument errors exit with 1 like every other failure.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    let transport = cli.transport.transport_config();

    match cli.command {
        Command::Serve {
            port,
            dir,
            remove_partial,
        } => {
            let config = receiver_config(dir, remove_partial);
            info!("Receiving into {}", config.output_dir.display());
            let listener = listen(port, &transport)?;
            run_server(&listener, &config, &transport);
            Ok(())
        }
        Command::Send {
            file,
            host,
            port,
            no_progress,
        } => send(&file, &host, port, no_progress, &transport),
    }
}

fn send(
    file: &Path,
    host: &str,
    port: u16,
    no_progress: bool,
    transport: &TransportConfig,
) -> anyhow::Result<()> {
    // Open first: a bad source never costs a connection.
    let source = SourceFile::open(file)?;
    let mut stream = connect(host, port, transport)?;
    info!("Connected to {}:{}", host, port);

    let mut bar = (!no_progress).then(TerminalProgress::stderr);
    let observer = bar.as_mut().map(|b| b as &mut dyn ProgressObserver);
    let result = send_file(source, &mut stream, &SenderConfig::default(), observer)?;

    if let Some(bar) = bar.as_mut() {
        bar.finish(result.total_bytes);
    }
    info!(
        "File {} sent successfully: {} bytes in {:.2}s",
        result.name,
        result.total_bytes,
        result.elapsed.as_secs_f64()
    );
    Ok(())
}
