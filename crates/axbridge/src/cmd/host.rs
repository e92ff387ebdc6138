use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use axbridge_http::{AppState, HttpError, ServerConfig};
use axbridge_relay::{stdio_relay, Relay, RelayConfig};
use tokio::sync::watch;

use crate::cmd::{parse_duration, HostArgs};
use crate::exit::{http_error, io_error, relay_error, CliError, CliResult, INTERNAL, SUCCESS};

/// Grace period for in-flight HTTP requests once the host is stopping.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Why the host is winding down.
#[derive(Debug)]
enum Exit {
    Interrupted,
    ExtensionClosed,
    Server(Result<(), HttpError>),
}

pub fn run(args: HostArgs, log_file: Option<&Path>) -> CliResult<i32> {
    let command_timeout = parse_duration(&args.command_timeout)?;
    let mode = if args.http_only { "http-only" } else { "native" };

    tracing::info!(
        pid = std::process::id(),
        port = args.port,
        mode,
        log_file = %log_file.map(|p| p.display().to_string()).unwrap_or_else(|| "-".to_string()),
        "axbridge host starting"
    );
    if let Some(origin) = args.origin.first() {
        tracing::info!(origin = %origin, "launched by extension");
    }

    let relay_config = RelayConfig {
        default_timeout: command_timeout,
        ..RelayConfig::default()
    };
    let relay = if args.http_only {
        Relay::detached(relay_config)
    } else {
        stdio_relay(relay_config).with_event_handler(|event| {
            tracing::info!(event = %event, "extension event");
        })
    };
    let relay = Arc::new(relay);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    let (exit_tx, exit_rx) = mpsc::channel();
    install_ctrlc_handler(exit_tx.clone())?;

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server_config = ServerConfig {
        port: args.port,
        bind_retries: args.bind_retries,
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(relay.clone()).with_command_timeout(command_timeout));
    let server_exit = exit_tx.clone();
    runtime.spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.changed().await;
        };
        let result = axbridge_http::run(&server_config, state, shutdown).await;
        let _ = server_exit.send(Exit::Server(result));
    });

    if !args.http_only {
        let reader = relay
            .start()
            .map_err(|err| relay_error("native messaging failed to start", err))?;
        let reader_exit = exit_tx.clone();
        thread::Builder::new()
            .name("axbridge-reader-watch".to_string())
            .spawn(move || {
                let _ = reader.join();
                let _ = reader_exit.send(Exit::ExtensionClosed);
            })
            .map_err(|err| io_error("reader watcher failed to start", err))?;
    }
    drop(exit_tx);

    let mut server_done = false;
    let outcome = loop {
        match exit_rx.recv() {
            Ok(Exit::Interrupted) => {
                tracing::info!("interrupted, stopping");
                break Ok(SUCCESS);
            }
            Ok(Exit::ExtensionClosed) => {
                tracing::info!("extension closed the connection, stopping");
                break Ok(SUCCESS);
            }
            Ok(Exit::Server(Ok(()))) => {
                server_done = true;
                break Ok(SUCCESS);
            }
            Ok(Exit::Server(Err(err))) => {
                server_done = true;
                if args.http_only {
                    break Err(http_error("HTTP facade failed", err));
                }
                tracing::error!(error = %err, "HTTP facade unavailable, native messaging continues");
            }
            Err(_) => break Err(CliError::new(INTERNAL, "host lost every exit signal")),
        }
    };

    relay.stop();
    let _ = shutdown_tx.send(true);
    if !server_done {
        wait_for_server(&exit_rx);
    }
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    tracing::info!(status = %relay.state(), "axbridge host stopped");
    outcome
}

fn wait_for_server(exit_rx: &mpsc::Receiver<Exit>) {
    let deadline = std::time::Instant::now() + SHUTDOWN_GRACE;
    loop {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        match exit_rx.recv_timeout(remaining) {
            Ok(Exit::Server(_)) | Err(_) => return,
            Ok(_) => continue,
        }
    }
}

fn install_ctrlc_handler(exit_tx: Sender<Exit>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        let _ = exit_tx.send(Exit::Interrupted);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
