mod cmd;
mod exit;
mod logging;
mod output;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};

use crate::cmd::{Command, HostArgs};
use crate::logging::{init_logging, LogFormat, LogLevel, DEFAULT_LOG_FILE};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "axbridge",
    version,
    about = "Browser-extension native-messaging host with HTTP and MCP facades"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format.
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level.
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Append logs to this file as well as stderr.
    #[arg(
        long,
        value_name = "PATH",
        env = "AXBRIDGE_LOG_FILE",
        default_value = DEFAULT_LOG_FILE,
        global = true
    )]
    log_file: PathBuf,

    /// Log to stderr only.
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// The browser starts the host with the extension origin as its only
/// argument; route anything that is not a flag or a known subcommand to
/// `host`.
fn with_default_subcommand(mut args: Vec<OsString>) -> Vec<OsString> {
    let routes_to_host = args
        .get(1)
        .and_then(|arg| arg.to_str())
        .is_some_and(|arg| !arg.starts_with('-') && Cli::command().find_subcommand(arg).is_none());
    if routes_to_host {
        args.insert(1, OsString::from("host"));
    }
    args
}

fn main() {
    let cli = Cli::parse_from(with_default_subcommand(std::env::args_os().collect()));

    let command = match cli.command {
        Some(command) => command,
        None => match HostArgs::from_env() {
            Ok(args) => Command::Host(args),
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(err.code);
            }
        },
    };

    let wanted_log_file = (command.wants_log_file() && !cli.no_log_file).then_some(cli.log_file);
    let log_file = init_logging(cli.log_format, cli.log_level, wanted_log_file.as_deref());

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(command, format, log_file.as_deref());

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!(code = err.code, "{err}");
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
