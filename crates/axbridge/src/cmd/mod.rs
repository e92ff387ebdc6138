use std::path::Path;
use std::time::Duration;

use axbridge_http::DEFAULT_PORT;
use axbridge_mcp::DEFAULT_BASE_URL;
use clap::{Args, Parser, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod host;
pub mod mcp;
pub mod status;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the native-messaging host with its HTTP facade (default).
    Host(HostArgs),
    /// Serve MCP on stdio against a running host.
    Mcp(McpArgs),
    /// Query a running host's diagnostics.
    Status(StatusArgs),
    /// Show version information.
    Version(VersionArgs),
}

impl Command {
    /// Long-running modes also log to the log file.
    pub fn wants_log_file(&self) -> bool {
        matches!(self, Command::Host(_) | Command::Mcp(_))
    }
}

pub fn run(command: Command, format: OutputFormat, log_file: Option<&Path>) -> CliResult<i32> {
    match command {
        Command::Host(args) => host::run(args, log_file),
        Command::Mcp(args) => mcp::run(args),
        Command::Status(args) => status::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone)]
pub struct HostArgs {
    /// Extension origin, passed by the browser when it launches the host.
    #[arg(value_name = "ORIGIN")]
    pub origin: Vec<String>,
    /// HTTP facade port (loopback only).
    #[arg(long, env = "AXBRIDGE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Serve HTTP without reading native messages from stdin.
    #[arg(long)]
    pub http_only: bool,
    /// Per-command deadline (e.g. 30s, 500ms).
    #[arg(long, default_value = "30s")]
    pub command_timeout: String,
    /// Bind attempts while the port is busy.
    #[arg(long, default_value_t = 3)]
    pub bind_retries: u32,
    /// Parent window handle passed by Chrome on Windows; ignored.
    #[arg(long, hide = true)]
    pub parent_window: Option<String>,
}

impl HostArgs {
    /// Host settings when no subcommand was given, env fallbacks included.
    pub fn from_env() -> CliResult<Self> {
        #[derive(Parser)]
        struct DefaultHost {
            #[command(flatten)]
            args: HostArgs,
        }
        DefaultHost::try_parse_from(["axbridge"])
            .map(|parsed| parsed.args)
            .map_err(|err| CliError::new(USAGE, err.to_string().trim_end().to_string()))
    }
}

#[derive(Args, Debug)]
pub struct McpArgs {
    /// Base URL of the host's HTTP facade.
    #[arg(long, env = "AXBRIDGE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
    /// Per-request HTTP timeout (e.g. 30s, 500ms).
    #[arg(long, default_value = "30s")]
    pub http_timeout: String,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Base URL of the host's HTTP facade.
    #[arg(long, env = "AXBRIDGE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
    /// Request timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
