use std::fmt;
use std::io;

use axbridge_frame::FrameError;
use axbridge_http::HttpError;
use axbridge_mcp::McpError;
use axbridge_relay::RelayError;

// Exit codes follow sysexits conventions where one exists (64 usage, 124 timeout).
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed | FrameError::Truncated { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

pub fn relay_error(context: &str, err: RelayError) -> CliError {
    match err {
        RelayError::Frame(err) => frame_error(context, err),
        RelayError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        RelayError::NotConnected | RelayError::ConnectionLost => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        RelayError::Spawn(source) => io_error(context, source),
        RelayError::AlreadyStarted => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn http_error(context: &str, err: HttpError) -> CliError {
    match err {
        HttpError::Bind { .. } => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        HttpError::Io(source) => io_error(context, source),
    }
}

pub fn mcp_error(context: &str, err: McpError) -> CliError {
    match err {
        McpError::Io(source) => io_error(context, source),
        McpError::Http(_) => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        McpError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        McpError::Schema(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
