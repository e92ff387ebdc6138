use std::io;

use crate::relay::{Relay, RelayConfig};

/// Relay over this process's stdin and stdout, as launched by the browser.
///
/// Stdout carries frames only: nothing else in the process may print to it.
pub fn stdio_relay(config: RelayConfig) -> Relay {
    Relay::with_config(io::stdin(), io::stdout(), config)
}
