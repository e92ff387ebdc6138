use axbridge_mcp::{serve_stdio, McpConfig};

use crate::cmd::{parse_duration, McpArgs};
use crate::exit::{mcp_error, CliResult, SUCCESS};

pub fn run(args: McpArgs) -> CliResult<i32> {
    let config = McpConfig {
        base_url: args.base_url,
        http_timeout: parse_duration(&args.http_timeout)?,
    };
    serve_stdio(&config).map_err(|err| mcp_error("mcp server failed", err))?;
    Ok(SUCCESS)
}
