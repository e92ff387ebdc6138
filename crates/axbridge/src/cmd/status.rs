use axbridge_mcp::{HttpBackend, HttpCall, ReqwestBackend};
use serde_json::Value;

use crate::cmd::{parse_duration, StatusArgs};
use crate::exit::{mcp_error, CliError, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_status, OutputFormat};

pub fn run(args: StatusArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let backend = ReqwestBackend::new(args.base_url.as_str(), timeout)
        .map_err(|err| mcp_error("http client setup failed", err))?;

    let status = backend
        .call(HttpCall::Get("/status"), &Value::Null)
        .map_err(|err| {
            CliError::new(
                HEALTH_CHECK_FAILED,
                format!("host not reachable at {}: {err}", backend.base_url()),
            )
        })?;

    print_status(&status, format);
    Ok(SUCCESS)
}
