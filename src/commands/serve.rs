//! The `serve` front-end: the command surface over stdin/stdout.
//!
//! One JSON request per input line, one JSON response line per request.
//! A malformed or failing request produces an error response and the
//! loop keeps serving; only transport failures end it.

use crate::agent::{AgentId, ExecutionId, ExecutionInput};
use crate::cancel::CancelToken;
use crate::commands::{CommandContext, agent, execution};
use crate::error::{MusterError, Result};
use crate::process::{DetachedSpawner, Spawner};
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, Write};
use tracing::debug;

pub(crate) fn cmd_serve(context: &CommandContext, cancel: &CancelToken) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_loop(
        context,
        cancel,
        &DetachedSpawner,
        stdin.lock(),
        stdout.lock(),
    )
}

#[derive(Debug, Deserialize)]
struct Request {
    op: String,
    id: Option<String>,
    agent: Option<String>,
    input: Option<ExecutionInput>,
    #[serde(default = "default_detach")]
    detach: bool,
}

fn default_detach() -> bool {
    true
}

fn run_loop<R: BufRead, W: Write>(
    context: &CommandContext,
    cancel: &CancelToken,
    spawner: &dyn Spawner,
    reader: R,
    mut writer: W,
) -> Result<()> {
    for line in reader.lines() {
        cancel.check()?;

        let line = line.map_err(|e| MusterError::io("read request", e))?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match handle_request(context, cancel, spawner, &line) {
            Ok(data) => json!({ "ok": true, "data": data }),
            Err(e) => {
                debug!(error = %e, "request failed");
                json!({
                    "ok": false,
                    "error": { "message": e.to_string(), "code": e.exit_code() },
                })
            }
        };

        writeln!(writer, "{}", response).map_err(|e| MusterError::io("write response", e))?;
        writer
            .flush()
            .map_err(|e| MusterError::io("write response", e))?;
    }
    Ok(())
}

fn handle_request(
    context: &CommandContext,
    cancel: &CancelToken,
    spawner: &dyn Spawner,
    line: &str,
) -> Result<serde_json::Value> {
    let request: Request = serde_json::from_str(line)
        .map_err(|e| MusterError::InvalidInput(format!("malformed request: {}", e)))?;

    match request.op.as_str() {
        "execution.create" => {
            let agent = required(request.agent, "agent")?;
            let input = required(request.input, "input")?;
            let agent = AgentId::parse(&agent)?;

            let id = execution::create_execution(context, &agent, &input)?;
            if request.detach {
                spawner.spawn(cancel, &id)?;
            }
            Ok(json!({ "id": id }))
        }
        "execution.list" => execution::list_value(context),
        "execution.show" => {
            let id = ExecutionId::parse(&required(request.id, "id")?)?;
            execution::show_value(context, &id)
        }
        "agent.list" => agent::list_value(context),
        "agent.show" => {
            let id = AgentId::parse(&required(request.id, "id")?)?;
            agent::show_value(context, &id)
        }
        other => Err(MusterError::InvalidInput(format!(
            "unknown operation '{}'",
            other
        ))),
    }
}

fn required<T>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| MusterError::InvalidInput(format!("missing field '{}'", name)))
}
