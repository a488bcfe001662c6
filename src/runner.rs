//! The execution run loop.
//!
//! One invocation drives one execution from `created` (or a previous
//! failure) through `running` to a terminal state. A runtime failure is
//! recorded in the store and is not an error of the runner itself; only
//! store and registry failures propagate.

use crate::agent::{ExecutionId, ExecutionResult, ExecutionState};
use crate::cancel::CancelToken;
use crate::error::{MusterError, Result};
use crate::runtime::{RuntimeRegistry, RuntimeResult};
use crate::store::{Execution, ExecutionRepository};
use chrono::Utc;
use std::thread;
use tracing::{debug, info, warn};

/// Run one execution to a terminal state.
pub fn run_execution(
    repository: &ExecutionRepository,
    registry: &RuntimeRegistry,
    cancel: &CancelToken,
    id: &ExecutionId,
) -> Result<()> {
    let execution = repository.get(id)?;

    let mut status = execution.get_status()?;
    // Terminal executions are immutable; a rerun must not overwrite
    // the recorded outcome.
    if status.state.is_terminal() {
        return Err(MusterError::ExecutionFinished(id.to_string()));
    }
    status.state = ExecutionState::Running;
    status.attempts += 1;
    let status = execution.update_status(status)?;
    info!(execution = %id, attempt = status.attempts, "execution running");

    match drive_runtime(registry, cancel, &execution) {
        Ok(result) => {
            execution.set_result(&ExecutionResult {
                conversation_id: result.conversation_id,
                response: result.response,
            })?;
            info!(execution = %id, "execution succeeded");
        }
        Err(e) => {
            warn!(execution = %id, error = %e, "execution failed");
            let mut status = execution.get_status()?;
            status.state = ExecutionState::Failed;
            status.finished_at = Some(Utc::now());
            execution.update_status(status)?;
        }
    }

    Ok(())
}

/// Execute the runtime and wait for its outcome, draining the advisory
/// event stream into the log as it arrives.
fn drive_runtime(
    registry: &RuntimeRegistry,
    cancel: &CancelToken,
    execution: &Execution,
) -> Result<RuntimeResult> {
    let input = execution.get_input()?;
    let agent_config = execution.get_agent_config()?;
    let runtime = registry.get(agent_config.runtime_kind)?;

    let mut instance = runtime.execute(
        cancel,
        execution.id(),
        &agent_config.runtime_config,
        &input,
    )?;

    let drain = instance.take_events().map(|events| {
        let id = execution.id().clone();
        thread::spawn(move || {
            for event in events {
                debug!(execution = %id, kind = event.kind(), "runtime event");
            }
        })
    });

    let outcome = instance.wait(cancel);

    if let Some(handle) = drain
        && handle.join().is_err()
    {
        debug!("event drain thread panicked");
    }

    outcome
}
