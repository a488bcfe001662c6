//! `execution` command handlers.

use crate::agent::{AgentId, ConversationId, ExecutionId, ExecutionInput};
use crate::cancel::CancelToken;
use crate::cli::{ExecutionCreateArgs, ExecutionShowArgs};
use crate::commands::{CommandContext, print_json};
use crate::error::{MusterError, Result};
use crate::process::{DetachedSpawner, Spawner};
use crate::runner::run_execution;
use serde_json::json;
use tracing::warn;

pub(crate) fn cmd_create(
    context: &CommandContext,
    cancel: &CancelToken,
    args: ExecutionCreateArgs,
) -> Result<()> {
    let agent = AgentId::parse(&args.agent)?;
    let input = ExecutionInput {
        prompt: args.prompt,
        model: args.model,
        conversation_id: args.conversation.map(ConversationId),
        working_directory: args.workdir,
    };

    let id = create_execution(context, &agent, &input)?;

    if args.no_detach {
        run_execution(&context.executions, &context.registry, cancel, &id)?;
    } else {
        DetachedSpawner.spawn(cancel, &id)?;
    }

    print_json(&json!({ "id": id }))
}

pub(crate) fn cmd_list(context: &CommandContext) -> Result<()> {
    print_json(&list_value(context)?)
}

pub(crate) fn cmd_show(context: &CommandContext, args: ExecutionShowArgs) -> Result<()> {
    let id = ExecutionId::parse(&args.execution_id)?;
    print_json(&show_value(context, &id)?)
}

/// Create the execution record, snapshotting the agent's config.
pub(crate) fn create_execution(
    context: &CommandContext,
    agent: &AgentId,
    input: &ExecutionInput,
) -> Result<ExecutionId> {
    let config = context.agents.get(agent)?;
    let execution = context.executions.create(input, &config)?;
    Ok(execution.id().clone())
}

/// All executions with their statuses, in creation order. An execution
/// whose status cannot be read is skipped with a warning rather than
/// failing the whole listing.
pub(crate) fn list_value(context: &CommandContext) -> Result<serde_json::Value> {
    let mut items = Vec::new();
    for id in context.executions.find()? {
        let execution = context.executions.get(&id)?;
        match execution.get_status() {
            Ok(status) => items.push(json!({ "id": id, "status": status })),
            Err(e) => {
                warn!(execution = %id, error = %e, "skipping unreadable execution");
            }
        }
    }
    Ok(json!({ "count": items.len(), "items": items }))
}

/// One execution in full. A missing result is the normal
/// pre-completion shape, reported as `null`; any other result failure
/// propagates.
pub(crate) fn show_value(context: &CommandContext, id: &ExecutionId) -> Result<serde_json::Value> {
    let execution = context.executions.get(id)?;
    let status = execution.get_status()?;
    let input = execution.get_input()?;
    let result = match execution.get_result() {
        Ok(result) => Some(result),
        Err(MusterError::ResultNotAvailable(_)) => None,
        Err(e) => return Err(e),
    };

    Ok(json!({
        "id": id,
        "status": status,
        "input": input,
        "result": result,
    }))
}
