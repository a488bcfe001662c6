//! `agent` command handlers.

use crate::agent::AgentId;
use crate::cancel::CancelToken;
use crate::cli::AgentShowArgs;
use crate::commands::{CommandContext, print_json};
use crate::error::Result;
use serde_json::json;
use tracing::warn;

pub(crate) fn cmd_list(context: &CommandContext) -> Result<()> {
    print_json(&list_value(context)?)
}

pub(crate) fn cmd_show(context: &CommandContext, args: AgentShowArgs) -> Result<()> {
    let id = AgentId::parse(&args.agent_id)?;
    print_json(&show_value(context, &id)?)
}

pub(crate) fn cmd_discovery(context: &CommandContext, cancel: &CancelToken) -> Result<()> {
    print_json(&discovery_value(context, cancel)?)
}

/// All defined agents with their runtime kinds, sorted by id. An agent
/// whose definition cannot be read is skipped with a warning.
pub(crate) fn list_value(context: &CommandContext) -> Result<serde_json::Value> {
    let mut items = Vec::new();
    for id in context.agents.list()? {
        match context.agents.get(&id) {
            Ok(config) => {
                items.push(json!({ "id": id, "runtimeKind": config.runtime_kind }));
            }
            Err(e) => {
                warn!(agent = %id, error = %e, "skipping unreadable agent definition");
            }
        }
    }
    Ok(json!({ "count": items.len(), "items": items }))
}

pub(crate) fn show_value(context: &CommandContext, id: &AgentId) -> Result<serde_json::Value> {
    let config = context.agents.get(id)?;
    Ok(json!({
        "id": id,
        "runtimeKind": config.runtime_kind,
        "runtimeConfig": config.runtime_config,
    }))
}

/// Probe every registered runtime kind. Presence is checked first; the
/// version is probed only for present executables, and a version probe
/// failure degrades to a null version rather than failing discovery.
pub(crate) fn discovery_value(
    context: &CommandContext,
    cancel: &CancelToken,
) -> Result<serde_json::Value> {
    let mut items = Vec::new();
    for kind in context.registry.list() {
        cancel.check()?;
        let runtime = context.registry.get(kind)?;

        let found = runtime.discovery(cancel)?;
        let version = if found {
            match runtime.get_info(cancel) {
                Ok(info) => Some(info.version),
                Err(e) => {
                    warn!(runtime = %kind, error = %e, "version probe failed");
                    None
                }
            }
        } else {
            None
        };

        items.push(json!({
            "runtime": kind,
            "found": found,
            "version": version,
        }));
    }
    Ok(json!({ "count": items.len(), "items": items }))
}
