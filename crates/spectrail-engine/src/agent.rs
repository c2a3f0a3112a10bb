//! The bounded tool-calling loop.
//!
//! Drives a chat provider through at most twelve assistant turns, executing
//! requested tools strictly sequentially in the order the provider returned
//! them, and persisting every step to the run log as it happens. Two caps
//! bound every run: the assistant-turn cap and the context-size cap. Both are
//! reported to the caller through `LoopOutcome::truncated`.

use crate::llm::client::ChatCompletion;
use crate::llm::types::{AssistantTurn, ChatMessage};
use crate::tools::bound::bound_str;
use crate::tools::registry::{tool_schemas, ToolExecutor};
use serde_json::{json, Value};
use spectrail_core::{Role, WorkbenchError};
use spectrail_store::Store;
use tracing::{debug, info, warn};

/// Provider round trips per run, hard cap.
pub const MAX_ASSISTANT_TURNS: usize = 12;

/// When the summed character length of all message contents exceeds this,
/// the transcript is pruned before the next provider call.
pub const MAX_CONTEXT_CHARS: usize = 100_000;

/// How many trailing messages survive a prune (plus the system message).
pub const RETAINED_TAIL_MESSAGES: usize = 6;

/// Byte cap on a single tool message fed back to the provider.
pub const TOOL_MESSAGE_CAP_BYTES: usize = 20_000;

/// Byte cap on the result column of a persisted tool-call row.
const TOOL_ROW_CAP_BYTES: usize = 200_000;

const TURN_CAP_FALLBACK: &str =
    "Reached the maximum number of assistant turns before a final answer was produced.";

const TRUNCATION_NOTE: &str =
    "**Note**: This output was truncated: the run hit its iteration or context limit before completing normally.";

#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub final_content: String,
    pub tool_calls_count: usize,
    pub truncated: bool,
}

fn context_chars(messages: &[ChatMessage]) -> usize {
    messages.iter().map(ChatMessage::content_chars).sum()
}

/// Retain the system message and the last `RETAINED_TAIL_MESSAGES` messages,
/// then clip surviving contents so the total stays within budget. Pruned
/// content is gone for good; the durable log keeps the full history.
fn prune_context(messages: &mut Vec<ChatMessage>) {
    if messages.len() > RETAINED_TAIL_MESSAGES + 1 {
        let tail_start = messages.len() - RETAINED_TAIL_MESSAGES;
        let mut pruned = Vec::with_capacity(RETAINED_TAIL_MESSAGES + 1);
        pruned.push(messages[0].clone());
        pruned.extend(messages[tail_start..].iter().cloned());
        *messages = pruned;
    }

    if context_chars(messages) <= MAX_CONTEXT_CHARS {
        return;
    }
    let per_message = MAX_CONTEXT_CHARS / messages.len().max(1);
    for message in messages.iter_mut() {
        if let Some(content) = message.content.as_ref() {
            if content.chars().count() > per_message {
                let bounded = bound_str(content, per_message);
                message.content = Some(bounded.text);
            }
        }
    }
}

fn assistant_log_content(turn: &AssistantTurn) -> String {
    match turn.content.as_deref().filter(|c| !c.is_empty()) {
        Some(content) => content.to_string(),
        None => {
            let names: Vec<&str> = turn
                .tool_calls
                .iter()
                .map(|call| call.function.name.as_str())
                .collect();
            format!("Calling tools: {}", names.join(", "))
        }
    }
}

/// Inject `project_id` when the model omitted it; models frequently drop the
/// one argument that is the same on every call.
fn ensure_project_id(args: &mut Value, project_id: &str) {
    if let Some(object) = args.as_object_mut() {
        object
            .entry("project_id".to_string())
            .or_insert_with(|| json!(project_id));
    }
}

/// Run the loop to completion over an already-open run. Seed messages are
/// persisted first; the caller owns artifact emission and run closing.
pub async fn drive<P: ChatCompletion>(
    provider: &P,
    executor: &ToolExecutor,
    store: &Store,
    run_id: &str,
    project_id: &str,
    seed: Vec<ChatMessage>,
) -> Result<LoopOutcome, WorkbenchError> {
    for message in &seed {
        let role = match message.role.as_str() {
            "system" => Role::System,
            _ => Role::User,
        };
        store.append_message(run_id, role, message.content.as_deref().unwrap_or_default())?;
    }

    let tools = tool_schemas();
    let mut messages = seed;
    let mut tool_calls_count = 0usize;
    let mut truncated = false;
    let mut last_content: Option<String> = None;

    for turn_index in 0..MAX_ASSISTANT_TURNS {
        if context_chars(&messages) > MAX_CONTEXT_CHARS {
            info!(run_id, turn = turn_index, "context over budget, pruning");
            prune_context(&mut messages);
            truncated = true;
        }

        let turn = provider.complete(&messages, &tools).await?;

        if !turn.has_tool_calls() {
            let content = turn.content.unwrap_or_default();
            store.append_message(run_id, Role::Assistant, &content)?;
            info!(run_id, turns = turn_index + 1, tool_calls_count, "loop finished with final answer");
            return Ok(LoopOutcome {
                final_content: content,
                tool_calls_count,
                truncated,
            });
        }

        store.append_message(run_id, Role::Assistant, &assistant_log_content(&turn))?;
        messages.push(ChatMessage::assistant(
            turn.content.clone(),
            Some(turn.tool_calls.clone()),
        ));
        last_content = turn.content.clone().filter(|c| !c.is_empty()).or(last_content);

        // Strictly sequential, in returned order: the transcript and the
        // provider's tool_call_id pairing must stay aligned.
        for call in &turn.tool_calls {
            let name = call.function.name.as_str();
            let mut args: Value = match serde_json::from_str(&call.function.arguments) {
                Ok(value) => value,
                Err(err) => json!({ "_unparsed": err.to_string() }),
            };
            ensure_project_id(&mut args, project_id);

            let result = match executor.execute(name, &args).await {
                Ok(value) => value,
                Err(err) if err.is_fatal() => {
                    warn!(run_id, tool = name, error = %err, "fatal tool failure, aborting run");
                    return Err(WorkbenchError::RepoUnavailable(err.to_string()));
                }
                Err(err) => {
                    debug!(run_id, tool = name, error = %err, "tool failed, returning error payload");
                    err.to_payload()
                }
            };

            let result_json = result.to_string();
            let row_json = bound_str(&result_json, TOOL_ROW_CAP_BYTES).text;
            let message_content = bound_str(&result_json, TOOL_MESSAGE_CAP_BYTES).text;

            store.append_tool_step(
                run_id,
                name,
                &args.to_string(),
                &row_json,
                &message_content,
            )?;
            messages.push(ChatMessage::tool(message_content, call.id.clone()));
            tool_calls_count += 1;
        }
    }

    // Turn cap reached: emit whatever exists, flagged, without another call.
    warn!(run_id, tool_calls_count, "assistant-turn cap reached, forcing artifact emission");
    let base = last_content.unwrap_or_else(|| TURN_CAP_FALLBACK.to_string());
    Ok(LoopOutcome {
        final_content: format!("{base}\n\n---\n\n{TRUNCATION_NOTE}"),
        tool_calls_count,
        truncated: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, chars: usize) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: Some("x".repeat(chars)),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    #[test]
    fn prune_keeps_system_plus_tail() {
        let mut messages = vec![msg("system", 10)];
        for i in 0..10 {
            let mut m = msg("user", 10);
            m.content = Some(format!("m{i}"));
            messages.push(m);
        }
        prune_context(&mut messages);
        assert_eq!(messages.len(), RETAINED_TAIL_MESSAGES + 1);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages.last().unwrap().content.as_deref(), Some("m9"));
    }

    #[test]
    fn prune_clips_oversized_survivors() {
        let mut messages = vec![msg("system", 100), msg("user", 200_000)];
        prune_context(&mut messages);
        assert!(context_chars(&messages) <= MAX_CONTEXT_CHARS);
    }

    #[test]
    fn small_transcripts_are_left_alone() {
        let mut messages = vec![msg("system", 100), msg("user", 100)];
        let before: Vec<_> = messages.iter().map(|m| m.content.clone()).collect();
        prune_context(&mut messages);
        let after: Vec<_> = messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn assistant_log_falls_back_to_tool_names() {
        use crate::llm::types::{FunctionCallMessage, ToolCallMessage};
        let turn = AssistantTurn {
            content: None,
            tool_calls: vec![ToolCallMessage {
                id: "c1".into(),
                call_type: "function".into(),
                function: FunctionCallMessage {
                    name: "list_files".into(),
                    arguments: "{}".into(),
                },
            }],
        };
        assert_eq!(assistant_log_content(&turn), "Calling tools: list_files");
    }

    #[test]
    fn project_id_is_injected_but_not_overwritten() {
        let mut args = json!({ "path": "src" });
        ensure_project_id(&mut args, "p-1");
        assert_eq!(args["project_id"], "p-1");

        let mut args = json!({ "project_id": "explicit" });
        ensure_project_id(&mut args, "p-1");
        assert_eq!(args["project_id"], "explicit");
    }
}
