//! Progressive, budget-driven history compaction.

use serde_json::Value;
use stepwise_core::{Message, Role};
use tracing::debug;

use super::token::{estimate_message_tokens, estimate_messages_tokens};

/// Replaces tool output once truncation is not enough.
pub const TOOL_OUTPUT_PLACEHOLDER: &str = "[tool output omitted to fit context window]";

const TRUNCATION_MARKER: &str = "… [truncated]";

#[derive(Debug, Clone, Copy)]
enum Stage {
    TruncateToolOutput(usize),
    OmitToolOutput,
    KeepFromUserTurn(usize),
}

const STAGES: [Stage; 5] = [
    Stage::TruncateToolOutput(500),
    Stage::TruncateToolOutput(200),
    Stage::OmitToolOutput,
    Stage::KeepFromUserTurn(2),
    Stage::KeepFromUserTurn(1),
];

impl Stage {
    fn apply(self, messages: &[Message]) -> Vec<Message> {
        match self {
            Self::TruncateToolOutput(limit) => messages
                .iter()
                .map(|m| shrink_tool_message(m, |text| truncate_chars(text, limit)))
                .collect(),
            Self::OmitToolOutput => messages
                .iter()
                .map(|m| shrink_tool_message(m, |_| TOOL_OUTPUT_PLACEHOLDER.to_string()))
                .collect(),
            Self::KeepFromUserTurn(nth_from_end) => keep_from_user_turn(messages, nth_from_end),
        }
    }
}

/// Token count compaction aims for: 80% of the budget, leaving headroom for
/// the response.
pub fn compaction_target(token_budget: usize) -> usize {
    token_budget.saturating_mul(4) / 5
}

/// Compact `messages` to fit within 80% of `token_budget`.
///
/// Returns the messages unchanged when they already fit, and `None` when
/// even the most aggressive stage cannot fit them (or the system message
/// alone is over the target).
pub fn compact_messages(messages: &[Message], token_budget: usize) -> Option<Vec<Message>> {
    let target = compaction_target(token_budget);

    let system_tokens = messages
        .first()
        .filter(|m| m.role == Role::System)
        .map(estimate_message_tokens)
        .unwrap_or(0);
    if system_tokens > target {
        debug!(system_tokens, target, "System prompt alone exceeds compaction target");
        return None;
    }

    let initial = estimate_messages_tokens(messages);
    if initial <= target {
        return Some(messages.to_vec());
    }

    let mut current = messages.to_vec();
    for (index, stage) in STAGES.iter().enumerate() {
        current = stage.apply(&current);
        let tokens = estimate_messages_tokens(&current);
        debug!(stage = index + 1, tokens, target, "Applied compaction stage");
        if tokens <= target {
            debug!(before = initial, after = tokens, "Compaction succeeded");
            return Some(current);
        }
    }

    debug!(target, "Compaction exhausted all stages");
    None
}

/// Rewrite a tool-role message's content and each of its results with `f`.
/// Other roles pass through untouched.
fn shrink_tool_message(message: &Message, f: impl Fn(&str) -> String) -> Message {
    if message.role != Role::Tool {
        return message.clone();
    }
    let mut shrunk = message.clone();
    shrunk.content = f(&message.content);
    for result in &mut shrunk.tool_results {
        if let Some(error) = result.error.take() {
            result.error = Some(f(&error));
        } else {
            result.result = Some(Value::String(f(&result.render())));
        }
    }
    shrunk
}

/// Cap `text` at `limit` characters, marker included.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Keep the system message plus everything from the start of the
/// `nth_from_end` user turn (1 = last). With fewer user turns than that,
/// cut at the first one.
fn keep_from_user_turn(messages: &[Message], nth_from_end: usize) -> Vec<Message> {
    let (system, rest) = match messages.split_first() {
        Some((first, rest)) if first.role == Role::System => (Some(first), rest),
        _ => (None, messages),
    };

    let user_turns: Vec<usize> = rest
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role == Role::User)
        .map(|(i, _)| i)
        .collect();

    let start = user_turns
        .len()
        .checked_sub(nth_from_end)
        .and_then(|i| user_turns.get(i))
        .or_else(|| user_turns.first())
        .copied()
        .unwrap_or(0);

    system.into_iter().chain(&rest[start..]).cloned().collect()
}
