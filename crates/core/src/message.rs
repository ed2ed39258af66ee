//! Message domain types.
//!
//! A run's conversation is a plain `Vec<Message>`; insertion order is the
//! prompt, so nothing in the runtime ever reorders it.

use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (persona, tool list)
    System,
    /// The end user, or a synthetic steering hint
    User,
    /// The model
    Assistant,
    /// Tool execution results
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Results of executed tool calls (tool-role messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(Role::Assistant, content)
        }
    }

    /// Create a tool-role message carrying every result of one step.
    ///
    /// `content` is the human-readable summary; adapters that need one wire
    /// message per result read `tool_results` instead.
    pub fn tool_results(content: impl Into<String>, tool_results: Vec<ToolResult>) -> Self {
        Self {
            tool_results,
            ..Self::with_role(Role::Tool, content)
        }
    }

    /// Number of characters in the content.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("What's my allocation?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "What's my allocation?");
        assert!(msg.tool_calls.is_empty());
        assert!(msg.tool_results.is_empty());
    }

    #[test]
    fn assistant_with_tools_keeps_calls() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "get_holdings".into(),
            arguments: serde_json::Map::new(),
        };
        let msg = Message::assistant_with_tools("", vec![call]);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls.len(), 1);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Tool).unwrap();
        assert_eq!(json, "\"tool\"");
    }

    #[test]
    fn char_count_counts_chars_not_bytes() {
        let msg = Message::user("héllo");
        assert_eq!(msg.char_count(), 5);
    }
}
