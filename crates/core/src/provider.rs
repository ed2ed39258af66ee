//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation plus the available tool
//! definitions to an LLM and normalize the reply into text and tool calls.
//! Each wire protocol is a separate implementation; the agent loop never
//! branches on which one it is talking to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::{ToolCall, ToolDefinition};

/// A normalized provider reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Assistant text (may be empty when only tool calls were returned)
    pub content: String,

    /// Tool calls requested by the model
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// The core Provider trait.
///
/// Implementations must return a typed [`ProviderError`] whenever the wire
/// call does not succeed, carrying the HTTP status and body text when there
/// was a response.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Send the conversation and get a normalized response.
    ///
    /// An empty `tools` slice means no tools are offered for this call.
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        temperature: f32,
    ) -> Result<ChatResponse, ProviderError>;
}
