//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly (not an OpenAI-compatible proxy).
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stepwise_core::message::{Message, Role};
use stepwise_core::provider::{ChatResponse, Provider};
use stepwise_core::tool::{ToolCall, ToolDefinition};
use stepwise_core::ProviderError;
use tracing::debug;

use crate::http;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client: http::build_client(http::DEFAULT_TIMEOUT)?,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Replace the HTTP client with one using `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = http::build_client(timeout)?;
        Ok(self)
    }

    /// Extract system messages from the message list.
    /// Anthropic puts system prompt as a top-level field, not in messages.
    fn extract_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut non_system: Vec<&Message> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                _ => non_system.push(msg),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system, non_system)
    }

    /// Convert messages to Anthropic API format with content blocks.
    fn to_api_messages(messages: &[&Message]) -> Vec<AnthropicMessage> {
        let mut result = Vec::new();

        for msg in messages {
            match msg.role {
                // The messages API rejects empty text content
                Role::User | Role::Assistant
                    if msg.content.is_empty() && msg.tool_calls.is_empty() =>
                {
                    continue;
                }
                Role::User => {
                    result.push(AnthropicMessage {
                        role: "user".into(),
                        content: AnthropicContent::Text(msg.content.clone()),
                    });
                }
                Role::Assistant if msg.tool_calls.is_empty() => {
                    // A lone text block goes out as a bare string
                    result.push(AnthropicMessage {
                        role: "assistant".into(),
                        content: AnthropicContent::Text(msg.content.clone()),
                    });
                }
                Role::Assistant => {
                    let mut blocks: Vec<ContentBlock> = Vec::new();
                    if !msg.content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: msg.content.clone(),
                        });
                    }
                    for tc in &msg.tool_calls {
                        blocks.push(ContentBlock::ToolUse {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input: serde_json::Value::Object(tc.arguments.clone()),
                        });
                    }
                    result.push(AnthropicMessage {
                        role: "assistant".into(),
                        content: AnthropicContent::Blocks(blocks),
                    });
                }
                Role::Tool => {
                    // Tool results travel as a user message of tool_result blocks
                    let blocks = if msg.tool_results.is_empty() {
                        vec![ContentBlock::Text {
                            text: msg.content.clone(),
                        }]
                    } else {
                        msg.tool_results
                            .iter()
                            .map(|r| ContentBlock::ToolResult {
                                tool_use_id: r.tool_call_id.clone(),
                                content: r.render(),
                                is_error: r.error.is_some().then_some(true),
                            })
                            .collect()
                    };
                    result.push(AnthropicMessage {
                        role: "user".into(),
                        content: AnthropicContent::Blocks(blocks),
                    });
                }
                Role::System => {} // handled separately
            }
        }

        result
    }

    /// Convert tool definitions to Anthropic format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.json_schema(),
            })
            .collect()
    }

    fn build_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        temperature: f32,
    ) -> serde_json::Value {
        let (system, messages) = Self::extract_system(messages);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(&messages),
            "max_tokens": self.max_tokens,
            "temperature": temperature,
        });

        if let Some(ref sys) = system {
            body["system"] = serde_json::json!(sys);
        }

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(tools));
        }

        body
    }

    /// Convert an Anthropic API response to a normalized reply.
    fn parse_response(resp: AnthropicResponse) -> ChatResponse {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in resp.content {
            match block {
                ResponseContentBlock::Text { text } => {
                    if !content.is_empty() {
                        content.push('\n');
                    }
                    content.push_str(&text);
                }
                ResponseContentBlock::ToolUse { id, name, input } => {
                    let arguments = match input {
                        serde_json::Value::Object(map) => map,
                        _ => serde_json::Map::new(),
                    };
                    tool_calls.push(ToolCall {
                        id: if id.is_empty() {
                            format!("toolu_{}", uuid::Uuid::new_v4().simple())
                        } else {
                            id
                        },
                        name,
                        arguments,
                    });
                }
                ResponseContentBlock::Other => {}
            }
        }

        ChatResponse {
            content,
            tool_calls,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        temperature: f32,
    ) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_body(messages, tools, temperature);

        debug!(
            provider = "anthropic",
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending messages request"
        );

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body);

        let response: AnthropicResponse = http::send_json(&self.name, request).await?;
        Ok(Self::parse_response(response))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ResponseContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::tool::{ParamSpec, ParamType, ToolResult};

    fn tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: args.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test").unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(provider.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = AnthropicProvider::new("sk-ant-test")
            .unwrap()
            .with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn system_extraction() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("Hi!"),
        ];

        let (system, non_system) = AnthropicProvider::extract_system(&messages);
        assert_eq!(system.as_deref(), Some("You are helpful"));
        assert_eq!(non_system.len(), 2);
        assert_eq!(non_system[0].role, Role::User);
        assert_eq!(non_system[1].role, Role::Assistant);
    }

    #[test]
    fn system_extraction_no_system() {
        let messages = vec![Message::user("Hello")];
        let (system, non_system) = AnthropicProvider::extract_system(&messages);
        assert!(system.is_none());
        assert_eq!(non_system.len(), 1);
    }

    #[test]
    fn body_carries_system_out_of_band() {
        let provider = AnthropicProvider::new("k").unwrap();
        let body = provider.build_body(
            &[Message::system("persona"), Message::user("hi")],
            &[],
            0.3,
        );
        assert_eq!(body["system"], "persona");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn text_only_assistant_is_unwrapped() {
        let msg = Message::assistant("Hi!");
        let api_msgs = AnthropicProvider::to_api_messages(&[&msg]);
        assert!(matches!(&api_msgs[0].content, AnthropicContent::Text(t) if t == "Hi!"));
        let json = serde_json::to_value(&api_msgs[0]).unwrap();
        assert_eq!(json["content"], "Hi!");
    }

    #[test]
    fn empty_text_messages_are_skipped() {
        let user = Message::user("What now?");
        let empty = Message::assistant("");
        let next = Message::user("");
        let api_msgs = AnthropicProvider::to_api_messages(&[&user, &empty, &next]);
        assert_eq!(api_msgs.len(), 1);
        assert!(matches!(&api_msgs[0].content, AnthropicContent::Text(t) if t == "What now?"));

        let call_only = Message::assistant_with_tools(
            "",
            vec![tool_call("toolu_1", "get_news", serde_json::json!({}))],
        );
        let api_msgs = AnthropicProvider::to_api_messages(&[&call_only]);
        let json = serde_json::to_value(&api_msgs[0]).unwrap();
        assert_eq!(json["content"].as_array().unwrap().len(), 1);
        assert_eq!(json["content"][0]["type"], "tool_use");
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let msg = Message::assistant_with_tools(
            "Let me look",
            vec![tool_call("toolu_123", "get_news", serde_json::json!({"symbol": "NVDA"}))],
        );

        let api_msgs = AnthropicProvider::to_api_messages(&[&msg]);
        assert_eq!(api_msgs.len(), 1);
        assert_eq!(api_msgs[0].role, "assistant");

        let json = serde_json::to_value(&api_msgs[0]).unwrap();
        let blocks = json["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "text");
        assert_eq!(blocks[1]["type"], "tool_use");
        assert_eq!(blocks[1]["id"], "toolu_123");
        assert_eq!(blocks[1]["input"]["symbol"], "NVDA");
    }

    #[test]
    fn tool_only_assistant_has_no_text_block() {
        let msg = Message::assistant_with_tools(
            "",
            vec![tool_call("toolu_1", "get_holdings", serde_json::json!({}))],
        );
        let json = serde_json::to_value(&AnthropicProvider::to_api_messages(&[&msg])[0]).unwrap();
        let blocks = json["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["type"], "tool_use");
    }

    #[test]
    fn tool_results_pack_into_one_user_message() {
        let msg = Message::tool_results(
            "summary",
            vec![
                ToolResult {
                    tool_call_id: "toolu_1".into(),
                    name: "get_price".into(),
                    result: Some(serde_json::json!(101.5)),
                    error: None,
                    duration_ms: 2,
                },
                ToolResult {
                    tool_call_id: "toolu_2".into(),
                    name: "get_price".into(),
                    result: None,
                    error: Some("timeout".into()),
                    duration_ms: 9,
                },
            ],
        );
        let api_msgs = AnthropicProvider::to_api_messages(&[&msg]);
        assert_eq!(api_msgs.len(), 1);
        assert_eq!(api_msgs[0].role, "user");

        let json = serde_json::to_value(&api_msgs[0]).unwrap();
        let blocks = json["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "tool_result");
        assert_eq!(blocks[0]["tool_use_id"], "toolu_1");
        assert_eq!(blocks[0]["content"], "101.5");
        assert!(blocks[0].get("is_error").is_none());
        assert_eq!(blocks[1]["content"], "Error: timeout");
        assert_eq!(blocks[1]["is_error"], true);
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "get_news".into(),
            description: "Recent headlines".into(),
            parameters: vec![ParamSpec::new("symbol", ParamType::String, "Ticker", true)],
        }];
        let api_tools = AnthropicProvider::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].name, "get_news");
        assert_eq!(api_tools[0].input_schema["type"], "object");
        assert_eq!(api_tools[0].input_schema["required"][0], "symbol");
    }

    #[test]
    fn parse_text_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_01",
                "model": "claude-sonnet-4-20250514",
                "content": [{"type": "text", "text": "Hello!"}],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();

        let parsed = AnthropicProvider::parse_response(resp);
        assert_eq!(parsed.content, "Hello!");
        assert!(parsed.tool_calls.is_empty());
    }

    #[test]
    fn parse_tool_use_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "thinking", "thinking": "hmm"},
                    {"type": "text", "text": "Let me check"},
                    {"type": "tool_use", "id": "toolu_abc", "name": "get_price", "input": {"symbol": "AAPL"}}
                ],
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();

        let parsed = AnthropicProvider::parse_response(resp);
        assert_eq!(parsed.content, "Let me check");
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].id, "toolu_abc");
        assert_eq!(parsed.tool_calls[0].arguments["symbol"], "AAPL");
    }
}
