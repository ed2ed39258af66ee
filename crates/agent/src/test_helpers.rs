//! Shared test helpers for loop tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use stepwise_core::{
    ChatResponse, Message, ParamSpec, ParamType, Provider, ProviderError, Tool, ToolArguments,
    ToolCall, ToolDefinition, ToolError,
};

/// One scripted provider turn.
pub enum Turn {
    Reply(ChatResponse),
    Fail(ProviderError),
    /// Never resolves; used to exercise cancellation.
    Hang,
}

/// What the loop sent on one provider call.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub temperature: f32,
}

/// A mock provider that plays back a script of turns.
///
/// Once the script runs out it repeats `fallback` if one was given and
/// panics otherwise.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<Turn>>,
    fallback: Option<ChatResponse>,
    requests: Mutex<Vec<CapturedRequest>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Turn::Reply(ChatResponse::text(text))])
    }

    /// Create a provider that first requests tools, then answers.
    pub fn tool_then_answer(calls: Vec<ToolCall>, answer: &str) -> Self {
        Self::new(vec![
            Turn::Reply(tool_response("", calls)),
            Turn::Reply(ChatResponse::text(answer)),
        ])
    }

    /// Create a provider that gives the same response forever.
    pub fn repeating(response: ChatResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> CapturedRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        temperature: f32,
    ) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(CapturedRequest {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            temperature,
        });

        let turn = self.turns.lock().unwrap().pop_front();
        match turn {
            Some(Turn::Reply(response)) => Ok(response),
            Some(Turn::Fail(error)) => Err(error),
            Some(Turn::Hang) => std::future::pending().await,
            None => match &self.fallback {
                Some(response) => Ok(response.clone()),
                None => panic!(
                    "ScriptedProvider: no more responses (call #{})",
                    self.call_count()
                ),
            },
        }
    }
}

/// A response requesting `calls`, with optional thought text.
pub fn tool_response(content: &str, calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        content: content.into(),
        tool_calls: calls,
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args.as_object().cloned().unwrap_or_default(),
    }
}

pub fn http_error(status: u16, body: &str) -> ProviderError {
    ProviderError::Http {
        status,
        body: body.into(),
        retry_after_secs: None,
    }
}

enum Behavior {
    Echo,
    Fail,
    Empty,
    Sleep,
}

/// A tool with canned behaviour.
pub struct StubTool {
    definition: ToolDefinition,
    behavior: Behavior,
}

impl StubTool {
    fn with(name: &str, behavior: Behavior, parameters: Vec<ParamSpec>) -> Self {
        Self {
            definition: ToolDefinition {
                name: name.into(),
                description: format!("Test tool {name}"),
                parameters,
            },
            behavior,
        }
    }

    /// Returns its arguments as an object.
    pub fn echo(name: &str) -> Self {
        Self::with(
            name,
            Behavior::Echo,
            vec![ParamSpec::new("text", ParamType::String, "Text to echo", false)],
        )
    }

    /// Always fails.
    pub fn failing(name: &str) -> Self {
        Self::with(name, Behavior::Fail, Vec::new())
    }

    /// Always returns an empty list.
    pub fn empty(name: &str) -> Self {
        Self::with(name, Behavior::Empty, Vec::new())
    }

    /// Sleeps for `ms` milliseconds, then returns `ms`.
    pub fn sleeper(name: &str) -> Self {
        Self::with(
            name,
            Behavior::Sleep,
            vec![ParamSpec::new("ms", ParamType::Number, "Delay", true)],
        )
    }
}

#[async_trait]
impl Tool for StubTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<Value, ToolError> {
        match self.behavior {
            Behavior::Echo => Ok(Value::Object(arguments)),
            Behavior::Fail => Err(ToolError::ExecutionFailed {
                tool_name: self.definition.name.clone(),
                reason: "upstream unavailable".into(),
            }),
            Behavior::Empty => Ok(json!([])),
            Behavior::Sleep => {
                let ms = arguments
                    .get("ms")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| ToolError::InvalidArguments("ms is required".into()))?;
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(json!(ms))
            }
        }
    }
}
