//! Agent configuration and run-trace types.

use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

/// Configuration for one agent run.
///
/// Defaults are applied when deserializing, so a partial `[agent]` table
/// only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum provider round-trips that may request tools
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Hard cap on executed tool calls per step; excess calls are dropped
    #[serde(default = "default_max_tool_calls_per_step")]
    pub max_tool_calls_per_step: usize,

    /// Persona text placed at the top of the system prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Run the capped calls of one step concurrently
    #[serde(default)]
    pub parallel_tool_calls: bool,

    /// Token budget used for compaction when the provider does not report one
    #[serde(default = "default_context_token_budget")]
    pub context_token_budget: usize,
}

fn default_max_steps() -> u32 {
    10
}
fn default_max_tool_calls_per_step() -> usize {
    3
}
fn default_temperature() -> f32 {
    0.3
}
fn default_context_token_budget() -> usize {
    16_000
}
fn default_system_prompt() -> String {
    "You are a helpful assistant. Use the available tools to gather facts before answering, \
     and answer concisely once you have what you need."
        .into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_tool_calls_per_step: default_max_tool_calls_per_step(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            parallel_tool_calls: false,
            context_token_budget: default_context_token_budget(),
        }
    }
}

/// State of the orchestration loop, and the tag of each recorded step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Planning,
    ExecutingTools,
    Validating,
    Complete,
    MaxStepsReached,
    Cancelled,
    Error,
}

impl AgentStatus {
    /// Whether a run in this status is finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::MaxStepsReached | Self::Cancelled | Self::Error
        )
    }
}

/// Outcome of validating one step's tool results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            is_valid: issues.is_empty(),
            issues,
        }
    }

    pub fn needs_refinement(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// One provider round-trip plus the tool execution and validation it triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    /// 1-based, strictly increasing within a run
    pub step_number: u32,
    pub status: AgentStatus,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub tool_results: Vec<ToolResult>,
    #[serde(default)]
    pub validation: Option<ValidationResult>,
    #[serde(default)]
    pub response: Option<String>,
    pub duration_ms: u64,
}

/// The structured trace of one agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: String,
    pub query: String,
    pub steps: Vec<AgentStep>,
    pub final_response: Option<String>,
    pub status: AgentStatus,
    pub total_duration_ms: u64,
}

impl AgentRun {
    /// Start a fresh run for `query`.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.into(),
            steps: Vec::new(),
            final_response: None,
            status: AgentStatus::Planning,
            total_duration_ms: 0,
        }
    }

    /// Number of tool calls executed across all steps.
    pub fn tool_calls_made(&self) -> usize {
        self.steps.iter().map(|s| s.tool_results.len()).sum()
    }
}
