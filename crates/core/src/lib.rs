//! # Stepwise Core
//!
//! Domain types, traits, and error definitions for the stepwise agent runtime.
//! This crate has **no transport or storage dependencies**. It defines the
//! contracts that the provider adapters, the agent loop, and embedding
//! applications implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait here: [`Provider`] for LLM backends and [`Tool`]
//! for model-callable capabilities. Implementations live elsewhere, which keeps
//! the orchestration loop protocol-agnostic and easy to test with stubs.

pub mod agent;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, AgentRun, AgentStatus, AgentStep, ValidationResult};
pub use error::{AgentError, AgentErrorCode, ProviderError, ToolError};
pub use message::{Message, Role};
pub use provider::{ChatResponse, Provider};
pub use tool::{
    ParamSpec, ParamType, Tool, ToolArguments, ToolCall, ToolDefinition, ToolRegistry, ToolResult,
};
