//! Error types for the stepwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Transport failures are
//! raised as [`ProviderError`]; the agent crate classifies them into the
//! closed [`AgentErrorCode`] taxonomy carried by [`AgentError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed provider round-trip.
///
/// Adapters must map every unsuccessful wire call into one of these variants
/// so the classifier can see the HTTP status and body text.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("HTTP {status}: {body}")]
    Http {
        status: u16,
        body: String,
        /// Value of a numeric `retry-after` header, if the provider sent one.
        retry_after_secs: Option<u64>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// A failed tool lookup or execution.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

/// Closed taxonomy of classified provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentErrorCode {
    TokenLimit,
    RateLimit,
    AuthError,
    NetworkError,
    ServerError,
    Unknown,
}

impl AgentErrorCode {
    /// Wire/trace name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenLimit => "token_limit",
            Self::RateLimit => "rate_limit",
            Self::AuthError => "auth_error",
            Self::NetworkError => "network_error",
            Self::ServerError => "server_error",
            Self::Unknown => "unknown",
        }
    }

    /// The fixed, non-technical message shown to end users for this code.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TokenLimit => {
                "The conversation is too long for the model's context window. Try starting a new conversation or asking a shorter question."
            }
            Self::RateLimit => {
                "The AI provider is rate limiting requests. Please wait a moment and try again."
            }
            Self::AuthError => {
                "Authentication with the AI provider failed. Check your API key in settings."
            }
            Self::NetworkError => {
                "Could not reach the AI provider. Check your network connection and try again."
            }
            Self::ServerError => {
                "The AI provider is having trouble right now. Please try again shortly."
            }
            Self::Unknown => {
                "Something went wrong while talking to the AI provider. Please try again."
            }
        }
    }

    /// Whether the failure can be recovered from without user intervention
    /// (compaction for token limits, a cooldown for rate limits).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TokenLimit | Self::RateLimit)
    }
}

impl std::fmt::Display for AgentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified provider failure.
///
/// `Display` yields only the user-facing message; the provider's own text is
/// kept in `raw` for diagnostics.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AgentError {
    pub code: AgentErrorCode,

    /// User-presentable message, independent of the raw provider text.
    pub message: String,

    /// Suggested cooldown before retrying (rate limits only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,

    /// Context budget reported by the provider (token limits only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_budget: Option<usize>,

    /// The original cause, rendered as text.
    pub raw: String,
}

impl AgentError {
    /// Create an error with the fixed message for `code`.
    pub fn new(code: AgentErrorCode, raw: impl Into<String>) -> Self {
        Self {
            code,
            message: code.user_message().to_string(),
            retry_after_ms: None,
            token_budget: None,
            raw: raw.into(),
        }
    }

    pub fn with_retry_after_ms(mut self, ms: u64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }

    pub fn with_token_budget(mut self, tokens: usize) -> Self {
        self.token_budget = Some(tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::Http {
            status: 429,
            body: "Too many requests".into(),
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "HTTP 429: Too many requests");
        assert!(
            ProviderError::Timeout("deadline elapsed".into())
                .to_string()
                .starts_with("Request timed out")
        );
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = ToolError::ExecutionFailed {
            tool_name: "get_quote".into(),
            reason: "symbol not found".into(),
        };
        assert!(err.to_string().contains("get_quote"));
        assert!(err.to_string().contains("symbol not found"));
    }

    #[test]
    fn agent_error_hides_raw_text() {
        let err = AgentError::new(AgentErrorCode::AuthError, "401 invalid x-api-key sk-secret");
        assert!(!err.to_string().contains("sk-secret"));
        assert_eq!(err.to_string(), AgentErrorCode::AuthError.user_message());
        assert!(err.raw.contains("sk-secret"));
    }

    #[test]
    fn recoverable_codes() {
        assert!(AgentErrorCode::TokenLimit.is_recoverable());
        assert!(AgentErrorCode::RateLimit.is_recoverable());
        assert!(!AgentErrorCode::AuthError.is_recoverable());
        assert!(!AgentErrorCode::Unknown.is_recoverable());
    }

    #[test]
    fn code_serializes_snake_case() {
        let json = serde_json::to_string(&AgentErrorCode::TokenLimit).unwrap();
        assert_eq!(json, "\"token_limit\"");
        assert_eq!(AgentErrorCode::NetworkError.to_string(), "network_error");
    }
}
