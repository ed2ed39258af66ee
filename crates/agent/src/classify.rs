//! Provider failure classification.
//!
//! Maps any raw failure into exactly one [`AgentErrorCode`]. Classification
//! is pure and total: every input yields a code, `unknown` when nothing
//! matches. Rules are checked in order and the first match wins:
//!
//! | # | Condition | Code |
//! |---|-----------|------|
//! | 1 | no response at all, or network vocabulary | `network_error` |
//! | 2 | status 401 / 403 | `auth_error` |
//! | 3 | status 429, or rate-limit vocabulary | `rate_limit` |
//! | 4 | status 413, or context-length vocabulary | `token_limit` |
//! | 5 | status >= 500 | `server_error` |
//! | 6 | anything else | `unknown` |

use regex_lite::Regex;
use std::sync::LazyLock;
use stepwise_core::{AgentError, AgentErrorCode, ProviderError};

/// Cooldown suggested when a rate limit carries no parseable delay.
pub const DEFAULT_RETRY_AFTER_MS: u64 = 60_000;

const NETWORK_VOCABULARY: &[&str] = &[
    "network",
    "fetch failed",
    "failed to fetch",
    "connection refused",
    "connection reset",
    "connection closed",
    "econnrefused",
    "econnreset",
    "enotfound",
    "etimedout",
    "socket hang up",
    "dns error",
    "timed out",
    "timeout",
];

const RATE_LIMIT_VOCABULARY: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "quota exceeded",
];

const TOKEN_LIMIT_VOCABULARY: &[&str] = &[
    "too large",
    "context length exceeded",
    "context_length_exceeded",
    "maximum context length",
    "token",
];

static RETRY_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"try again in\s*(?:(?P<ms>\d+(?:\.\d+)?)ms|(?:(?P<m>\d+(?:\.\d+)?)m)?(?:(?P<s>\d+(?:\.\d+)?)s)?)",
    )
    .expect("retry pattern is valid")
});

static CONTEXT_BUDGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"maximum context length is\s*(\d+)\s*tokens").expect("budget pattern is valid")
});

// "prompt is too long: 210000 tokens > 200000 maximum"
static PROMPT_TOO_LONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\s*tokens\s*>\s*(\d+)\s*maximum").expect("limit pattern is valid")
});

static EMBEDDED_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\b)(?:status(?:\s*code)?|http)\s*[:=]?\s*(\d{3})\b|^\s*(\d{3})\b")
        .expect("status pattern is valid")
});

/// Classify a provider failure.
pub fn classify(failure: &ProviderError) -> AgentError {
    match failure {
        ProviderError::Network(_) | ProviderError::Timeout(_) => {
            AgentError::new(AgentErrorCode::NetworkError, failure.to_string())
        }
        ProviderError::Http {
            status,
            body,
            retry_after_secs,
        } => classify_parts(
            Some(*status),
            body,
            retry_after_secs.map(|s| s.saturating_mul(1000)),
            failure.to_string(),
        ),
        ProviderError::InvalidResponse(text) | ProviderError::NotConfigured(text) => {
            classify_parts(None, text, None, failure.to_string())
        }
    }
}

/// Classify any error value, downcasting to [`ProviderError`] when possible
/// and otherwise falling back to its message text.
pub fn classify_error(err: &(dyn std::error::Error + 'static)) -> AgentError {
    if let Some(provider_error) = err.downcast_ref::<ProviderError>() {
        return classify(provider_error);
    }
    if let Some(already) = err.downcast_ref::<AgentError>() {
        return already.clone();
    }
    classify_message(&err.to_string())
}

/// Classify a bare failure message, extracting an embedded HTTP status
/// ("status: 429", "HTTP 503", "401 Unauthorized") if there is one.
pub fn classify_message(message: &str) -> AgentError {
    let status = extract_status(message);
    classify_parts(status, message, None, message.to_string())
}

fn classify_parts(
    status: Option<u16>,
    text: &str,
    header_retry_ms: Option<u64>,
    raw: String,
) -> AgentError {
    let lower = text.to_lowercase();

    if contains_any(&lower, NETWORK_VOCABULARY) {
        return AgentError::new(AgentErrorCode::NetworkError, raw);
    }

    if matches!(status, Some(401 | 403)) {
        return AgentError::new(AgentErrorCode::AuthError, raw);
    }

    if status == Some(429) || contains_any(&lower, RATE_LIMIT_VOCABULARY) {
        let retry_ms = parse_retry_after_ms(&lower)
            .or(header_retry_ms)
            .unwrap_or(DEFAULT_RETRY_AFTER_MS);
        return AgentError::new(AgentErrorCode::RateLimit, raw).with_retry_after_ms(retry_ms);
    }

    if status == Some(413) || contains_any(&lower, TOKEN_LIMIT_VOCABULARY) {
        let err = AgentError::new(AgentErrorCode::TokenLimit, raw);
        return match parse_context_budget(&lower) {
            Some(budget) => err.with_token_budget(budget),
            None => err,
        };
    }

    if status.is_some_and(|s| s >= 500) {
        return AgentError::new(AgentErrorCode::ServerError, raw);
    }

    AgentError::new(AgentErrorCode::Unknown, raw)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn extract_status(message: &str) -> Option<u16> {
    let lower = message.to_lowercase();
    let caps = EMBEDDED_STATUS.captures(&lower)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse "try again in 20s", "try again in 1m20.556s", "try again in 500ms".
///
/// Expects lowercase input.
pub fn parse_retry_after_ms(text: &str) -> Option<u64> {
    let caps = RETRY_IN.captures(text)?;
    let number = |name: &str| -> Option<f64> { caps.name(name)?.as_str().parse().ok() };

    let ms = match (number("ms"), number("m"), number("s")) {
        (Some(ms), _, _) => ms,
        (None, None, None) => return None,
        (None, minutes, seconds) => {
            minutes.unwrap_or(0.0) * 60_000.0 + seconds.unwrap_or(0.0) * 1000.0
        }
    };
    Some(ms.round() as u64)
}

/// Parse "maximum context length is 4097 tokens" or
/// "210000 tokens > 200000 maximum".
fn parse_context_budget(text: &str) -> Option<usize> {
    [&*CONTEXT_BUDGET, &*PROMPT_TOO_LONG]
        .into_iter()
        .find_map(|pattern| pattern.captures(text)?.get(1)?.as_str().parse().ok())
}
