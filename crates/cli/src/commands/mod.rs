//! Subcommand implementations and the setup they share.

pub mod chat;
pub mod config_cmd;
pub mod run;

use std::path::Path;
use std::sync::Arc;
use stepwise_agent::{AgentCallbacks, AgentLoop};
use stepwise_config::{AppConfig, ConfigError};
use stepwise_core::{AgentError, AgentErrorCode, AgentStep, ProviderError};
use stepwise_providers::ProviderRouter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Load config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_with_env(path, |key| std::env::var(key).ok()),
        None => AppConfig::load(),
    }
}

/// Build the agent loop from config: provider, demo tools and hooks.
pub fn build_agent(config: &AppConfig) -> Result<AgentLoop, Box<dyn std::error::Error>> {
    let router = match ProviderRouter::from_config(&config.provider) {
        Ok(router) => router,
        Err(ProviderError::NotConfigured(reason)) => {
            print_key_help(config);
            return Err(reason.into());
        }
        Err(e) => return Err(e.into()),
    };
    let provider = router
        .default_provider()
        .ok_or("No default provider configured")?;

    let tools = Arc::new(stepwise_tools::default_registry());
    let callbacks = AgentCallbacks::new()
        .on_status_change(|status| tracing::debug!(?status, "Agent status"))
        .on_step_update(print_step)
        .on_compaction(|| eprintln!("  (conversation compacted to fit the context window)"));

    Ok(AgentLoop::new(provider, tools)
        .with_config(config.agent.clone())
        .with_callbacks(callbacks))
}

fn print_key_help(config: &AppConfig) {
    eprintln!();
    eprintln!("  ERROR: No API key configured for '{}'!", config.provider.kind);
    eprintln!();
    eprintln!("  Set STEPWISE_API_KEY (or the provider's own variable, e.g. OPENAI_API_KEY),");
    eprintln!("  or add `api_key` under [provider] in:");
    eprintln!("    {}", AppConfig::config_path().display());
    eprintln!();
}

/// One line per tool step on stderr.
fn print_step(step: &AgentStep) {
    if step.tool_calls.is_empty() {
        return;
    }
    let names: Vec<&str> = step.tool_calls.iter().map(|c| c.name.as_str()).collect();
    eprintln!("  [step {}] {} ({} ms)", step.step_number, names.join(", "), step.duration_ms);
    if let Some(validation) = step.validation.as_ref().filter(|v| !v.is_valid) {
        for issue in &validation.issues {
            eprintln!("    ! {issue}");
        }
    }
}

/// Print a classified failure the way users should see it.
pub fn report_error(error: &AgentError) {
    tracing::debug!(code = %error.code, raw = %error.raw, "Agent error");
    eprintln!("Error: {}", error.message);
    if let Some(secs) = cooldown_secs(error) {
        eprintln!("Try again in {secs}s.");
    }
}

/// Suggested wait, in whole seconds rounded up, for rate limits.
pub fn cooldown_secs(error: &AgentError) -> Option<u64> {
    if error.code != AgentErrorCode::RateLimit {
        return None;
    }
    error.retry_after_ms.map(|ms| ms.div_ceil(1000))
}

/// Cancellation token that fires on Ctrl-C while this guard lives.
pub struct CtrlC {
    token: CancellationToken,
    watcher: JoinHandle<()>,
}

impl CtrlC {
    pub fn arm() -> Self {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                trigger.cancel();
            }
        });
        Self { token, watcher }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for CtrlC {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_rounds_up() {
        let err = AgentError::new(AgentErrorCode::RateLimit, "").with_retry_after_ms(80_556);
        assert_eq!(cooldown_secs(&err), Some(81));
    }

    #[test]
    fn no_cooldown_for_other_codes() {
        let err = AgentError::new(AgentErrorCode::ServerError, "").with_retry_after_ms(1000);
        assert_eq!(cooldown_secs(&err), None);
    }

    #[test]
    fn missing_key_fails_to_build() {
        let mut config = AppConfig::default();
        config.provider.kind = "openai".into();
        config.provider.api_key = None;
        assert!(build_agent(&config).is_err());
    }

    #[test]
    fn local_provider_builds_without_key() {
        let mut config = AppConfig::default();
        config.provider.kind = "ollama".into();
        config.provider.api_key = None;
        let agent = build_agent(&config).unwrap();
        assert_eq!(agent.config(), &config.agent);
    }
}
