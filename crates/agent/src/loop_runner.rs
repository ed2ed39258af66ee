//! The agent reasoning loop implementation.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use stepwise_core::{
    AgentConfig, AgentError, AgentErrorCode, AgentRun, AgentStatus, AgentStep, ChatResponse,
    Message, Provider, ToolCall, ToolDefinition, ToolRegistry, ToolResult,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::callbacks::AgentCallbacks;
use crate::classify::classify;
use crate::context::{compact_messages, estimate_messages_tokens};
use crate::loop_detector::LoopDetector;
use crate::prompt::build_system_prompt;
use crate::validator::{refinement_hint, validate_step};

/// Appended when the step budget runs out, before the tool-less final call.
pub const BEST_EFFORT_INSTRUCTION: &str = "You have reached the maximum number of steps. \
     Provide your best answer now using the information gathered so far.";

/// The orchestration loop: provider calls, tool execution, validation.
///
/// One `AgentLoop` may serve many runs, concurrently or not; all per-run
/// state lives inside the run.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// Tool registry, read-only while runs are in flight
    tools: Arc<ToolRegistry>,

    config: AgentConfig,

    callbacks: AgentCallbacks,
}

impl AgentLoop {
    /// Create a new agent loop with default configuration.
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tools,
            config: AgentConfig::default(),
            callbacks: AgentCallbacks::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach observation hooks.
    pub fn with_callbacks(mut self, callbacks: AgentCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one query to completion.
    ///
    /// Tool failures are recorded in the trace. Provider failures are
    /// returned classified, except token-limit failures that one compaction
    /// pass can recover from.
    pub async fn run(&self, query: &str, history: &[Message]) -> Result<AgentRun, AgentError> {
        self.run_with_cancel(query, history, CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but stops as soon as `cancel` fires.
    ///
    /// The in-flight provider or tool future is dropped, no further hooks
    /// fire, and the partial run comes back with status `cancelled`.
    pub async fn run_with_cancel(
        &self,
        query: &str,
        history: &[Message],
        cancel: CancellationToken,
    ) -> Result<AgentRun, AgentError> {
        let started = Instant::now();
        let mut run = AgentRun::new(query);
        let events = Events {
            callbacks: &self.callbacks,
            cancel: &cancel,
        };

        info!(
            run_id = %run.id,
            history = history.len(),
            max_steps = self.config.max_steps,
            "Starting agent run"
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.drive(&mut run, history, &events) => Some(result),
        };
        run.total_duration_ms = elapsed_ms(started);

        match outcome {
            None => {
                run.status = AgentStatus::Cancelled;
                info!(run_id = %run.id, steps = run.steps.len(), "Agent run cancelled");
                Ok(run)
            }
            Some(Ok(())) => {
                info!(
                    run_id = %run.id,
                    status = ?run.status,
                    steps = run.steps.len(),
                    tool_calls = run.tool_calls_made(),
                    duration_ms = run.total_duration_ms,
                    "Agent run finished"
                );
                Ok(run)
            }
            Some(Err(error)) => {
                warn!(run_id = %run.id, code = %error.code, raw = %error.raw, "Agent run failed");
                Err(error)
            }
        }
    }

    async fn drive(
        &self,
        run: &mut AgentRun,
        history: &[Message],
        events: &Events<'_>,
    ) -> Result<(), AgentError> {
        let config = &self.config;
        let definitions = self.tools.definitions();

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(build_system_prompt(config, &self.tools)));
        messages.extend_from_slice(history);
        messages.push(Message::user(run.query.clone()));

        let mut detector = LoopDetector::new();

        for step_number in 1..=config.max_steps {
            let step_started = Instant::now();
            debug!(step = step_number, messages = messages.len(), "Agent loop iteration");

            run.status = AgentStatus::Planning;
            events.status(AgentStatus::Planning);
            let response = self
                .call_provider(&mut messages, &definitions, events)
                .await?;

            if !response.has_tool_calls() {
                let step = AgentStep {
                    step_number,
                    status: AgentStatus::Complete,
                    tool_calls: Vec::new(),
                    tool_results: Vec::new(),
                    validation: None,
                    response: Some(response.content.clone()),
                    duration_ms: elapsed_ms(step_started),
                };
                events.step(&step);
                run.steps.push(step);
                run.final_response = Some(response.content);
                run.status = AgentStatus::Complete;
                events.status(AgentStatus::Complete);
                return Ok(());
            }

            run.status = AgentStatus::ExecutingTools;
            events.status(AgentStatus::ExecutingTools);

            let ChatResponse {
                content,
                tool_calls: mut calls,
            } = response;
            if calls.len() > config.max_tool_calls_per_step {
                debug!(
                    step = step_number,
                    requested = calls.len(),
                    cap = config.max_tool_calls_per_step,
                    "Dropping tool calls over the per-step cap"
                );
                calls.truncate(config.max_tool_calls_per_step);
            }

            messages.push(Message::assistant_with_tools(content.clone(), calls.clone()));
            let results = self.execute_tools(&calls).await;
            messages.push(Message::tool_results(summarize_results(&results), results.clone()));

            run.status = AgentStatus::Validating;
            events.status(AgentStatus::Validating);
            detector.record(&calls);
            let validation = validate_step(&results, &detector);
            let hint = refinement_hint(&validation);
            if !validation.is_valid {
                debug!(step = step_number, issues = ?validation.issues, "Step needs refinement");
            }

            let step = AgentStep {
                step_number,
                status: AgentStatus::ExecutingTools,
                tool_calls: calls,
                tool_results: results,
                validation: Some(validation),
                response: (!content.is_empty()).then_some(content),
                duration_ms: elapsed_ms(step_started),
            };
            events.step(&step);
            run.steps.push(step);

            if let Some(hint) = hint {
                messages.push(hint);
            }
        }

        warn!(
            max_steps = config.max_steps,
            "Max steps reached, requesting best-effort answer"
        );
        let step_started = Instant::now();
        messages.push(Message::user(BEST_EFFORT_INSTRUCTION));
        run.status = AgentStatus::Planning;
        events.status(AgentStatus::Planning);
        let response = self.call_provider(&mut messages, &[], events).await?;

        let step = AgentStep {
            step_number: config.max_steps + 1,
            status: AgentStatus::MaxStepsReached,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            validation: None,
            response: Some(response.content.clone()),
            duration_ms: elapsed_ms(step_started),
        };
        events.step(&step);
        run.steps.push(step);
        run.final_response = Some(response.content);
        run.status = AgentStatus::MaxStepsReached;
        events.status(AgentStatus::MaxStepsReached);
        Ok(())
    }

    /// One provider round-trip with a single compaction retry on token-limit
    /// failures. On success the compacted history replaces `messages`.
    async fn call_provider(
        &self,
        messages: &mut Vec<Message>,
        tools: &[ToolDefinition],
        events: &Events<'_>,
    ) -> Result<ChatResponse, AgentError> {
        let temperature = self.config.temperature;
        let failure = match self.provider.chat(messages, tools, temperature).await {
            Ok(response) => return Ok(response),
            Err(failure) => failure,
        };

        let error = classify(&failure);
        events.error(&error);
        if error.code != AgentErrorCode::TokenLimit {
            return Err(events.fail(error));
        }

        let budget = error
            .token_budget
            .unwrap_or(self.config.context_token_budget);
        let before = estimate_messages_tokens(messages);
        let compacted = match compact_messages(messages, budget) {
            Some(compacted) if compacted != *messages => compacted,
            _ => {
                warn!(budget, tokens = before, "Context cannot be compacted further");
                return Err(events.fail(error));
            }
        };

        info!(
            budget,
            before,
            after = estimate_messages_tokens(&compacted),
            provider = self.provider.name(),
            "Compacted context after token limit, retrying"
        );
        *messages = compacted;
        events.compaction();

        match self.provider.chat(messages, tools, temperature).await {
            Ok(response) => Ok(response),
            Err(failure) => {
                let error = classify(&failure);
                events.error(&error);
                Err(events.fail(error))
            }
        }
    }

    /// Execute the capped calls of one step. Results come back in call
    /// order whether or not the calls ran concurrently.
    async fn execute_tools(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        if self.config.parallel_tool_calls && calls.len() > 1 {
            return join_all(calls.iter().map(|call| self.execute_tool(call))).await;
        }
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.execute_tool(call).await);
        }
        results
    }

    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        let start = Instant::now();
        let outcome = self.tools.execute(&call.name, call.arguments.clone()).await;
        let duration_ms = elapsed_ms(start);

        let (result, error) = match outcome {
            Ok(value) => {
                debug!(tool = %call.name, duration_ms, "Tool executed");
                (Some(value), None)
            }
            Err(e) => {
                warn!(tool = %call.name, duration_ms, error = %e, "Tool execution failed");
                (None, Some(e.to_string()))
            }
        };

        ToolResult {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            result,
            error,
            duration_ms,
        }
    }
}

/// Run one query with a throwaway [`AgentLoop`].
pub async fn run_agent(
    query: &str,
    history: &[Message],
    config: &AgentConfig,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
) -> Result<AgentRun, AgentError> {
    AgentLoop::new(provider, tools)
        .with_config(config.clone())
        .run(query, history)
        .await
}

/// Tool-role message text: one `[name] output` line per result.
fn summarize_results(results: &[ToolResult]) -> String {
    results
        .iter()
        .map(|r| format!("[{}] {}", r.name, r.render()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Hook dispatch for one run. Silent once the run is cancelled.
struct Events<'a> {
    callbacks: &'a AgentCallbacks,
    cancel: &'a CancellationToken,
}

impl Events<'_> {
    fn live(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    fn status(&self, status: AgentStatus) {
        if self.live() {
            self.callbacks.status(status);
        }
    }

    fn step(&self, step: &AgentStep) {
        if self.live() {
            self.callbacks.step(step);
        }
    }

    fn error(&self, error: &AgentError) {
        if self.live() {
            self.callbacks.error(error);
        }
    }

    fn compaction(&self) {
        if self.live() {
            self.callbacks.compaction();
        }
    }

    /// Report the `error` status and hand the error back for returning.
    fn fail(&self, error: AgentError) -> AgentError {
        self.status(AgentStatus::Error);
        error
    }
}
