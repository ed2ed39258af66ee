//! Observation hooks fired by the orchestration loop.
//!
//! Hooks are plain synchronous functions called at the loop's suspension
//! points. They observe; they cannot change control flow.

use std::fmt;
use std::sync::Arc;

use stepwise_core::{AgentError, AgentStatus, AgentStep};

type StatusHook = Arc<dyn Fn(AgentStatus) + Send + Sync>;
type StepHook = Arc<dyn Fn(&AgentStep) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&AgentError) + Send + Sync>;
type CompactionHook = Arc<dyn Fn() + Send + Sync>;

/// Optional caller hooks. All default to none.
#[derive(Clone, Default)]
pub struct AgentCallbacks {
    on_status_change: Option<StatusHook>,
    on_step_update: Option<StepHook>,
    on_error: Option<ErrorHook>,
    on_compaction: Option<CompactionHook>,
}

impl AgentCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called before each provider call (`planning`), after tool calls are
    /// received (`executing_tools`), before validation (`validating`), and
    /// with `error` before a classified failure is returned.
    pub fn on_status_change(mut self, f: impl Fn(AgentStatus) + Send + Sync + 'static) -> Self {
        self.on_status_change = Some(Arc::new(f));
        self
    }

    /// Called once for every step appended to the run.
    pub fn on_step_update(mut self, f: impl Fn(&AgentStep) + Send + Sync + 'static) -> Self {
        self.on_step_update = Some(Arc::new(f));
        self
    }

    /// Called with every classified provider failure, recovered or not.
    pub fn on_error(mut self, f: impl Fn(&AgentError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Called after history was compacted, before the retry.
    pub fn on_compaction(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_compaction = Some(Arc::new(f));
        self
    }

    pub(crate) fn status(&self, status: AgentStatus) {
        if let Some(f) = &self.on_status_change {
            f(status);
        }
    }

    pub(crate) fn step(&self, step: &AgentStep) {
        if let Some(f) = &self.on_step_update {
            f(step);
        }
    }

    pub(crate) fn error(&self, error: &AgentError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }

    pub(crate) fn compaction(&self) {
        if let Some(f) = &self.on_compaction {
            f();
        }
    }
}

impl fmt::Debug for AgentCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentCallbacks")
            .field("on_status_change", &self.on_status_change.is_some())
            .field("on_step_update", &self.on_step_update.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_compaction", &self.on_compaction.is_some())
            .finish()
    }
}
