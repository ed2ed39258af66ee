//! The stepwise agent runtime.
//!
//! The loop follows a **Plan → Act → Validate** cycle:
//!
//! 1. **Seed** the conversation (system prompt + history + query)
//! 2. **Call** the provider, compacting once if the context is too long
//! 3. **If tool calls**: execute up to the per-step cap, summarize results
//! 4. **Validate** the step and inject a hint if it went nowhere
//! 5. **If text only**: the run is complete
//!
//! When the step budget runs out the model is asked for a best-effort answer
//! with no tools offered.

pub mod callbacks;
pub mod classify;
pub mod context;
pub mod loop_detector;
pub mod loop_runner;
pub mod prompt;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use callbacks::AgentCallbacks;
pub use classify::{classify, classify_error, classify_message};
pub use context::{compact_messages, estimate_messages_tokens, estimate_tokens};
pub use loop_detector::LoopDetector;
pub use loop_runner::{AgentLoop, BEST_EFFORT_INSTRUCTION, run_agent};
pub use prompt::build_system_prompt;
pub use validator::validate_step;
