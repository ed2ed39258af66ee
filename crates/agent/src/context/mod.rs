//! Context-window management: token estimation and progressive compaction.
//!
//! # Compaction stages (in increasing aggressiveness)
//!
//! | Stage | Effect |
//! |-------|--------|
//! | 1 | Tool output truncated to 500 characters |
//! | 2 | Tool output truncated to 200 characters |
//! | 3 | Tool output replaced with a placeholder |
//! | 4 | History cut to the second-to-last user turn |
//! | 5 | History cut to the last user turn |
//!
//! The system message is never touched.

pub mod compaction;
pub mod token;

pub use compaction::{TOOL_OUTPUT_PLACEHOLDER, compact_messages, compaction_target};
pub use token::{estimate_message_tokens, estimate_messages_tokens, estimate_tokens};
