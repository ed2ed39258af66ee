//! LLM provider adapters for stepwise.
//!
//! All adapters implement the `stepwise_core::Provider` trait. Each one owns
//! the translation between the internal message model and one wire protocol;
//! the router picks the adapter from configuration.

mod http;

pub mod anthropic;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
