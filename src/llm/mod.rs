//! LLM provider abstraction layer
//!
//! Provider-agnostic interface used by LLM-backed workers, plus the
//! OpenAI-compatible chat-completions backend.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
