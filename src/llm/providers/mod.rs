//! LLM provider implementations
//!
//! Concrete implementations of the LlmProvider trait.

pub mod openai;

pub use openai::*;
