//! Testing utilities and mock implementations
//!
//! Mock workers, providers and selectors for exercising the workforce without
//! a live LLM endpoint.

pub mod mocks;

pub use mocks::*;
