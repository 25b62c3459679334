//! Observability
//!
//! Structured logging for the workforce. Routing decisions log at `info`,
//! fallbacks at `warn`, extraction and scoring details at `debug`.

pub mod logging;

pub use logging::{init_default_logging, init_logging, parse_level, parse_span_flag, LogFormat};

// Span macros for structured logging
pub use logging::{routing_span, step_span};
