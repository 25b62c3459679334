//! Structured output recovery from free text
//!
//! Planners answer in prose. Somewhere in that prose there is usually a JSON
//! document, possibly fenced in markdown, possibly cut short. The extractor
//! runs three strategies in priority order and returns the first candidate
//! that is structured (object or array) and, when a schema is given, valid
//! against it:
//!
//! 1. `direct`: the whole trimmed input parses as JSON
//! 2. `code_block`: the content of a fenced block parses, left to right
//! 3. `bracket_matching`: a balanced `{...}` span parses; when a span fails the
//!    largest valid span nested inside it is tried before scanning on
//!
//! A schema mismatch only fails the strategy that produced the candidate.
//! Nothing partial or guessed is ever returned.

use super::plan::Plan;
use super::schema::PlanOutput;
use jsonschema::Validator;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").expect("code block pattern")
});

/// Recovery strategy, in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionStrategy {
    Direct,
    CodeBlock,
    BracketMatching,
}

impl ExtractionStrategy {
    pub const ALL: [ExtractionStrategy; 3] = [
        ExtractionStrategy::Direct,
        ExtractionStrategy::CodeBlock,
        ExtractionStrategy::BracketMatching,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::Direct => "direct",
            ExtractionStrategy::CodeBlock => "code_block",
            ExtractionStrategy::BracketMatching => "bracket_matching",
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// No structured value could be recovered
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParsingError {
    pub message: String,
    pub original_text: String,
    pub attempted_strategies: Vec<ExtractionStrategy>,
}

impl ParsingError {
    fn new<S: Into<String>>(
        message: S,
        original_text: &str,
        attempted_strategies: Vec<ExtractionStrategy>,
    ) -> Self {
        Self {
            message: message.into(),
            original_text: original_text.to_string(),
            attempted_strategies,
        }
    }
}

/// Schema construction errors
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid extraction schema: {0}")]
    Invalid(String),

    #[error("Schema generation failed: {0}")]
    Generation(#[from] serde_json::Error),
}

/// Compiled JSON Schema that candidates must satisfy
#[derive(Clone)]
pub struct ExtractionSchema {
    schema: Value,
    validator: Arc<Validator>,
}

impl ExtractionSchema {
    pub fn from_json_schema(schema: Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| SchemaError::Invalid(format!("Schema compilation error: {e}")))?;

        Ok(Self {
            schema,
            validator: Arc::new(validator),
        })
    }

    /// Object that must contain an array field named `field`
    pub fn required_array(field: &str) -> Result<Self, SchemaError> {
        Self::from_json_schema(json!({
            "type": "object",
            "required": [field],
            "properties": {
                field: { "type": "array" }
            }
        }))
    }

    /// Schema of the planner's decomposition output
    pub fn for_plan() -> Result<Self, SchemaError> {
        Self::from_json_schema(PlanOutput::json_schema()?)
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validator.is_valid(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.schema
    }
}

impl fmt::Debug for ExtractionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Multi-strategy extractor with the plan schema precompiled
#[derive(Debug, Clone)]
pub struct PlanExtractor {
    plan_schema: ExtractionSchema,
}

impl PlanExtractor {
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            plan_schema: ExtractionSchema::for_plan()?,
        })
    }

    pub fn plan_schema(&self) -> &ExtractionSchema {
        &self.plan_schema
    }

    /// Recover the first structured value that satisfies `schema`
    pub fn extract(
        &self,
        raw: &str,
        schema: Option<&ExtractionSchema>,
    ) -> Result<Value, ParsingError> {
        let accepts = |value: &Value| {
            is_structured(value) && schema.map_or(true, |schema| schema.is_valid(value))
        };
        run_strategies(raw, &accepts)
    }

    /// Recover and order a plan from planner output
    pub fn parse_plan(&self, raw: &str) -> Result<Plan, ParsingError> {
        let value = self.extract(raw, Some(&self.plan_schema))?;

        let output: PlanOutput = serde_json::from_value(value).map_err(|e| {
            ParsingError::new(
                format!("Extracted JSON does not match the plan shape: {e}"),
                raw,
                ExtractionStrategy::ALL.to_vec(),
            )
        })?;

        Ok(Plan::from_output(output))
    }
}

/// Recover any structured value from text, without a schema
pub fn extract_json(raw: &str) -> Result<Value, ParsingError> {
    run_strategies(raw, &is_structured)
}

fn is_structured(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

fn run_strategies(raw: &str, accepts: &dyn Fn(&Value) -> bool) -> Result<Value, ParsingError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ParsingError::new(
            "Empty or whitespace-only content",
            raw,
            Vec::new(),
        ));
    }

    let mut attempted = Vec::with_capacity(ExtractionStrategy::ALL.len());
    for strategy in ExtractionStrategy::ALL {
        attempted.push(strategy);

        let found = match strategy {
            ExtractionStrategy::Direct => direct(text, accepts),
            ExtractionStrategy::CodeBlock => code_block(text, accepts),
            ExtractionStrategy::BracketMatching => bracket_matching(text, accepts),
        };

        if let Some(value) = found {
            debug!(strategy = %strategy, "Recovered structured output");
            return Ok(value);
        }
        debug!(strategy = %strategy, "Extraction strategy found no valid candidate");
    }

    let tried: Vec<&str> = attempted.iter().map(ExtractionStrategy::as_str).collect();
    Err(ParsingError::new(
        format!(
            "Failed to extract valid JSON from content (tried: {})",
            tried.join(", ")
        ),
        raw,
        attempted,
    ))
}

fn parse_candidate(candidate: &str, accepts: &dyn Fn(&Value) -> bool) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(|value| accepts(value))
}

fn direct(text: &str, accepts: &dyn Fn(&Value) -> bool) -> Option<Value> {
    parse_candidate(text, accepts)
}

fn code_block(text: &str, accepts: &dyn Fn(&Value) -> bool) -> Option<Value> {
    CODE_BLOCK
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .find_map(|block| parse_candidate(block.as_str().trim(), accepts))
}

fn bracket_matching(text: &str, accepts: &dyn Fn(&Value) -> bool) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut cursor = 0;

    while let Some(offset) = bytes[cursor..].iter().position(|&b| b == b'{') {
        let start = cursor + offset;

        match find_balanced_end(bytes, start, bytes.len()) {
            Some(end) => {
                if let Some(value) = parse_candidate(&text[start..=end], accepts) {
                    return Some(value);
                }
                if let Some(value) = largest_inner_span(text, start + 1, end, accepts) {
                    return Some(value);
                }
                cursor = end + 1;
            }
            // Truncated: the outer object never closes
            None => return largest_inner_span(text, start + 1, bytes.len(), accepts),
        }
    }

    None
}

/// Largest balanced span in `text[from..to]` that parses and is accepted.
/// Equal lengths prefer the leftmost span.
fn largest_inner_span(
    text: &str,
    from: usize,
    to: usize,
    accepts: &dyn Fn(&Value) -> bool,
) -> Option<Value> {
    let mut spans = balanced_spans(text.as_bytes(), from, to);

    spans.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));

    spans
        .into_iter()
        .find_map(|(start, end)| parse_candidate(&text[start..=end], accepts))
}

/// Every balanced `{...}` span in `bytes[from..to]`, found in one pass.
/// Braces inside string literals are ignored, as are unmatched ones.
fn balanced_spans(bytes: &[u8], from: usize, to: usize) -> Vec<(usize, usize)> {
    let mut open: Vec<usize> = Vec::new();
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in bytes.iter().enumerate().take(to).skip(from) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i));
                }
            }
            _ => {}
        }
    }

    spans
}

/// Index of the brace closing the one at `start`, looking no further than
/// `limit`. Braces inside string literals are ignored.
fn find_balanced_end(bytes: &[u8], start: usize, limit: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in bytes.iter().enumerate().take(limit).skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}
