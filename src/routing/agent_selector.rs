//! Lexical worker selection
//!
//! Builds a keyword profile for every registered worker from its description
//! and directive, then scores workers against a task with four weighted terms:
//!
//! - keyword overlap: share of the worker's keywords found in the task
//! - capability: capability markers of the worker's categories present in the task
//! - description: Dice overlap between task and description tokens
//! - name: the worker's name (or its parts) mentioned in the task
//!
//! This is not semantic understanding. It is a deterministic heuristic used
//! when no trustworthy plan names a worker.

use crate::worker::{TaskContext, Worker};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "you", "are", "who", "that", "with", "from", "about", "help",
        "helps", "your", "job", "can", "any", "this", "into", "will", "all", "its", "has",
        "have", "been", "was", "were", "our", "their", "they", "them", "then", "than", "what",
        "when", "where", "which", "while", "should", "would", "could", "other", "some", "such",
        "each", "also", "more", "most", "very", "just", "only", "well", "not", "but", "out",
        "always", "possible", "please", "there", "these", "those", "how", "why", "make",
    ]
    .into_iter()
    .collect()
});

/// Selection failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("No workers available for selection")]
    NoWorkers,

    #[error("Selected worker '{0}' is not registered")]
    UnknownWorker(String),
}

/// Relative weight of each scoring term
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_keyword_weight")]
    pub keyword: f64,
    #[serde(default = "default_capability_weight")]
    pub capability: f64,
    #[serde(default = "default_description_weight")]
    pub description: f64,
    #[serde(default = "default_name_weight")]
    pub name: f64,
}

fn default_keyword_weight() -> f64 {
    0.35
}

fn default_capability_weight() -> f64 {
    0.25
}

fn default_description_weight() -> f64 {
    0.25
}

fn default_name_weight() -> f64 {
    0.15
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword: default_keyword_weight(),
            capability: default_capability_weight(),
            description: default_description_weight(),
            name: default_name_weight(),
        }
    }
}

impl ScoringWeights {
    /// Weights must be non-negative and sum to 1
    pub fn validate(&self) -> Result<(), String> {
        let weights = [self.keyword, self.capability, self.description, self.name];

        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("Scoring weights must be non-negative".to_string());
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(format!("Scoring weights must sum to 1.0, got {sum:.6}"));
        }

        Ok(())
    }
}

/// A capability category and the substrings that indicate it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityMarker {
    pub category: String,
    pub markers: Vec<String>,
}

impl CapabilityMarker {
    pub fn new(category: &str, markers: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            markers: markers.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Built-in marker table
pub fn default_capability_markers() -> Vec<CapabilityMarker> {
    vec![
        CapabilityMarker::new(
            "research",
            &[
                "research", "analy", "investigat", "study", "find", "information", "search",
                "explore", "discover",
            ],
        ),
        CapabilityMarker::new(
            "writing",
            &[
                "writ", "edit", "content", "article", "blog", "draft", "story", "copy",
                "narrative", "summar", "document",
            ],
        ),
        CapabilityMarker::new(
            "coding",
            &[
                "code", "coding", "program", "develop", "debug", "software", "implement",
                "python", "javascript", "function", "script", "build", "bug", "fix",
            ],
        ),
        CapabilityMarker::new(
            "data_analysis",
            &[
                "data", "statistic", "metric", "chart", "visualiz", "dataset", "trend",
                "calculat", "quantif",
            ],
        ),
        CapabilityMarker::new(
            "planning",
            &[
                "plan", "coordinat", "orchestrat", "schedul", "organiz", "strateg", "decompos",
            ],
        ),
    ]
}

fn default_min_token_length() -> usize {
    3
}

/// Selector tuning, loadable from the `[selector]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default = "default_capability_markers")]
    pub capabilities: Vec<CapabilityMarker>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_token_length: default_min_token_length(),
            weights: ScoringWeights::default(),
            capabilities: default_capability_markers(),
        }
    }
}

impl SelectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_token_length == 0 {
            return Err("min_token_length must be at least 1".to_string());
        }
        self.weights.validate()?;

        for marker in &self.capabilities {
            if marker.category.trim().is_empty() {
                return Err("Capability category names cannot be empty".to_string());
            }
            if marker.markers.iter().any(|m| m.trim().is_empty()) {
                return Err(format!(
                    "Capability category '{}' contains an empty marker",
                    marker.category
                ));
            }
        }

        Ok(())
    }
}

/// Lexical profile of one worker
#[derive(Debug, Clone)]
pub struct WorkerProfile {
    pub name: String,
    pub description: String,
    pub directive: String,
    pub keywords: BTreeSet<String>,
    pub capabilities: BTreeSet<String>,
    description_tokens: BTreeSet<String>,
    capability_markers: BTreeSet<String>,
    name_parts: Vec<String>,
}

impl WorkerProfile {
    pub fn build(name: &str, description: &str, directive: &str, config: &SelectorConfig) -> Self {
        let keywords = tokenize(
            &format!("{description} {directive}"),
            config.min_token_length,
        );

        let mut capabilities = BTreeSet::new();
        let mut capability_markers = BTreeSet::new();
        for category in &config.capabilities {
            let matched: Vec<&String> = keywords
                .iter()
                .filter(|keyword| {
                    category
                        .markers
                        .iter()
                        .any(|marker| keyword.contains(marker.to_lowercase().as_str()))
                })
                .collect();

            if !matched.is_empty() {
                capabilities.extend(matched.into_iter().cloned());
                capability_markers.extend(category.markers.iter().map(|m| m.to_lowercase()));
            }
        }

        Self {
            name: name.to_string(),
            description: description.to_string(),
            directive: directive.to_string(),
            keywords,
            capabilities,
            description_tokens: tokenize(description, config.min_token_length),
            capability_markers,
            name_parts: raw_tokens(name),
        }
    }

    pub fn from_worker(worker: &dyn Worker, config: &SelectorConfig) -> Self {
        Self::build(
            worker.name(),
            worker.description(),
            worker.directive(),
            config,
        )
    }

    fn keyword_score(&self, task_tokens: &BTreeSet<String>) -> f64 {
        if self.keywords.is_empty() {
            return 0.0;
        }
        let hits = task_tokens.intersection(&self.keywords).count();
        hits as f64 / self.keywords.len() as f64
    }

    fn capability_score(&self, task_lower: &str) -> f64 {
        if self.capabilities.is_empty() {
            return 0.0;
        }
        let present = self
            .capability_markers
            .iter()
            .filter(|marker| task_lower.contains(marker.as_str()))
            .count();
        (present as f64 / self.capabilities.len() as f64).min(1.0)
    }

    fn description_score(&self, task_tokens: &BTreeSet<String>) -> f64 {
        let total = task_tokens.len() + self.description_tokens.len();
        if total == 0 {
            return 0.0;
        }
        let shared = task_tokens.intersection(&self.description_tokens).count();
        2.0 * shared as f64 / total as f64
    }

    fn name_score(&self, task_raw_tokens: &[String]) -> f64 {
        if self.name_parts.is_empty() {
            return 0.0;
        }

        if self
            .name_parts
            .iter()
            .all(|part| task_raw_tokens.iter().any(|token| token == part))
        {
            return 1.0;
        }

        let matched = self
            .name_parts
            .iter()
            .filter(|part| {
                task_raw_tokens
                    .iter()
                    .any(|token| token == *part || is_stem_match(token, part))
            })
            .count();

        0.5 * matched as f64 / self.name_parts.len() as f64
    }
}

/// Per-term scores for one worker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub worker: String,
    pub keyword: f64,
    pub capability: f64,
    pub description: f64,
    pub name: f64,
    pub total: f64,
}

/// Selection seam used by the workforce
pub trait WorkerSelector: Send + Sync {
    /// Rebuild the index from the registry, in registration order
    fn rebuild(&mut self, workers: &[Arc<dyn Worker>]);

    /// Pick the best worker for a task
    fn select_best_agent(
        &self,
        task: &str,
        context: Option<&TaskContext>,
    ) -> Result<String, SelectionError>;

    /// All workers with their scores, best first
    fn get_ranked_agents(&self, task: &str) -> Vec<(String, f64)>;
}

/// Default keyword/capability scorer
#[derive(Debug, Clone, Default)]
pub struct AgentSelector {
    config: SelectorConfig,
    profiles: Vec<WorkerProfile>,
}

impl AgentSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            config,
            profiles: Vec::new(),
        }
    }

    /// Index prebuilt profiles, e.g. from configuration without live workers
    pub fn with_profiles(profiles: Vec<WorkerProfile>, config: SelectorConfig) -> Self {
        Self { config, profiles }
    }

    pub fn from_workers(workers: &[Arc<dyn Worker>], config: SelectorConfig) -> Self {
        let mut selector = Self::new(config);
        selector.rebuild(workers);
        selector
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn profiles(&self) -> &[WorkerProfile] {
        &self.profiles
    }

    pub fn profile(&self, name: &str) -> Option<&WorkerProfile> {
        self.profiles.iter().find(|profile| profile.name == name)
    }

    /// Score every worker, in registration order
    pub fn score(&self, task: &str) -> Vec<ScoreBreakdown> {
        let task_tokens = tokenize(task, self.config.min_token_length);
        let task_raw_tokens = raw_tokens(task);
        let task_lower = task.to_lowercase();
        let weights = &self.config.weights;

        self.profiles
            .iter()
            .map(|profile| {
                let keyword = profile.keyword_score(&task_tokens);
                let capability = profile.capability_score(&task_lower);
                let description = profile.description_score(&task_tokens);
                let name = profile.name_score(&task_raw_tokens);

                ScoreBreakdown {
                    worker: profile.name.clone(),
                    keyword,
                    capability,
                    description,
                    name,
                    total: weights.keyword * keyword
                        + weights.capability * capability
                        + weights.description * description
                        + weights.name * name,
                }
            })
            .collect()
    }
}

impl WorkerSelector for AgentSelector {
    fn rebuild(&mut self, workers: &[Arc<dyn Worker>]) {
        self.profiles = workers
            .iter()
            .map(|worker| WorkerProfile::from_worker(worker.as_ref(), &self.config))
            .collect();
        debug!(workers = self.profiles.len(), "Rebuilt capability index");
    }

    fn select_best_agent(
        &self,
        task: &str,
        context: Option<&TaskContext>,
    ) -> Result<String, SelectionError> {
        let text = match context {
            Some(context) => with_context_text(task, context),
            None => task.to_string(),
        };

        // Strictly greater keeps the earliest registered worker on ties
        let mut best: Option<ScoreBreakdown> = None;
        for candidate in self.score(&text) {
            if best.as_ref().map_or(true, |b| candidate.total > b.total) {
                best = Some(candidate);
            }
        }

        let best = best.ok_or(SelectionError::NoWorkers)?;
        debug!(
            worker = %best.worker,
            score = best.total,
            keyword = best.keyword,
            capability = best.capability,
            description = best.description,
            name = best.name,
            "Selected worker by lexical score"
        );
        Ok(best.worker)
    }

    fn get_ranked_agents(&self, task: &str) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .score(task)
            .into_iter()
            .map(|breakdown| (breakdown.worker, breakdown.total))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Lowercased alphanumeric runs, unfiltered
fn raw_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Scoring tokens: no stop-words, nothing shorter than `min_len`, no pure numbers
fn tokenize(text: &str, min_len: usize) -> BTreeSet<String> {
    raw_tokens(text)
        .into_iter()
        .filter(|token| token.chars().count() >= min_len)
        .filter(|token| token.chars().any(char::is_alphabetic))
        .filter(|token| !STOP_WORDS.contains(token.as_str()))
        .collect()
}

/// One token is a prefix of the other and the shorter has at least 4 chars
fn is_stem_match(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.chars().count() >= 4 && long.starts_with(short)
}

fn with_context_text(task: &str, context: &TaskContext) -> String {
    let mut text = task.to_string();
    for value in context.values() {
        match value {
            Value::String(s) => {
                text.push(' ');
                text.push_str(s);
            }
            Value::Array(items) => {
                for s in items.iter().filter_map(Value::as_str) {
                    text.push(' ');
                    text.push_str(s);
                }
            }
            _ => {}
        }
    }
    text
}
