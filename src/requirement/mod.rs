//! # Requirement Blocks
//!
//! A requirement block is a named set of predicates plus a pass threshold. It
//! gates menu opens, item visibility and clicks. Evaluation only reads player
//! state; any side effects (success/deny action lists) are dispatched
//! separately by the caller from the returned [`BlockEvaluation`].
//!
//! - [`expression`] - restricted arithmetic/boolean evaluator
//! - [`predicates`] - built-in predicate types and the extension registry
//! - [`evaluator`] - threshold policy and action dispatch lists

use serde_json::{Map, Value};

pub mod evaluator;
pub mod expression;
pub mod predicates;

pub use evaluator::evaluate_block;
pub use predicates::{EvalContext, PredicateHandler, PredicateRegistry};

/// One predicate inside a block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredicateSpec {
    /// Type tag as written, possibly prefixed with `!`.
    pub kind: String,
    /// Remaining type-specific fields.
    pub params: Map<String, Value>,
    pub success_actions: Vec<String>,
    pub deny_actions: Vec<String>,
}

impl PredicateSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Builder used mostly by tests and programmatic menus.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn with_deny(mut self, lines: &[&str]) -> Self {
        self.deny_actions = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_success(mut self, lines: &[&str]) -> Self {
        self.success_actions = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Normalized type and negation flag: `"!Has Permission "` → `("has permission", true)`.
    pub fn normalized_kind(&self) -> (String, bool) {
        let kind = self.kind.trim().to_lowercase();
        match kind.strip_prefix('!') {
            Some(rest) => (rest.trim().to_string(), true),
            None => (kind, false),
        }
    }

    /// Parameter as text. Numbers and booleans are stringified.
    pub fn str_param(&self, key: &str) -> Option<String> {
        match self.params.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Parameter as a number, accepting numeric strings.
    pub fn num_param(&self, key: &str) -> Option<f64> {
        match self.params.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_numeric(s),
            _ => None,
        }
    }

    pub fn bool_param(&self, key: &str) -> bool {
        match self.params.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => {
                matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "on" | "1")
            }
            _ => false,
        }
    }

    /// Parameter as a list of strings; a single string becomes a one-element list.
    pub fn list_param(&self, key: &str) -> Vec<String> {
        match self.params.get(key) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Parse a finite decimal number, tolerating surrounding whitespace.
///
/// Words such as `inf` or `nan` that `f64::from_str` accepts are rejected.
pub fn parse_numeric(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() || !t.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !t
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    t.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Named predicates plus the threshold policy.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequirementBlock {
    /// Predicates in definition order.
    pub predicates: Vec<(String, PredicateSpec)>,
    /// Required pass count. `None` means every predicate must pass.
    pub minimum: Option<usize>,
    pub stop_at_success: bool,
    pub success_actions: Vec<String>,
    pub deny_actions: Vec<String>,
}

impl RequirementBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicate(mut self, name: impl Into<String>, spec: PredicateSpec) -> Self {
        self.predicates.push((name.into(), spec));
        self
    }

    /// Set the minimum pass count. Values below 1 are raised to 1.
    pub fn minimum(mut self, minimum: usize) -> Self {
        self.minimum = Some(minimum.max(1));
        self
    }

    pub fn stop_at_success(mut self, stop: bool) -> Self {
        self.stop_at_success = stop;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Result of one evaluated predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateResult {
    pub name: String,
    pub passed: bool,
    pub success_actions: Vec<String>,
    pub deny_actions: Vec<String>,
}

/// Outcome of [`evaluate_block`].
///
/// Predicates skipped by `stop_at_success` have no entry in `results`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockEvaluation {
    pub passed: bool,
    pub results: Vec<PredicateResult>,
    pub minimum: Option<usize>,
    pub stop_at_success: bool,
    pub success_actions: Vec<String>,
    pub deny_actions: Vec<String>,
}

impl BlockEvaluation {
    /// The trivially passing evaluation of an absent block.
    pub fn pass() -> Self {
        Self {
            passed: true,
            ..Default::default()
        }
    }

    pub fn result(&self, name: &str) -> Option<&PredicateResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn pass_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Action lists to run on success: each passing predicate's success
    /// actions, then the block-level success actions.
    pub fn success_dispatch(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .results
            .iter()
            .filter(|r| r.passed)
            .flat_map(|r| r.success_actions.iter().cloned())
            .collect();
        lines.extend(self.success_actions.iter().cloned());
        lines
    }

    /// Action lists to run on denial: each failing predicate's deny actions,
    /// then the block-level deny actions.
    pub fn deny_dispatch(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .results
            .iter()
            .filter(|r| !r.passed)
            .flat_map(|r| r.deny_actions.iter().cloned())
            .collect();
        lines.extend(self.deny_actions.iter().cloned());
        lines
    }
}
