//! Pre-execution gate
//!
//! Reads the fragment with source detection and decides, against the
//! current [`SessionState`], whether it runs. The gate never mutates state.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::Serialize;

use crate::session::{
    ConstraintCatalog, ConstraintKind, SessionState, SourceStageDetector, Stage, StageDetector,
};

/// What to do with a fragment that repeats a completed one-shot stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// Treat the whole fragment as a successful no-op
    #[default]
    Skip,
    /// Drop the repeating statements and run the rest
    Rewrite,
}

impl fmt::Display for GatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatePolicy::Skip => f.write_str("skip"),
            GatePolicy::Rewrite => f.write_str("rewrite"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown gate policy '{0}' (expected skip or rewrite)")]
pub struct ParseGatePolicyError(String);

impl FromStr for GatePolicy {
    type Err = ParseGatePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(GatePolicy::Skip),
            "rewrite" => Ok(GatePolicy::Rewrite),
            other => Err(ParseGatePolicyError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Run the fragment unchanged
    Execute { code: String },
    /// Run a continuation with the repeating statements removed
    Rewrite { code: String, removed: Vec<Stage> },
    /// Do not run anything; report success-with-skipped
    Skip { stages: Vec<Stage> },
    /// Do not run anything; report a failure the model can correct
    Reject { stage: Stage, blocked_by: Stage },
}

impl GateDecision {
    pub fn name(&self) -> &'static str {
        match self {
            GateDecision::Execute { .. } => "execute",
            GateDecision::Rewrite { .. } => "rewrite",
            GateDecision::Skip { .. } => "skip",
            GateDecision::Reject { .. } => "reject",
        }
    }
}

pub struct CodeGate {
    policy: GatePolicy,
    catalog: ConstraintCatalog,
    detector: SourceStageDetector,
}

impl CodeGate {
    pub fn new(policy: GatePolicy, alias: &str) -> Self {
        Self {
            policy,
            catalog: ConstraintCatalog,
            detector: SourceStageDetector::new(alias),
        }
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn evaluate(&self, code: &str, state: &SessionState) -> GateDecision {
        let detected = self.detector.detect(code);

        if state.is_completed(Stage::Built) {
            if let Some(stage) = detected
                .iter()
                .copied()
                .find(|s| self.catalog.kind(*s) == ConstraintKind::BeforeBuild)
            {
                return GateDecision::Reject {
                    stage,
                    blocked_by: Stage::Built,
                };
            }
        }

        let duplicates: BTreeSet<Stage> = detected
            .iter()
            .copied()
            .filter(|s| self.catalog.is_one_shot(*s) && state.is_completed(*s))
            .collect();
        if duplicates.is_empty() {
            return GateDecision::Execute {
                code: code.to_string(),
            };
        }

        match self.policy {
            GatePolicy::Skip => GateDecision::Skip {
                stages: duplicates.into_iter().collect(),
            },
            GatePolicy::Rewrite => {
                let rewritten = self.remove_statements(code, &duplicates);
                if has_meaningful_code(&rewritten) {
                    GateDecision::Rewrite {
                        code: rewritten,
                        removed: duplicates.into_iter().collect(),
                    }
                } else {
                    GateDecision::Skip {
                        stages: duplicates.into_iter().collect(),
                    }
                }
            }
        }
    }

    /// Replace each logical statement that triggers one of `stages` with a
    /// single `pass` at the statement's indentation
    fn remove_statements(&self, code: &str, stages: &BTreeSet<Stage>) -> String {
        let lines: Vec<&str> = code.lines().collect();
        let mut out = Vec::with_capacity(lines.len());
        for span in statement_spans(&lines) {
            let statement = &lines[span.clone()];
            if self.detector.line_stages(&statement.join(" ")).is_disjoint(stages) {
                out.extend(statement.iter().map(|l| l.to_string()));
                continue;
            }
            let indent: String = statement[0]
                .chars()
                .take_while(|c| c.is_whitespace())
                .collect();
            out.push(format!("{}pass", indent));
        }
        out.join("\n")
    }
}

/// Line ranges of logical statements: a statement runs from its first line
/// until its brackets balance. Blank lines outside brackets are their own span.
pub(crate) fn statement_spans(lines: &[&str]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut depth = 0;
    for (idx, line) in lines.iter().enumerate() {
        depth += bracket_delta(line);
        if depth <= 0 {
            spans.push(start..idx + 1);
            start = idx + 1;
            depth = 0;
        }
    }
    if start < lines.len() {
        spans.push(start..lines.len());
    }
    spans
}

/// Net bracket depth change of one line, ignoring brackets inside quotes
pub(crate) fn bracket_delta(line: &str) -> i32 {
    let mut quote: Option<char> = None;
    let mut delta = 0;
    for c in line.chars() {
        match (quote, c) {
            (None, '#') => break,
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '(' | '[' | '{') => delta += 1,
            (None, ')' | ']' | '}') => delta -= 1,
            _ => {}
        }
    }
    delta
}

fn has_meaningful_code(code: &str) -> bool {
    code.lines().map(str::trim).any(|l| {
        !(l.is_empty()
            || l.starts_with('#')
            || l == "pass"
            || l.starts_with("import ")
            || l.starts_with("from "))
    })
}
