use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::session::{Stage, TurnOutcome};

/// Which detector's stages were applied to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceAuthority {
    /// Engine banners in captured output
    Output,
    /// Call sites in the fragment (capture disabled)
    Source,
    /// Nothing ran
    None,
}

/// Both detector readings for one fragment, plus what was applied
#[derive(Debug, Clone, Serialize)]
pub struct StageEvidence {
    pub source: BTreeSet<Stage>,
    pub output: BTreeSet<Stage>,
    /// Stages newly added to the session by this fragment
    pub applied: BTreeSet<Stage>,
    pub authority: EvidenceAuthority,
}

impl Default for StageEvidence {
    fn default() -> Self {
        Self {
            source: BTreeSet::new(),
            output: BTreeSet::new(),
            applied: BTreeSet::new(),
            authority: EvidenceAuthority::None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub skipped: bool,
    pub error: Option<String>,
    pub error_type: Option<String>,
    pub traceback: Option<String>,
    pub logs: Vec<String>,
    #[serde(serialize_with = "serialize_secs")]
    pub execution_time: Duration,
    pub entities_created: usize,
    pub evidence: StageEvidence,
}

impl ExecutionOutcome {
    /// Success-with-skipped; nothing ran
    pub fn skipped(logs: Vec<String>) -> Self {
        Self {
            success: true,
            skipped: true,
            logs,
            ..Default::default()
        }
    }

    /// Refused before execution
    pub fn rejected(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            ..Default::default()
        }
    }
}

impl From<&ExecutionOutcome> for TurnOutcome {
    fn from(outcome: &ExecutionOutcome) -> Self {
        TurnOutcome {
            success: outcome.success,
            error: outcome.error.clone(),
            logs: outcome.logs.clone(),
        }
    }
}

pub(crate) fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
