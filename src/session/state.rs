//! Session state machine

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::stage::Stage;

/// Lifecycle stages the engine has completed, plus error and entity tallies.
///
/// Stages only ever enter `completed`; the set shrinks only through
/// [`SessionState::reset`]. `Stepping` is never recorded before `Built`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    completed: BTreeSet<Stage>,
    error_count: u32,
    entities: BTreeMap<String, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> &BTreeSet<Stage> {
        &self.completed
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    /// Highest completed stage, or `Uninitialized`
    pub fn current_stage(&self) -> Stage {
        self.completed
            .iter()
            .next_back()
            .copied()
            .unwrap_or(Stage::Uninitialized)
    }

    /// Earliest lifecycle stage not yet completed; `Stepping` once all are done
    pub fn next_required_stage(&self) -> Stage {
        Stage::LIFECYCLE
            .into_iter()
            .find(|s| !self.completed.contains(s))
            .unwrap_or(Stage::Stepping)
    }

    /// Forward-only check: `stage` may run iff it is not behind the highest completed stage
    pub fn can_execute(&self, stage: Stage) -> bool {
        stage >= self.current_stage()
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn entities(&self) -> &BTreeMap<String, String> {
        &self.entities
    }

    /// Fold detected stages in; returns the stages that were newly completed
    pub fn record_stages(&mut self, detected: &BTreeSet<Stage>) -> BTreeSet<Stage> {
        let mut added = BTreeSet::new();
        for &stage in detected {
            if stage == Stage::Uninitialized || self.completed.contains(&stage) {
                continue;
            }
            if stage == Stage::Stepping
                && !self.completed.contains(&Stage::Built)
                && !detected.contains(&Stage::Built)
            {
                tracing::warn!("stepping detected before build; not recorded");
                continue;
            }
            self.completed.insert(stage);
            added.insert(stage);
        }
        if !added.is_empty() {
            tracing::info!(
                stages = ?added,
                current = %self.current_stage(),
                "session stages completed"
            );
        }
        added
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    pub fn record_entities<I>(&mut self, entities: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.entities.extend(entities);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Checklist of the five stages plus tallies
    pub fn summary(&self) -> String {
        let mut out = String::from("Genesis session status:\n");
        for stage in Stage::LIFECYCLE {
            let mark = if self.is_completed(stage) { "[x]" } else { "[ ]" };
            out.push_str(&format!("{} {}\n", mark, stage.label()));
        }
        out.push_str(&format!("Errors: {}\n", self.error_count));
        out.push_str(&format!("Entities: {}", self.entities.len()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages(list: &[Stage]) -> BTreeSet<Stage> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_fresh_state() {
        let state = SessionState::new();
        assert_eq!(state.current_stage(), Stage::Uninitialized);
        assert_eq!(state.next_required_stage(), Stage::Initialized);
        assert!(state.can_execute(Stage::Initialized));
        assert!(state.can_execute(Stage::Stepping));
    }

    #[test]
    fn test_next_required_skips_gaps() {
        let mut state = SessionState::new();
        state.record_stages(&stages(&[Stage::Initialized, Stage::EntitiesAdded]));
        assert_eq!(state.next_required_stage(), Stage::SceneCreated);
        assert_eq!(state.current_stage(), Stage::EntitiesAdded);
    }

    #[test]
    fn test_next_required_all_done() {
        let mut state = SessionState::new();
        state.record_stages(&stages(&Stage::LIFECYCLE));
        assert_eq!(state.next_required_stage(), Stage::Stepping);
    }

    #[test]
    fn test_can_execute_forward_only() {
        let mut state = SessionState::new();
        state.record_stages(&stages(&[Stage::Initialized, Stage::SceneCreated]));
        assert!(!state.can_execute(Stage::Initialized));
        assert!(state.can_execute(Stage::SceneCreated));
        assert!(state.can_execute(Stage::Built));
    }

    #[test]
    fn test_stepping_requires_built() {
        let mut state = SessionState::new();
        let added = state.record_stages(&stages(&[Stage::Initialized, Stage::Stepping]));
        assert_eq!(added, stages(&[Stage::Initialized]));
        assert!(!state.is_completed(Stage::Stepping));

        let added = state.record_stages(&stages(&[Stage::Built, Stage::Stepping]));
        assert_eq!(added, stages(&[Stage::Built, Stage::Stepping]));
    }

    #[test]
    fn test_uninitialized_never_recorded() {
        let mut state = SessionState::new();
        state.record_stages(&stages(&[Stage::Uninitialized]));
        assert!(state.completed().is_empty());
    }

    #[test]
    fn test_summary_and_reset() {
        let mut state = SessionState::new();
        state.record_stages(&stages(&[Stage::Initialized]));
        state.record_error();
        state.record_entities([("plane".to_string(), "RigidEntity".to_string())]);
        let summary = state.summary();
        assert!(summary.contains("[x] Genesis Initialized"));
        assert!(summary.contains("[ ] Scene Built"));
        assert!(summary.contains("Errors: 1"));
        assert!(summary.contains("Entities: 1"));

        state.reset();
        assert!(state.completed().is_empty());
        assert_eq!(state.error_count(), 0);
        assert!(state.entities().is_empty());
    }
}
