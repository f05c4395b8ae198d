use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Engine lifecycle milestone, totally ordered
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Uninitialized,
    Initialized,
    SceneCreated,
    EntitiesAdded,
    Built,
    Stepping,
}

impl Stage {
    /// Stages that can be witnessed complete, in order
    pub const LIFECYCLE: [Stage; 5] = [
        Stage::Initialized,
        Stage::SceneCreated,
        Stage::EntitiesAdded,
        Stage::Built,
        Stage::Stepping,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Uninitialized => "uninitialized",
            Stage::Initialized => "initialized",
            Stage::SceneCreated => "scene_created",
            Stage::EntitiesAdded => "entities_added",
            Stage::Built => "built",
            Stage::Stepping => "stepping",
        }
    }

    /// Human-readable label used in prompts and summaries
    pub fn description(&self) -> &'static str {
        match self {
            Stage::Uninitialized => "Nothing executed yet",
            Stage::Initialized => "Genesis initialization (gs.init)",
            Stage::SceneCreated => "Scene creation (gs.Scene)",
            Stage::EntitiesAdded => "Entity addition (scene.add_entity)",
            Stage::Built => "Scene build (scene.build)",
            Stage::Stepping => "Simulation stepping (scene.step)",
        }
    }

    /// Short label for status checklists
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Uninitialized => "Uninitialized",
            Stage::Initialized => "Genesis Initialized",
            Stage::SceneCreated => "Scene Created",
            Stage::EntitiesAdded => "Entities Added",
            Stage::Built => "Scene Built",
            Stage::Stepping => "Simulation Running",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown stage '{0}'")]
pub struct ParseStageError(String);

impl FromStr for Stage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "uninitialized" => Ok(Stage::Uninitialized),
            "initialized" | "init" => Ok(Stage::Initialized),
            "scene_created" | "scene_creation" => Ok(Stage::SceneCreated),
            "entities_added" | "entity_addition" => Ok(Stage::EntitiesAdded),
            "built" | "scene_build" => Ok(Stage::Built),
            "stepping" | "simulation" => Ok(Stage::Stepping),
            other => Err(ParseStageError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        assert!(Stage::Uninitialized < Stage::Initialized);
        assert!(Stage::EntitiesAdded < Stage::Built);
        assert!(Stage::Built < Stage::Stepping);
        let mut sorted = Stage::LIFECYCLE;
        sorted.sort();
        assert_eq!(sorted, Stage::LIFECYCLE);
    }

    #[test]
    fn test_round_trip_names() {
        for stage in Stage::LIFECYCLE {
            assert_eq!(stage.name().parse::<Stage>().unwrap(), stage);
        }
        assert_eq!("scene_build".parse::<Stage>().unwrap(), Stage::Built);
        assert!("warp".parse::<Stage>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Stage::SceneCreated).unwrap();
        assert_eq!(json, "\"scene_created\"");
    }
}
