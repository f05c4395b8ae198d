//! Engine constraint catalog
//!
//! Static knowledge about which lifecycle operations may run once, which are
//! tied to the build step, and which API names models tend to invent.

use serde::Serialize;

use super::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// May succeed at most once per session
    OneShot,
    /// Legal only while the scene is unbuilt
    BeforeBuild,
    /// Legal only after the scene is built; repeatable
    AfterBuild,
    /// Repeatable and unordered relative to build
    AlwaysSafe,
}

#[derive(Debug, Clone, Serialize)]
pub struct Constraint {
    pub stage: Stage,
    pub call: &'static str,
    pub kind: ConstraintKind,
    pub note: &'static str,
}

const CONSTRAINTS: &[Constraint] = &[
    Constraint {
        stage: Stage::Initialized,
        call: "gs.init()",
        kind: ConstraintKind::OneShot,
        note: "may run only once per session",
    },
    Constraint {
        stage: Stage::SceneCreated,
        call: "gs.Scene()",
        kind: ConstraintKind::AlwaysSafe,
        note: "must come after gs.init() and before entities are added",
    },
    Constraint {
        stage: Stage::EntitiesAdded,
        call: "scene.add_entity()",
        kind: ConstraintKind::BeforeBuild,
        note: "only legal before scene.build()",
    },
    Constraint {
        stage: Stage::Built,
        call: "scene.build()",
        kind: ConstraintKind::OneShot,
        note: "may run only once per scene",
    },
    Constraint {
        stage: Stage::Stepping,
        call: "scene.step()",
        kind: ConstraintKind::AfterBuild,
        note: "only legal after scene.build(); safe to repeat",
    },
];

/// Method names that do not exist, paired with the API to use instead
pub const FORBIDDEN_APIS: &[(&str, &str)] = &[
    (
        "franka.get_motors_dof_indices()",
        "[franka.get_joint(name).dofs_idx_local[0] for name in joints_name]",
    ),
    ("franka.set_motor_pid()", "franka.set_dofs_kp() / franka.set_dofs_kv()"),
    (
        "franka.set_joint_target_positions()",
        "franka.control_dofs_position(targets, motors_dof_idx)",
    ),
    ("entity.robot", "use the entity returned by scene.add_entity()"),
    ("gs.morphs.Cube()", "gs.morphs.Box(size=(w, d, h), pos=(x, y, z))"),
    ("gs.morphs.Rectangle()", "gs.morphs.Box(size=(w, d, h), pos=(x, y, z))"),
    ("gs.morphs.Cuboid()", "gs.morphs.Box(size=(w, d, h), pos=(x, y, z))"),
];

/// Read-only view over the catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintCatalog;

impl ConstraintCatalog {
    pub fn constraints(&self) -> &'static [Constraint] {
        CONSTRAINTS
    }

    pub fn kind(&self, stage: Stage) -> ConstraintKind {
        CONSTRAINTS
            .iter()
            .find(|c| c.stage == stage)
            .map(|c| c.kind)
            .unwrap_or(ConstraintKind::AlwaysSafe)
    }

    pub fn is_one_shot(&self, stage: Stage) -> bool {
        self.kind(stage) == ConstraintKind::OneShot
    }

    pub fn one_shot_stages(&self) -> impl Iterator<Item = Stage> {
        CONSTRAINTS
            .iter()
            .filter(|c| c.kind == ConstraintKind::OneShot)
            .map(|c| c.stage)
    }

    /// Constraint block for the prompt
    pub fn describe(&self, alias: &str) -> String {
        let mut out = String::from("# Genesis constraints:\n");
        out.push_str("# One-shot calls (never repeat):\n");
        for c in CONSTRAINTS.iter().filter(|c| c.kind == ConstraintKind::OneShot) {
            out.push_str(&format!("#   - {}: {}\n", aliased(c.call, alias), c.note));
        }
        out.push_str("# Ordering:\n");
        for c in CONSTRAINTS.iter().filter(|c| c.kind != ConstraintKind::OneShot) {
            out.push_str(&format!("#   - {}: {}\n", aliased(c.call, alias), c.note));
        }
        out.push_str("# Imports:\n");
        out.push_str(&format!("#   - correct: import genesis as {}\n", alias));
        out.push_str(&format!("#   - wrong:   import genesis_sim as {}\n", alias));
        out
    }

    /// Forbidden-API advisory for the prompt
    pub fn forbidden_apis(&self, alias: &str) -> String {
        let mut out = String::from("# APIs that do NOT exist (never use them):\n");
        for (wrong, right) in FORBIDDEN_APIS {
            out.push_str(&format!(
                "#   x {}  ->  use {}\n",
                aliased(wrong, alias),
                aliased(right, alias)
            ));
        }
        out
    }
}

/// Rewrite the canonical `gs.` prefix to the configured alias
fn aliased(text: &str, alias: &str) -> String {
    if alias == "gs" {
        text.to_string()
    } else {
        text.replace("gs.", &format!("{}.", alias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_stages() {
        let catalog = ConstraintCatalog;
        let stages: Vec<Stage> = catalog.one_shot_stages().collect();
        assert_eq!(stages, vec![Stage::Initialized, Stage::Built]);
        assert_eq!(catalog.kind(Stage::EntitiesAdded), ConstraintKind::BeforeBuild);
        assert_eq!(catalog.kind(Stage::Uninitialized), ConstraintKind::AlwaysSafe);
    }

    #[test]
    fn test_describe_mentions_one_shots() {
        let text = ConstraintCatalog.describe("gs");
        assert!(text.contains("gs.init()"));
        assert!(text.contains("scene.build()"));
        assert!(text.contains("import genesis as gs"));
    }

    #[test]
    fn test_forbidden_apis_alias() {
        let text = ConstraintCatalog.forbidden_apis("genesis");
        assert!(text.contains("genesis.morphs.Cube()"));
        assert!(text.contains("genesis.morphs.Box"));
    }
}
