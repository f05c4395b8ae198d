//! Request keyword extraction
//!
//! Requests arrive in English or Japanese. Each rule maps a canonical keyword
//! to the surface forms that select it and to the extra search terms it
//! contributes when ranking templates.

use std::collections::BTreeSet;

struct KeywordRule {
    canonical: &'static str,
    synonyms: &'static [&'static str],
    expands_to: &'static [&'static str],
}

const RULES: &[KeywordRule] = &[
    KeywordRule {
        canonical: "sphere",
        synonyms: &["sphere", "ball", "球", "ボール"],
        expands_to: &[],
    },
    KeywordRule {
        canonical: "arm",
        synonyms: &["arm", "robot arm", "アーム", "ロボットアーム"],
        expands_to: &["franka"],
    },
    KeywordRule {
        canonical: "robot",
        synonyms: &["robot", "franka", "panda", "ロボット"],
        expands_to: &["franka", "arm", "manipulation", "control"],
    },
    KeywordRule {
        canonical: "plane",
        synonyms: &["plane", "ground", "floor", "地面", "床"],
        expands_to: &[],
    },
    KeywordRule {
        canonical: "build",
        synonyms: &["build", "construct", "ビルド", "構築"],
        expands_to: &[],
    },
    KeywordRule {
        canonical: "simulation",
        synonyms: &["simulation", "simulate", "step", "シミュレーション"],
        expands_to: &["step"],
    },
    KeywordRule {
        canonical: "run",
        synonyms: &["run", "execute", "start", "実行"],
        expands_to: &[],
    },
    KeywordRule {
        canonical: "box",
        synonyms: &["box", "cube", "block", "箱", "ボックス"],
        expands_to: &[],
    },
    KeywordRule {
        canonical: "cylinder",
        synonyms: &["cylinder", "円柱", "シリンダー"],
        expands_to: &[],
    },
    KeywordRule {
        canonical: "gravity",
        synonyms: &["gravity", "drop", "fall", "重力", "落下"],
        expands_to: &["drop"],
    },
    KeywordRule {
        canonical: "collision",
        synonyms: &["collision", "collide", "contact", "衝突", "接触"],
        expands_to: &["contact"],
    },
    KeywordRule {
        canonical: "joint",
        synonyms: &["joint", "dof", "関節", "ジョイント", "自由度"],
        expands_to: &["dof", "motors"],
    },
    KeywordRule {
        canonical: "position_control",
        synonyms: &[
            "position control",
            "control_dofs_position",
            "position",
            "位置制御",
            "位置",
        ],
        expands_to: &["position", "control"],
    },
    KeywordRule {
        canonical: "velocity_control",
        synonyms: &[
            "velocity control",
            "control_dofs_velocity",
            "velocity",
            "速度制御",
            "速度",
        ],
        expands_to: &["velocity", "control"],
    },
    KeywordRule {
        canonical: "force_control",
        synonyms: &[
            "force control",
            "control_dofs_force",
            "torque",
            "力制御",
            "トルク",
        ],
        expands_to: &["force", "torque"],
    },
    KeywordRule {
        canonical: "force",
        synonyms: &["force", "push", "外力"],
        expands_to: &["external"],
    },
    KeywordRule {
        canonical: "material",
        synonyms: &["material", "材質", "マテリアル"],
        expands_to: &["rigid"],
    },
    KeywordRule {
        canonical: "friction",
        synonyms: &["friction", "slippery", "摩擦"],
        expands_to: &[],
    },
    KeywordRule {
        canonical: "bouncy",
        synonyms: &["bouncy", "bounce", "elastic", "弾性", "反発"],
        expands_to: &["restitution"],
    },
    KeywordRule {
        canonical: "camera",
        synonyms: &["camera", "viewer", "render", "カメラ"],
        expands_to: &["viewer"],
    },
    KeywordRule {
        canonical: "lighting",
        synonyms: &["light", "lighting", "照明"],
        expands_to: &[],
    },
    KeywordRule {
        canonical: "sensor",
        synonyms: &["sensor", "lidar", "imu", "センサー"],
        expands_to: &["imu", "lidar", "contact"],
    },
    KeywordRule {
        canonical: "grasp",
        synonyms: &["grasp", "grip", "pick", "グラスプ", "掴"],
        expands_to: &["manipulation", "cube", "finger"],
    },
    KeywordRule {
        canonical: "terrain",
        synonyms: &["terrain", "heightfield", "地形"],
        expands_to: &["height"],
    },
    KeywordRule {
        canonical: "fluid",
        synonyms: &["fluid", "liquid", "water", "流体", "液体"],
        expands_to: &["sph"],
    },
    KeywordRule {
        canonical: "cloth",
        synonyms: &["cloth", "soft", "布"],
        expands_to: &["soft_body"],
    },
];

/// Canonical keywords that force the robot-control block into the prompt
const ROBOT_TRIGGERS: &[&str] = &[
    "robot",
    "joint",
    "position_control",
    "velocity_control",
    "force_control",
];

/// Canonical keywords mentioned in `text`, in rule order, without duplicates
pub fn extract_keywords(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    let keywords: Vec<&'static str> = RULES
        .iter()
        .filter(|rule| rule.synonyms.iter().any(|s| lowered.contains(s)))
        .map(|rule| rule.canonical)
        .collect();
    tracing::debug!(?keywords, "extracted request keywords");
    keywords
}

/// Search terms for ranking: each keyword plus its expansions
pub fn expand_keywords(keywords: &[&str]) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();
    for keyword in keywords {
        terms.insert(keyword.to_string());
        if let Some(rule) = RULES.iter().find(|r| r.canonical == *keyword) {
            terms.extend(rule.expands_to.iter().map(|t| t.to_string()));
        }
    }
    terms
}

/// Whether the request needs the mandatory robot-control template
pub fn is_robot_request(keywords: &[&str]) -> bool {
    keywords.iter().any(|k| ROBOT_TRIGGERS.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_english_and_japanese() {
        assert_eq!(
            extract_keywords("Drop a BALL on the floor"),
            vec!["sphere", "plane", "gravity"]
        );
        assert_eq!(extract_keywords("球を地面に落とす"), vec!["sphere", "plane"]);
    }

    #[test]
    fn test_extract_no_duplicates() {
        let kws = extract_keywords("robot robot franka panda");
        assert_eq!(kws.iter().filter(|k| **k == "robot").count(), 1);
    }

    #[test]
    fn test_extract_nothing() {
        assert!(extract_keywords("hello there").is_empty());
    }

    #[test]
    fn test_expand_keywords() {
        let terms = expand_keywords(&["robot"]);
        assert!(terms.contains("robot"));
        assert!(terms.contains("franka"));
        assert!(terms.contains("control"));
    }

    #[test]
    fn test_robot_trigger() {
        assert!(is_robot_request(&extract_keywords("関節を位置制御で動かす")));
        assert!(is_robot_request(&extract_keywords("move the franka arm")));
        assert!(!is_robot_request(&extract_keywords("a bouncy ball")));
    }
}
