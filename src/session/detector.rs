//! Stage detection strategies
//!
//! Both strategies read text and report the lifecycle stages it evidences.
//! Source detection answers "what will this fragment try to do" and is used
//! before execution. Output detection answers "what did the engine actually
//! finish" and is used after execution.
//!
//! Neither strategy understands Python. A marker inside a comment or string
//! still counts, and an engine banner that changes wording is missed.

use std::collections::BTreeSet;

use super::stage::Stage;

/// Pluggable stage detector
pub trait StageDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Stages evidenced by `text`; never includes `Uninitialized`
    fn detect(&self, text: &str) -> BTreeSet<Stage>;
}

// ============================================================================
// Source inspection
// ============================================================================

/// Call-site markers in fragment source
#[derive(Debug, Clone)]
pub struct SourceStageDetector {
    markers: Vec<(Stage, String)>,
}

impl SourceStageDetector {
    pub fn new(alias: &str) -> Self {
        let mut markers = vec![(Stage::Initialized, format!("{}.init(", alias))];
        if alias != "genesis" {
            markers.push((Stage::Initialized, "genesis.init(".to_string()));
        }
        markers.push((Stage::SceneCreated, format!("{}.Scene(", alias)));
        if alias != "genesis" {
            markers.push((Stage::SceneCreated, "genesis.Scene(".to_string()));
        }
        markers.push((Stage::EntitiesAdded, ".add_entity(".to_string()));
        markers.push((Stage::Built, ".build(".to_string()));
        markers.push((Stage::Stepping, ".step(".to_string()));
        Self { markers }
    }

    /// Stages whose marker occurs on this single line
    pub fn line_stages(&self, line: &str) -> BTreeSet<Stage> {
        let compact = strip_call_whitespace(line);
        self.markers
            .iter()
            .filter(|(_, marker)| compact.contains(marker.as_str()))
            .map(|(stage, _)| *stage)
            .collect()
    }
}

impl Default for SourceStageDetector {
    fn default() -> Self {
        Self::new("gs")
    }
}

impl StageDetector for SourceStageDetector {
    fn name(&self) -> &'static str {
        "source"
    }

    fn detect(&self, text: &str) -> BTreeSet<Stage> {
        text.lines().flat_map(|line| self.line_stages(line)).collect()
    }
}

/// `scene.build ()` and `gs . init(` still count as calls
fn strip_call_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let chars: Vec<char> = line.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_whitespace() {
            let prev = out.chars().last();
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(prev, Some('.')) || matches!(next, Some('.') | Some('(')) {
                continue;
            }
        }
        out.push(*c);
    }
    out
}

// ============================================================================
// Captured-output inspection
// ============================================================================

/// Engine log banners in captured stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputStageDetector;

impl OutputStageDetector {
    pub fn line_stages(&self, line: &str) -> BTreeSet<Stage> {
        let mut stages = BTreeSet::new();
        if line.contains("Genesis initialized") {
            stages.insert(Stage::Initialized);
        }
        if line.contains("Scene <") && line.contains("> created.") {
            stages.insert(Stage::SceneCreated);
        }
        if line.contains("Adding <gs.") {
            stages.insert(Stage::EntitiesAdded);
        }
        if line.contains("Viewer created.") || line.contains("Compiling simulation kernels...") {
            stages.insert(Stage::Built);
        }
        if line.contains("Running at") && line.contains("FPS") {
            stages.insert(Stage::Stepping);
        }
        stages
    }

    pub fn detect_lines<S: AsRef<str>>(&self, lines: &[S]) -> BTreeSet<Stage> {
        lines
            .iter()
            .flat_map(|l| self.line_stages(l.as_ref()))
            .collect()
    }
}

impl StageDetector for OutputStageDetector {
    fn name(&self) -> &'static str {
        "output"
    }

    fn detect(&self, text: &str) -> BTreeSet<Stage> {
        text.lines().flat_map(|line| self.line_stages(line)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(stages: &[Stage]) -> BTreeSet<Stage> {
        stages.iter().copied().collect()
    }

    #[test]
    fn test_source_detects_full_program() {
        let code = "import genesis as gs\n\
                    gs.init(backend=gs.gpu)\n\
                    scene = gs.Scene(show_viewer=False)\n\
                    plane = scene.add_entity(gs.morphs.Plane())\n\
                    scene.build()\n\
                    for i in range(10):\n    scene.step()\n";
        assert_eq!(
            SourceStageDetector::default().detect(code),
            set(&Stage::LIFECYCLE)
        );
    }

    #[test]
    fn test_source_alias_and_full_module_name() {
        let detector = SourceStageDetector::new("g");
        assert_eq!(detector.detect("g.init()"), set(&[Stage::Initialized]));
        assert_eq!(detector.detect("genesis.init()"), set(&[Stage::Initialized]));
        assert!(detector.detect("gs.init()").is_empty());
    }

    #[test]
    fn test_source_tolerates_spacing() {
        let detector = SourceStageDetector::default();
        assert_eq!(detector.detect("scene.build ()"), set(&[Stage::Built]));
        assert_eq!(detector.detect("gs . init(backend=gs.cpu)"), set(&[Stage::Initialized]));
    }

    #[test]
    fn test_source_counts_comments() {
        // comments are not stripped; a commented call still reads as an attempt
        let detector = SourceStageDetector::default();
        assert_eq!(detector.detect("# gs.init()"), set(&[Stage::Initialized]));
    }

    #[test]
    fn test_output_banners() {
        let logs = [
            "[Genesis] [INFO] 🚀 Genesis initialized. 🔖 version: 0.2.1",
            "[Genesis] [INFO] Scene <a1b2c3> created.",
            "[Genesis] [INFO] Adding <gs.RigidEntity>, idx: 0, morph: <gs.morphs.Plane>",
            "[Genesis] [INFO] Building scene <a1b2c3>...",
            "[Genesis] [INFO] Compiling simulation kernels...",
            "[Genesis] [INFO] Running at 512.33 FPS.",
        ];
        assert_eq!(
            OutputStageDetector.detect_lines(&logs),
            set(&Stage::LIFECYCLE)
        );
    }

    #[test]
    fn test_output_ignores_building_banner_alone() {
        let logs = ["[Genesis] [INFO] Building scene <a1b2c3>..."];
        assert!(OutputStageDetector.detect_lines(&logs).is_empty());
    }

    #[test]
    fn test_detectors_behind_trait() {
        let detectors: Vec<Box<dyn StageDetector>> = vec![
            Box::new(SourceStageDetector::default()),
            Box::new(OutputStageDetector),
        ];
        let names: Vec<_> = detectors.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["source", "output"]);
        assert_eq!(
            detectors[1].detect("Viewer created.\n"),
            set(&[Stage::Built])
        );
    }
}
