//! Scripted offline engine
//!
//! Interprets the handful of statement shapes generated programs actually
//! use and prints the same banners the real engine logs. It enforces the
//! engine's own rules (init once, build once, no entities after build, no
//! stepping before build) by raising, so gate and executor behavior can be
//! exercised without Python.
//!
//! Control flow is not evaluated: a loop body runs once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::gate::statement_spans;
use super::runtime::{RawExecution, RuntimeInfo, SimulationRuntime};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::session::{SourceStageDetector, Stage};

static CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z_]\w*\s*=\s*)?([A-Za-z_]\w*)\s*\.\s*[\w.]+\s*\(").unwrap()
});

static ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*=([^=].*)$").unwrap());

static RAISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^raise\s+([A-Za-z_]\w*)\s*(?:\(\s*(?:[rbf]?["'](.*)["'])?\s*\))?\s*$"#).unwrap()
});

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:import\s+([\w.]+)(?:\s+as\s+(\w+))?|from\s+([\w.]+)\s+import\s+(.+))$").unwrap()
});

static MORPH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"morphs\.(\w+)").unwrap());

static PRINT_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^print\(\s*f?["'](.*)["']\s*\)$"#).unwrap());

const AVAILABLE_MODULES: &[&str] = &["numpy", "math", "time", "random", "os", "sys"];

const INVALID_MORPHS: &[&str] = &["Cube", "Rectangle", "Cuboid"];

const BLOCK_KEYWORDS: &[&str] = &[
    "for", "while", "if", "elif", "else", "try", "except", "finally", "with", "def", "pass",
    "break", "continue", "return",
];

struct Raised {
    kind: String,
    message: String,
}

fn raise(kind: &str, message: impl Into<String>) -> Raised {
    Raised {
        kind: kind.to_string(),
        message: message.into(),
    }
}

/// Deterministic stand-in for the engine
pub struct ScriptedRuntime {
    module: String,
    alias: String,
    detector: SourceStageDetector,
    initialized: bool,
    built: bool,
    scene_id: u32,
    entity_count: usize,
    /// Every defined name, modules included
    names: BTreeSet<String>,
    /// Public non-module names and their type
    bindings: BTreeMap<String, String>,
}

impl ScriptedRuntime {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            module: config.module.clone(),
            alias: config.alias.clone(),
            detector: SourceStageDetector::new(&config.alias),
            initialized: false,
            built: false,
            scene_id: 0,
            entity_count: 0,
            names: BTreeSet::from([config.alias.clone()]),
            bindings: BTreeMap::new(),
        }
    }

    fn run(&mut self, code: &str, out: &mut Vec<String>) -> Result<(), (usize, Raised)> {
        let mut stepped = false;
        for (line_no, statement) in statements(code) {
            self.statement(&statement, &mut stepped, out)
                .map_err(|raised| (line_no, raised))?;
        }
        Ok(())
    }

    fn statement(
        &mut self,
        statement: &str,
        stepped: &mut bool,
        out: &mut Vec<String>,
    ) -> Result<(), Raised> {
        if let Some(caps) = IMPORT.captures(statement) {
            return self.import(&caps);
        }
        if let Some(caps) = RAISE.captures(statement) {
            let message = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            return Err(raise(&caps[1], message));
        }
        if statement.starts_with("print(") {
            let text = PRINT_LITERAL
                .captures(statement)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| {
                    statement
                        .strip_prefix("print(")
                        .and_then(|rest| rest.strip_suffix(')'))
                        .unwrap_or(statement)
                        .to_string()
                });
            out.push(text);
            return Ok(());
        }
        let head: String = statement
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if BLOCK_KEYWORDS.contains(&head.as_str()) {
            return Ok(());
        }

        if let Some(caps) = CALL.captures(statement) {
            let receiver = &caps[1];
            if !self.names.contains(receiver) {
                return Err(raise("NameError", format!("name '{}' is not defined", receiver)));
            }
        }

        let stages = self.detector.line_stages(statement);
        let mut bound_type = None;
        for stage in stages {
            match stage {
                Stage::Initialized => {
                    if self.initialized {
                        return Err(raise("GenesisException", "Genesis already initialized."));
                    }
                    self.initialized = true;
                    out.push(
                        "[Genesis] [INFO] Genesis initialized. version: scripted, backend: cpu"
                            .to_string(),
                    );
                }
                Stage::SceneCreated => {
                    if !self.initialized {
                        return Err(raise(
                            "GenesisException",
                            "Genesis hasn't been initialized. Did you call `gs.init()`?",
                        ));
                    }
                    self.scene_id += 1;
                    self.built = false;
                    self.entity_count = 0;
                    out.push(format!("[Genesis] [INFO] Scene <{}> created.", self.scene_hex()));
                    bound_type = Some("Scene");
                }
                Stage::EntitiesAdded => {
                    if self.built {
                        return Err(raise(
                            "GenesisException",
                            "Adding entities to the scene is not allowed after scene is built.",
                        ));
                    }
                    let morph = MORPH
                        .captures(statement)
                        .map(|c| c[1].to_string())
                        .unwrap_or_else(|| "Mesh".to_string());
                    if INVALID_MORPHS.contains(&morph.as_str()) {
                        return Err(raise(
                            "AttributeError",
                            format!("module 'genesis.morphs' has no attribute '{}'", morph),
                        ));
                    }
                    out.push(format!(
                        "[Genesis] [INFO] Adding <gs.RigidEntity>, idx: {}, morph: <gs.morphs.{}>.",
                        self.entity_count, morph
                    ));
                    self.entity_count += 1;
                    bound_type = Some("RigidEntity");
                }
                Stage::Built => {
                    if self.built {
                        return Err(raise("GenesisException", "Scene is already built."));
                    }
                    self.built = true;
                    out.push(format!("[Genesis] [INFO] Building scene <{}>...", self.scene_hex()));
                    out.push("[Genesis] [INFO] Compiling simulation kernels...".to_string());
                }
                Stage::Stepping => {
                    if !self.built {
                        return Err(raise("GenesisException", "Scene is not built yet."));
                    }
                    if !*stepped {
                        *stepped = true;
                        out.push("[Genesis] [INFO] Running at 60.00 FPS.".to_string());
                    }
                }
                Stage::Uninitialized => {}
            }
        }

        if let Some(caps) = ASSIGN.captures(statement) {
            let name = caps[1].to_string();
            let kind = bound_type.unwrap_or_else(|| literal_type(caps[2].trim()));
            self.bind(name, kind);
        }
        Ok(())
    }

    fn import(&mut self, caps: &regex::Captures<'_>) -> Result<(), Raised> {
        if let Some(module) = caps.get(1) {
            let module = module.as_str();
            self.check_module(module)?;
            let bound = caps
                .get(2)
                .map(|m| m.as_str())
                .unwrap_or_else(|| module.split('.').next().unwrap_or(module));
            self.names.insert(bound.to_string());
        } else if let (Some(module), Some(names)) = (caps.get(3), caps.get(4)) {
            self.check_module(module.as_str())?;
            for name in names.as_str().split(',') {
                let name = name.split(" as ").last().unwrap_or(name).trim();
                if !name.is_empty() && name != "*" {
                    self.names.insert(name.to_string());
                }
            }
        }
        Ok(())
    }

    fn check_module(&self, module: &str) -> Result<(), Raised> {
        let root = module.split('.').next().unwrap_or(module);
        if root == self.module || AVAILABLE_MODULES.contains(&root) {
            Ok(())
        } else {
            Err(raise(
                "ModuleNotFoundError",
                format!("No module named '{}'", root),
            ))
        }
    }

    fn bind(&mut self, name: String, kind: &str) {
        self.names.insert(name.clone());
        self.bindings.insert(name, kind.to_string());
    }

    fn scene_hex(&self) -> String {
        format!("{:06x}", 0x5ce000 + self.scene_id)
    }
}

#[async_trait]
impl SimulationRuntime for ScriptedRuntime {
    async fn execute(&mut self, code: &str, capture: bool) -> Result<RawExecution, RuntimeError> {
        let mut out = Vec::new();
        let result = self.run(code, &mut out);
        for line in &out {
            tracing::debug!(target: "genesis_mcp::worker", "{}", line);
        }

        let stdout = if capture && !out.is_empty() {
            format!("{}\n", out.join("\n"))
        } else {
            String::new()
        };

        let mut raw = RawExecution {
            ok: true,
            stdout,
            bindings: self.bindings.clone(),
            ..Default::default()
        };
        if let Err((line_no, raised)) = result {
            raw.ok = false;
            raw.traceback = Some(format!(
                "Traceback (most recent call last):\n  File \"<fragment>\", line {}, in <module>\n{}: {}",
                line_no, raised.kind, raised.message
            ));
            raw.error = Some(raised.message);
            raw.error_type = Some(raised.kind);
        }
        Ok(raw)
    }

    async fn reset(&mut self) -> Result<(), RuntimeError> {
        let config = RuntimeConfig {
            module: self.module.clone(),
            alias: self.alias.clone(),
            ..RuntimeConfig::default()
        };
        *self = Self::new(&config);
        Ok(())
    }

    fn describe(&self) -> RuntimeInfo {
        RuntimeInfo {
            kind: "scripted",
            command: "builtin".to_string(),
            module: self.module.clone(),
            alias: self.alias.clone(),
        }
    }
}

/// Logical statements with their 1-based starting line; comments removed,
/// bracketed continuations joined
fn statements(code: &str) -> Vec<(usize, String)> {
    let lines: Vec<&str> = code.lines().collect();
    statement_spans(&lines)
        .into_iter()
        .filter_map(|span| {
            let start = span.start + 1;
            let joined = lines[span]
                .iter()
                .map(|l| strip_comment(l).trim())
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.trim().is_empty()).then_some((start, joined))
        })
        .collect()
}

fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '#') => return &line[..i],
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    line
}

fn literal_type(rhs: &str) -> &'static str {
    let first = rhs.chars().next().unwrap_or(' ');
    if rhs.starts_with(['"', '\'']) {
        "str"
    } else if first.is_ascii_digit() || first == '-' {
        if rhs.contains('.') {
            "float"
        } else {
            "int"
        }
    } else if rhs.starts_with('[') {
        "list"
    } else if rhs.starts_with('(') {
        "tuple"
    } else if rhs.starts_with('{') {
        "dict"
    } else if rhs == "True" || rhs == "False" {
        "bool"
    } else {
        "object"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> ScriptedRuntime {
        ScriptedRuntime::new(&RuntimeConfig::default())
    }

    const PROGRAM: &str = "import genesis as gs
gs.init(backend=gs.cpu)
scene = gs.Scene(
    show_viewer=False,  # headless
)
plane = scene.add_entity(gs.morphs.Plane())
scene.build()
for i in range(10):
    scene.step()
";

    #[tokio::test]
    async fn test_full_program_banners() {
        let mut rt = runtime();
        let raw = rt.execute(PROGRAM, true).await.unwrap();
        assert!(raw.ok, "{:?}", raw.error);
        assert!(raw.stdout.contains("Genesis initialized"));
        assert!(raw.stdout.contains("Scene <5ce001> created."));
        assert!(raw.stdout.contains("Adding <gs.RigidEntity>, idx: 0, morph: <gs.morphs.Plane>"));
        assert!(raw.stdout.contains("Compiling simulation kernels..."));
        assert_eq!(raw.stdout.matches("Running at").count(), 1);
        assert_eq!(raw.bindings.get("scene").map(String::as_str), Some("Scene"));
        assert_eq!(raw.bindings.get("plane").map(String::as_str), Some("RigidEntity"));
        assert!(!raw.bindings.contains_key("gs"));
    }

    #[tokio::test]
    async fn test_duplicate_init_raises() {
        let mut rt = runtime();
        rt.execute("gs.init()", true).await.unwrap();
        let raw = rt.execute("gs.init()", true).await.unwrap();
        assert!(!raw.ok);
        assert_eq!(raw.error_type.as_deref(), Some("GenesisException"));
    }

    #[tokio::test]
    async fn test_raise_keeps_partial_output() {
        let mut rt = runtime();
        let raw = rt
            .execute("gs.init()\nx = 1\nraise ValueError(\"boom\")\ny = 2", true)
            .await
            .unwrap();
        assert!(!raw.ok);
        assert_eq!(raw.error.as_deref(), Some("boom"));
        assert_eq!(raw.error_type.as_deref(), Some("ValueError"));
        assert!(raw.stdout.contains("Genesis initialized"));
        assert!(raw.bindings.contains_key("x"));
        assert!(!raw.bindings.contains_key("y"));
        let tb = raw.traceback.unwrap();
        assert!(tb.contains("line 3"));
        assert!(tb.ends_with("ValueError: boom"));
    }

    #[tokio::test]
    async fn test_engine_rules() {
        let mut rt = runtime();
        rt.execute(PROGRAM, true).await.unwrap();

        let raw = rt.execute("box = scene.add_entity(gs.morphs.Box())", true).await.unwrap();
        assert!(raw.error.unwrap().contains("after scene is built"));

        let raw = rt.execute("scene.build()", true).await.unwrap();
        assert_eq!(raw.error.as_deref(), Some("Scene is already built."));

        let raw = rt.execute("scene.step()", true).await.unwrap();
        assert!(raw.ok);
    }

    #[tokio::test]
    async fn test_invalid_morph_and_unknown_name() {
        let mut rt = runtime();
        rt.execute("gs.init()\nscene = gs.Scene()", true).await.unwrap();
        let raw = rt.execute("cube = scene.add_entity(gs.morphs.Cube())", true).await.unwrap();
        assert_eq!(raw.error_type.as_deref(), Some("AttributeError"));

        let raw = rt.execute("franka.set_dofs_kp([1])", true).await.unwrap();
        assert_eq!(raw.error.as_deref(), Some("name 'franka' is not defined"));

        let raw = rt.execute("import genesis_sim as gs", true).await.unwrap();
        assert_eq!(raw.error_type.as_deref(), Some("ModuleNotFoundError"));
    }

    #[tokio::test]
    async fn test_capture_off_and_reset() {
        let mut rt = runtime();
        let raw = rt.execute("gs.init()\nprint('hi')", false).await.unwrap();
        assert!(raw.ok);
        assert!(raw.stdout.is_empty());

        rt.reset().await.unwrap();
        let raw = rt.execute("gs.init()\nprint('hi')", true).await.unwrap();
        assert!(raw.ok);
        assert!(raw.stdout.ends_with("hi\n"));
    }

    #[test]
    fn test_statement_joining() {
        let parts = statements("a = f(\n  1,  # one\n  2)\n\nb = 'x#y'\n");
        assert_eq!(parts, vec![(1, "a = f( 1, 2)".to_string()), (5, "b = 'x#y'".to_string())]);
    }
}
