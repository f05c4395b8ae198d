//! Code fragment extraction from model output
//!
//! Rules are tried in order and the first non-empty match wins:
//!
//! 1. `"""GENESIS_CODE ... """` marker block
//! 2. fenced block tagged `python` / `py`
//! 3. untagged fenced block that mentions the engine
//! 4. line scan from the first import-like statement
//!
//! Every match is cleaned the same way. When nothing matches, the input is
//! returned unchanged and the method is [`ExtractionMethod::None`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static MARKER_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"""GENESIS_CODE[ \t]*\r?\n(.*?)\s*""""#).unwrap());

static TAGGED_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:python|py)[ \t]*\r?\n(.*?)```").unwrap());

static UNTAGGED_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[ \t]*\r?\n(.*?)```").unwrap());

static WHOLE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A```(?:python|py)?[ \t]*\r?\n(.*?)\r?\n?```\z").unwrap()
});

static CODE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][\w.\[\]]*(\s*,\s*[A-Za-z_][\w.\[\]]*)*\s*([-+*/]?=|\()").unwrap()
});

static WRONG_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bgenesis_sim\b").unwrap());

static CTRL_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<ctrl\d+>").unwrap());

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:br|p|div|span|code|pre|b|i|em|strong|ul|ol|li|h[1-6]|html|body|think)\s*/?>",
    )
    .unwrap()
});

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

const ENGINE_HINTS: &[&str] = &["import genesis", "gs.", "scene"];

const STATEMENT_KEYWORDS: &[&str] = &[
    "def ", "class ", "if ", "for ", "while ", "else", "elif ", "try", "except", "finally",
    "with ", "return", "pass", "break", "continue", "import ", "from ", "print(", "assert ",
    "raise", "del ", "global ", "nonlocal ", "lambda", "yield", "await ", "async ", "match ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Marker,
    TaggedFence,
    UntaggedFence,
    ImportScan,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub method: ExtractionMethod,
    pub code: String,
}

impl Extraction {
    pub fn found(&self) -> bool {
        self.method != ExtractionMethod::None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CodeExtractor;

impl CodeExtractor {
    pub fn extract(&self, text: &str) -> String {
        self.extract_detailed(text).code
    }

    /// Code a caller supplied directly. Only a single enclosing fence is
    /// removed; the body is never scanned or cleaned.
    pub fn client_code(&self, text: &str) -> String {
        let trimmed = text.trim();
        match WHOLE_FENCE.captures(trimmed) {
            Some(c) if !c[1].contains("```") => c[1].trim().to_string(),
            _ => trimmed.to_string(),
        }
    }

    pub fn extract_detailed(&self, text: &str) -> Extraction {
        let candidates: [(ExtractionMethod, fn(&str) -> Option<String>); 4] = [
            (ExtractionMethod::Marker, marker_block),
            (ExtractionMethod::TaggedFence, tagged_fence),
            (ExtractionMethod::UntaggedFence, untagged_fence),
            (ExtractionMethod::ImportScan, import_scan),
        ];

        for (method, rule) in candidates {
            if let Some(raw) = rule(text) {
                let code = clean(&raw);
                if !code.is_empty() {
                    tracing::debug!(?method, chars = code.len(), "code extracted");
                    return Extraction { method, code };
                }
            }
        }

        tracing::debug!("no code fragment found in model output");
        Extraction {
            method: ExtractionMethod::None,
            code: text.to_string(),
        }
    }
}

fn marker_block(text: &str) -> Option<String> {
    MARKER_BLOCK.captures(text).map(|c| c[1].to_string())
}

fn tagged_fence(text: &str) -> Option<String> {
    TAGGED_FENCE.captures(text).map(|c| c[1].to_string())
}

fn untagged_fence(text: &str) -> Option<String> {
    UNTAGGED_FENCE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .find(|block| ENGINE_HINTS.iter().any(|hint| block.contains(hint)))
}

fn import_scan(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|l| starts_fragment(l.trim_start()))?;

    let mut taken = Vec::new();
    for line in &lines[start..] {
        if !taken.is_empty() && !continues_fragment(line) {
            break;
        }
        taken.push(*line);
    }
    Some(taken.join("\n"))
}

fn starts_fragment(line: &str) -> bool {
    line.starts_with("import ")
        || line.starts_with("from ")
        || line.starts_with("gs.")
        || line.starts_with("scene")
}

fn continues_fragment(line: &str) -> bool {
    if line.trim().is_empty() || line.starts_with(char::is_whitespace) {
        return true;
    }
    let line = line.trim_end();
    line.starts_with(['#', '@', '"', '\''])
        || line.starts_with([')', ']', '}'])
        || STATEMENT_KEYWORDS.iter().any(|k| line.starts_with(k))
        || CODE_LINE.is_match(line)
}

fn clean(raw: &str) -> String {
    let without_fences: Vec<&str> = raw
        .lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect();
    let text = without_fences.join("\n");

    let text = WRONG_IMPORT.replace_all(&text, "genesis");
    let text = CTRL_TOKEN.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    let text: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let text = BLANK_RUN.replace_all(&text, "\n\n");

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_fence_exact() {
        let text = "Here is code:\n```python\nimport genesis as gs\nx = 1\n```\nDone.";
        let result = CodeExtractor.extract_detailed(text);
        assert_eq!(result.method, ExtractionMethod::TaggedFence);
        assert_eq!(result.code, "import genesis as gs\nx = 1");
    }

    #[test]
    fn test_marker_wins_over_fence() {
        let text = "```python\nprint('fence')\n```\n\"\"\"GENESIS_CODE\nprint('marker')\n\"\"\"";
        let result = CodeExtractor.extract_detailed(text);
        assert_eq!(result.method, ExtractionMethod::Marker);
        assert_eq!(result.code, "print('marker')");
    }

    #[test]
    fn test_untagged_fence_needs_engine_call() {
        let text = "```\nls -la\n```\nthen\n```\nscene.step()\n```";
        let result = CodeExtractor.extract_detailed(text);
        assert_eq!(result.method, ExtractionMethod::UntaggedFence);
        assert_eq!(result.code, "scene.step()");
    }

    #[test]
    fn test_import_scan_stops_at_prose() {
        let text = "Sure!\nimport genesis as gs\n\ngs.init()\nfor i in range(3):\n    scene.step()\nThis runs the loop.";
        let result = CodeExtractor.extract_detailed(text);
        assert_eq!(result.method, ExtractionMethod::ImportScan);
        assert_eq!(
            result.code,
            "import genesis as gs\n\ngs.init()\nfor i in range(3):\n    scene.step()"
        );
    }

    #[test]
    fn test_import_scan_keeps_assignments_and_closers() {
        let text = "scene = gs.Scene(\n    show_viewer=False,\n)\nplane = scene.add_entity(gs.morphs.Plane())\nDone.";
        let code = CodeExtractor.extract(text);
        assert!(code.ends_with("plane = scene.add_entity(gs.morphs.Plane())"));
        assert!(code.contains(")\n"));
    }

    #[test]
    fn test_import_scan_keeps_top_level_statements() {
        let text = "Sure:\nimport genesis as gs\ngs.init()\nassert gs is not None\nscene = gs.Scene()\nscene.build()";
        assert_eq!(
            CodeExtractor.extract(text),
            "import genesis as gs\ngs.init()\nassert gs is not None\nscene = gs.Scene()\nscene.build()"
        );

        let text = "import genesis as gs\nif scene is None:\n    raise RuntimeError('no scene')\ndel tmp\nraise SystemExit\nscene.build()";
        assert!(CodeExtractor.extract(text).ends_with("del tmp\nraise SystemExit\nscene.build()"));
    }

    #[test]
    fn test_import_scan_keeps_decorators_and_docstrings() {
        let text = "import genesis as gs\n@staticmethod\ndef f():\n    pass\n\"\"\"notes\"\"\"\nscene.step()\nThat is all.";
        assert!(CodeExtractor.extract(text).ends_with("\"\"\"notes\"\"\"\nscene.step()"));
    }

    #[test]
    fn test_client_code_is_taken_verbatim() {
        let code = "x = 1\ngs.init()\nraise ValueError(\"boom\")\nNot python at all";
        assert_eq!(CodeExtractor.client_code(&format!("\n{}\n", code)), code);
    }

    #[test]
    fn test_client_code_unwraps_single_fence_only() {
        assert_eq!(
            CodeExtractor.client_code("```python\ngs.init()\nscene.step()\n```"),
            "gs.init()\nscene.step()"
        );
        let two = "```\na = 1\n```\n```\nb = 2\n```";
        assert_eq!(CodeExtractor.client_code(two), two);
    }

    #[test]
    fn test_cleanup() {
        let text = "```python\nimport genesis_sim as gs<ctrl42>\n<br>\n\n\n\nx = 1\u{0007}\n```";
        assert_eq!(CodeExtractor.extract(text), "import genesis as gs\n\nx = 1");
    }

    #[test]
    fn test_no_code_returns_input() {
        let text = "I cannot help with that.";
        let result = CodeExtractor.extract_detailed(text);
        assert_eq!(result.method, ExtractionMethod::None);
        assert!(!result.found());
        assert_eq!(result.code, text);
    }

    #[test]
    fn test_empty_fence_falls_through() {
        let text = "```python\n```\nimport genesis as gs";
        let result = CodeExtractor.extract_detailed(text);
        assert_eq!(result.method, ExtractionMethod::ImportScan);
        assert_eq!(result.code, "import genesis as gs");
    }
}
