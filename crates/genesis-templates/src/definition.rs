//! Template file format

use serde::{Deserialize, Serialize};

/// One YAML file: a category and its snippets
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateFile {
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub templates: Vec<TemplateEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
}

/// A named, categorized code snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub category: String,
    pub name: String,
    pub description: String,
    pub code: String,
}

impl Template {
    /// Leading `max_chars` characters of the code, with `...` appended when cut
    pub fn excerpt(&self, max_chars: usize) -> String {
        match self.code.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => format!("{}...", &self.code[..byte_idx]),
            None => self.code.clone(),
        }
    }

    /// `category.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.category, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(code: &str) -> Template {
        Template {
            category: "shapes".into(),
            name: "sphere".into(),
            description: String::new(),
            code: code.into(),
        }
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let t = sample("球体を作成する");
        assert_eq!(t.excerpt(2), "球体...");
        assert_eq!(t.excerpt(100), "球体を作成する");
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(sample("x").qualified_name(), "shapes.sphere");
    }
}
