//! Template registry and relevance ranking

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::definition::{Template, TemplateFile};
use crate::error::TemplateError;
use crate::keywords::expand_keywords;

/// Built-in corpus, in category order
const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("basic.yaml", include_str!("../templates/basic.yaml")),
    ("shapes.yaml", include_str!("../templates/shapes.yaml")),
    ("physics.yaml", include_str!("../templates/physics.yaml")),
    ("robots.yaml", include_str!("../templates/robots.yaml")),
    ("materials.yaml", include_str!("../templates/materials.yaml")),
    ("environments.yaml", include_str!("../templates/environments.yaml")),
    ("sensors.yaml", include_str!("../templates/sensors.yaml")),
    ("advanced.yaml", include_str!("../templates/advanced.yaml")),
];

/// A template with its score for one query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTemplate<'a> {
    pub template: &'a Template,
    pub score: usize,
}

/// Immutable template corpus keyed by category and name
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    /// Category names in load order; ranking ties fall back to this order
    categories: Vec<String>,
    templates: Vec<Template>,
}

impl TemplateRegistry {
    /// Load the corpus embedded in the crate
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_sources(BUILTIN_SOURCES.iter().copied())
    }

    /// Load from `(source_name, yaml)` pairs
    pub fn from_sources<'a, I>(sources: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut registry = Self::default();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for (source_name, yaml) in sources {
            let file: TemplateFile =
                serde_yaml::from_str(yaml).map_err(|e| TemplateError::Parse {
                    source_name: source_name.to_string(),
                    message: e.to_string(),
                })?;

            if !registry.categories.contains(&file.category) {
                registry.categories.push(file.category.clone());
            }

            for entry in file.templates {
                if entry.code.trim().is_empty() {
                    return Err(TemplateError::EmptyCode {
                        category: file.category.clone(),
                        name: entry.name,
                    });
                }
                if !seen.insert((file.category.clone(), entry.name.clone())) {
                    return Err(TemplateError::Duplicate {
                        category: file.category.clone(),
                        name: entry.name,
                    });
                }
                registry.templates.push(Template {
                    category: file.category.clone(),
                    name: entry.name,
                    description: entry.description,
                    code: entry.code,
                });
            }
        }

        tracing::debug!(
            categories = registry.categories.len(),
            templates = registry.templates.len(),
            "template registry loaded"
        );
        Ok(registry)
    }

    /// Category names in load order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Templates in one category; empty for an unknown category
    pub fn category(&self, name: &str) -> Vec<&Template> {
        self.templates.iter().filter(|t| t.category == name).collect()
    }

    pub fn get(&self, category: &str, name: &str) -> Option<&Template> {
        self.templates
            .iter()
            .find(|t| t.category == category && t.name == name)
    }

    /// Template names grouped by category
    pub fn index(&self) -> BTreeMap<String, Vec<String>> {
        let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for t in &self.templates {
            index.entry(t.category.clone()).or_default().push(t.name.clone());
        }
        index
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Rank templates against request keywords.
    ///
    /// Each expanded search term scores +3 when it appears in the template
    /// name and +1 for every occurrence in the code. Zero scores are dropped.
    /// Ties are ordered by category load order, then name.
    pub fn search(&self, keywords: &[&str], top_k: usize) -> Vec<ScoredTemplate<'_>> {
        let terms = expand_keywords(keywords);
        if terms.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut hits: Vec<ScoredTemplate<'_>> = self
            .templates
            .iter()
            .map(|template| ScoredTemplate {
                template,
                score: score(template, &terms),
            })
            .filter(|hit| hit.score > 0)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| {
                    self.category_rank(&a.template.category)
                        .cmp(&self.category_rank(&b.template.category))
                })
                .then_with(|| a.template.name.cmp(&b.template.name))
        });
        hits.truncate(top_k);
        hits
    }

    fn category_rank(&self, category: &str) -> usize {
        self.categories
            .iter()
            .position(|c| c == category)
            .unwrap_or(usize::MAX)
    }
}

fn score<'t>(template: &Template, terms: impl IntoIterator<Item = &'t String>) -> usize {
    let name = template.name.to_lowercase();
    let code = template.code.to_lowercase();
    terms
        .into_iter()
        .map(|term| {
            let name_hit = if name.contains(term.as_str()) { 3 } else { 0 };
            name_hit + code.matches(term.as_str()).count()
        })
        .sum()
}
