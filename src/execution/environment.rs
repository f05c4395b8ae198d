//! Mirror of the session namespace
//!
//! The runtime owns the live objects; this keeps the public names and their
//! type names so new entities can be counted per fragment.

use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ExecutionEnvironment {
    alias: String,
    bindings: BTreeMap<String, String>,
}

impl ExecutionEnvironment {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    /// Fold a namespace snapshot in; returns names not seen before, minus the
    /// library handle and the shared `scene`
    pub fn absorb(&mut self, snapshot: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut fresh = BTreeMap::new();
        for (name, kind) in snapshot {
            let known = self.bindings.insert(name.clone(), kind.clone()).is_some();
            if !known && name != &self.alias && name != "scene" {
                fresh.insert(name.clone(), kind.clone());
            }
        }
        fresh
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}
