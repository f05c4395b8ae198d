//! Prompt assembly
//!
//! [`PromptBuilder::build`] is deterministic: the same request, state and
//! history always produce the same prompt. Sections appear in a fixed order
//! so later, session-specific sections can override the generic guidance
//! above them.

use std::sync::Arc;

use genesis_templates::{extract_keywords, is_robot_request, TemplateRegistry};

use crate::session::{ConstraintCatalog, ConversationHistory, SessionState};

/// System message sent alongside every prompt
pub const SYSTEM_PROMPT: &str = "You are an expert in the Genesis physics simulation library. \
You write Python that is executed directly, one fragment at a time, against a live session \
whose earlier fragments have already run. Follow the constraints you are given exactly. \
Return only code, wrapped in a ```python fenced block.";

const BASIC_TEMPLATE: &str = r#"# Genesis basic template
import genesis as gs

# 1. Initialization (only once per session)
gs.init(backend=gs.gpu)  # or gs.cpu

# 2. Scene creation
scene = gs.Scene(
    viewer_options=gs.options.ViewerOptions(
        resolution=(800, 600),
        max_FPS=30,
    ),
    show_viewer=True,
)

# 3. Entities (only before scene.build())
plane = scene.add_entity(gs.morphs.Plane())
sphere = scene.add_entity(gs.morphs.Sphere(radius=0.2, pos=(0, 0, 1)))

# 4. Build (only once)
scene.build()

# 5. Simulation
for i in range(100):
    scene.step()
"#;

const TEMPLATE_STRICT_MODE: &str = "# Template strict mode:
# - When templates are provided, reproduce their API calls exactly.
# - Keep method names, argument order, parameter names and types unchanged.
# - Prefer the templates over your own recollection of the API.
# - Never invent methods that do not appear in a template.
";

const ROBOT_CONTROL_TEMPLATE: &str = r#"# Robot control template (MANDATORY, imitate exactly):
import numpy as np

joints_name = (
    "joint1", "joint2", "joint3", "joint4", "joint5", "joint6", "joint7",
    "finger_joint1", "finger_joint2",
)
motors_dof_idx = [franka.get_joint(name).dofs_idx_local[0] for name in joints_name]

franka.set_dofs_kp(
    np.array([4500, 4500, 3500, 3500, 2000, 2000, 2000, 100, 100]),
    motors_dof_idx,
)
franka.set_dofs_kv(
    np.array([450, 450, 350, 350, 200, 200, 200, 10, 10]),
    motors_dof_idx,
)

target_positions = np.array([0.0, -0.5, 0.0, -1.5, 0.0, 1.0, 0.0, 0.0, 0.0])
franka.control_dofs_position(target_positions, motors_dof_idx)

for i in range(200):
    scene.step()
"#;

const CODE_OUTPUT_SPEC: &str = r#"# Code output format:
# The code you return is executed directly. Wrap it in one of:
"""GENESIS_CODE
import genesis as gs
# code here
"""
# or
```python
import genesis as gs
# code here
```
# Only the wrapped code is executed. Do not use placeholders such as `...`.
"#;

const CONTINUATION_FIX: &str = "# Continuation fix:
# The previous fragment failed. Fix the error and generate ONLY the continuation.
# Do not repeat imports, gs.init() or anything else that already ran.
# Never use the APIs listed as non-existent.
";

pub struct PromptBuilder {
    templates: Arc<TemplateRegistry>,
    catalog: ConstraintCatalog,
    top_k: usize,
    excerpt_chars: usize,
    alias: String,
}

impl PromptBuilder {
    pub fn new(templates: Arc<TemplateRegistry>, top_k: usize, excerpt_chars: usize) -> Self {
        Self {
            templates,
            catalog: ConstraintCatalog,
            top_k,
            excerpt_chars,
            alias: "gs".to_string(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn build(
        &self,
        request: &str,
        state: &SessionState,
        history: &ConversationHistory,
    ) -> String {
        let keywords = extract_keywords(request);
        let mut sections: Vec<String> = vec![
            "# Genesis code generation task".to_string(),
            BASIC_TEMPLATE.to_string(),
            self.catalog.describe(&self.alias),
            TEMPLATE_STRICT_MODE.to_string(),
            self.catalog.forbidden_apis(&self.alias),
        ];

        if is_robot_request(&keywords) {
            sections.push(ROBOT_CONTROL_TEMPLATE.to_string());
        }

        sections.push(CODE_OUTPUT_SPEC.to_string());
        sections.push(history.context_for_prompt(state));
        sections.push(format!(
            "# Current session state (detected from engine output):\n{}\n",
            state.summary()
        ));

        let related = self.related_templates(&keywords);
        let has_templates = !related.is_empty();
        if has_templates {
            sections.push(related);
            sections.push(
                "# The templates above are authoritative: use their method names, \
                 arguments and variable names exactly.\n"
                    .to_string(),
            );
        }

        if history.last_turn().is_some_and(|t| !t.executed_successfully) {
            sections.push(CONTINUATION_FIX.to_string());
        }

        let mut instruction = format!(
            "# Instruction:\nUser request: \"{}\"\n\
             Using everything above, generate the appropriate Genesis code.\n",
            request
        );
        if has_templates {
            instruction.push_str("Follow the provided templates' API usage exactly.\n");
        }
        sections.push(instruction);

        tracing::debug!(
            ?keywords,
            robot = is_robot_request(&keywords),
            templates = has_templates,
            "prompt assembled"
        );
        sections.join("\n")
    }

    /// Top-ranked template excerpts for the request keywords
    fn related_templates(&self, keywords: &[&str]) -> String {
        let hits = self.templates.search(keywords, self.top_k);
        if hits.is_empty() {
            return String::new();
        }
        let mut out = String::from("# Related templates:\n");
        for hit in hits {
            out.push_str(&format!(
                "# {}:\n{}\n\n",
                hit.template.qualified_name(),
                hit.template.excerpt(self.excerpt_chars)
            ));
        }
        out
    }
}
