//! MCP tool definitions

use serde_json::json;

use super::protocol::Tool;

pub fn get_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "run_simulation",
            description: "Generate (or accept) Genesis code for a request and run it as a \
                          continuation of the live session. Fragments that repeat a completed \
                          one-shot stage are skipped.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "description": {
                        "type": "string",
                        "description": "Natural-language description of what to simulate next"
                    },
                    "code": {
                        "type": "string",
                        "description": "Optional code to run instead of generating it"
                    }
                },
                "required": ["description"]
            }),
        },
        Tool {
            name: "generate_simulation",
            description: "Generate continuation code for a request without running it.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "description": {
                        "type": "string",
                        "description": "Natural-language description"
                    }
                },
                "required": ["description"]
            }),
        },
        Tool {
            name: "get_templates",
            description: "List code templates, optionally for one category.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": "Category name (basic, shapes, physics, robots, materials, environments, sensors, advanced)"
                    }
                }
            }),
        },
        Tool {
            name: "session_status",
            description: "Completed lifecycle stages, next required stage, errors and entities.",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        Tool {
            name: "reset_session",
            description: "Restart the engine and clear session state and history.",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        Tool {
            name: "check_environment",
            description: "Report engine availability and the configured LLM backend.",
            input_schema: json!({"type": "object", "properties": {}}),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_unique() {
        let tools = get_tools();
        let mut names: Vec<_> = tools.iter().map(|t| t.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), tools.len());
        assert!(names.contains(&"run_simulation"));
    }
}
