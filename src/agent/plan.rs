//! LLM prompts and plan parsing

use serde::Deserialize;
use serde_json::Value;

use crate::core::{AgentError, Platform};
use crate::tools::{Params, ToolRegistry};

/// One resolved call
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCall {
    pub tool: String,
    pub action: String,
    pub parameters: Params,
}

/// What the LLM asked for
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    pub calls: Vec<PlannedCall>,
    pub explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    tools: Vec<RawCall>,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCall {
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    parameters: Option<Value>,
}

/// Parse the first-`{`-to-last-`}` span of an LLM reply
///
/// The action comes from the entry's `action`, else from
/// `parameters.action` (removed from the parameters), else `"default"`.
pub fn parse_plan(text: &str) -> Result<Plan, AgentError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(AgentError::InvalidPlan("No JSON found in response".into()));
    };
    if end < start {
        return Err(AgentError::InvalidPlan("No JSON found in response".into()));
    }

    let raw: RawPlan = serde_json::from_str(&text[start..=end])
        .map_err(|e| AgentError::InvalidPlan(e.to_string()))?;

    let mut calls = Vec::with_capacity(raw.tools.len());
    for (index, entry) in raw.tools.into_iter().enumerate() {
        let tool = entry
            .tool
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AgentError::InvalidPlan(format!("Entry {} has no tool", index)))?;

        let mut parameters = match entry.parameters {
            None | Some(Value::Null) => Params::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(AgentError::InvalidPlan(format!(
                    "Parameters for {} must be an object, got {}",
                    tool, other
                )))
            }
        };

        let from_parameters = match parameters.remove("action") {
            Some(Value::String(action)) => Some(action),
            _ => None,
        };
        let action = entry
            .action
            .or(from_parameters)
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "default".to_string());

        calls.push(PlannedCall {
            tool,
            action,
            parameters,
        });
    }

    Ok(Plan {
        calls,
        explanation: raw.explanation.filter(|e| !e.trim().is_empty()),
    })
}

/// System prompt listing the registered handlers
pub fn system_prompt(registry: &ToolRegistry, platform: Platform) -> String {
    format!(
        "You are SysAgent, a command-line assistant for OS automation.\n\
         \n\
         Available tools:\n\
         {}\n\
         \n\
         Guidelines:\n\
         1. For tool operations, respond with JSON containing a \"tools\" array.\n\
         2. For greetings, help requests or general questions, return an empty \"tools\" array and answer in \"explanation\".\n\
         3. Use the most appropriate tool and action for the task.\n\
         4. Avoid destructive operations unless explicitly requested.\n\
         \n\
         Platform: {}",
        registry.describe(),
        platform
    )
}

/// User prompt with the JSON contract
pub fn user_prompt(input: &str) -> String {
    format!(
        "User request: {}\n\
         \n\
         Respond with JSON only, in this shape:\n\
         {{\"tools\": [{{\"tool\": \"<tool name>\", \"action\": \"<action>\", \"parameters\": {{}}}}], \"explanation\": \"<short summary>\"}}",
        input
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plan_with_prose() {
        let text = r#"Sure! Here is the plan:
{"tools": [{"tool": "system_info_tool", "action": "cpu", "parameters": {}}], "explanation": "Checking CPU"}
Let me know if you need more."#;

        let plan = parse_plan(text).unwrap();
        assert_eq!(plan.calls.len(), 1);
        assert_eq!(plan.calls[0].tool, "system_info_tool");
        assert_eq!(plan.calls[0].action, "cpu");
        assert_eq!(plan.explanation.as_deref(), Some("Checking CPU"));
    }

    #[test]
    fn test_action_sources() {
        let text = r#"{"tools": [
            {"tool": "file_tool", "parameters": {"action": "cleanup", "dry_run": true}},
            {"tool": "system_info_tool"},
            {"tool": "file_tool", "action": "list", "parameters": {"action": "search"}}
        ]}"#;

        let plan = parse_plan(text).unwrap();
        assert_eq!(plan.calls[0].action, "cleanup");
        assert_eq!(Value::Object(plan.calls[0].parameters.clone()), json!({"dry_run": true}));
        assert_eq!(plan.calls[1].action, "default");
        assert_eq!(plan.calls[2].action, "list");
        assert!(plan.explanation.is_none());
    }

    #[test]
    fn test_empty_tools_is_conversation() {
        let plan = parse_plan(r#"{"tools": [], "explanation": "Hello there"}"#).unwrap();
        assert!(plan.calls.is_empty());
        assert_eq!(plan.explanation.as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_invalid_plans() {
        for text in [
            "no json here",
            "} backwards {",
            "{not json}",
            r#"{"tools": [{"action": "cpu"}]}"#,
            r#"{"tools": [{"tool": "file_tool", "parameters": [1, 2]}]}"#,
        ] {
            assert!(
                matches!(parse_plan(text), Err(AgentError::InvalidPlan(_))),
                "{} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_prompts() {
        let registry = ToolRegistry::new();
        let system = system_prompt(&registry, Platform::Linux);
        assert!(system.contains("Platform: linux"));

        let user = user_prompt("show disk usage");
        assert!(user.starts_with("User request: show disk usage"));
        assert!(user.contains(r#"{"tools": [{"tool""#));
    }
}
