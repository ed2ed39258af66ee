//! System prompt assembly.
//!
//! The tool section is rendered from the live registry on every run so
//! registration changes show up in the next prompt.

use std::fmt::Write;

use stepwise_core::{AgentConfig, ToolDefinition, ToolRegistry};

/// Persona text followed by the rendered tool catalogue.
pub fn build_system_prompt(config: &AgentConfig, tools: &ToolRegistry) -> String {
    let mut prompt = config.system_prompt.trim_end().to_string();

    if tools.is_empty() {
        prompt.push_str("\n\nNo tools are available. Answer from the conversation alone.");
        return prompt;
    }

    prompt.push_str("\n\n## Available tools\n");
    for definition in tools.definitions() {
        render_tool(&definition, &mut prompt);
    }
    prompt.push_str(
        "\nCall tools only when they help answer the question. When you have enough \
         information, reply with the final answer and no tool calls.",
    );
    prompt
}

fn render_tool(definition: &ToolDefinition, out: &mut String) {
    let _ = write!(out, "\n### {}\n{}\n", definition.name, definition.description);
    if definition.parameters.is_empty() {
        out.push_str("Parameters: none\n");
        return;
    }
    out.push_str("| Parameter | Type | Required | Description |\n");
    out.push_str("|-----------|------|----------|-------------|\n");
    for param in &definition.parameters {
        let mut description = param.description.clone();
        if let Some(values) = &param.enum_values {
            let _ = write!(description, " (one of: {})", values.join(", "));
        }
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            param.name,
            param.param_type.as_str(),
            if param.required { "yes" } else { "no" },
            description
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;
    use stepwise_core::{ParamSpec, ParamType, Tool, ToolArguments, ToolError};

    struct QuoteTool {
        definition: ToolDefinition,
    }

    impl QuoteTool {
        fn new(name: &str) -> Self {
            Self {
                definition: ToolDefinition {
                    name: name.into(),
                    description: "Latest price for a ticker".into(),
                    parameters: vec![
                        ParamSpec::new("symbol", ParamType::String, "Ticker symbol", true),
                        ParamSpec::new("currency", ParamType::String, "Quote currency", false)
                            .with_enum(["USD", "EUR"]),
                    ],
                },
            }
        }
    }

    #[async_trait]
    impl Tool for QuoteTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn execute(&self, _arguments: ToolArguments) -> Result<Value, ToolError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn renders_persona_and_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(QuoteTool::new("get_quote")));
        let config = AgentConfig {
            system_prompt: "You are a portfolio assistant.".into(),
            ..AgentConfig::default()
        };

        let prompt = build_system_prompt(&config, &registry);
        assert!(prompt.starts_with("You are a portfolio assistant."));
        assert!(prompt.contains("### get_quote\nLatest price for a ticker"));
        assert!(prompt.contains("| symbol | string | yes | Ticker symbol |"));
        assert!(prompt.contains("| currency | string | no | Quote currency (one of: USD, EUR) |"));
    }

    #[test]
    fn reflects_registry_changes() {
        let config = AgentConfig::default();
        let mut registry = ToolRegistry::new();
        let before = build_system_prompt(&config, &registry);
        assert!(before.contains("No tools are available"));

        registry.register(Arc::new(QuoteTool::new("get_quote")));
        registry.register(Arc::new(QuoteTool::new("get_news")));
        let after = build_system_prompt(&config, &registry);
        let quote = after.find("### get_quote").unwrap();
        let news = after.find("### get_news").unwrap();
        assert!(quote < news, "tools render in registration order");
    }
}
