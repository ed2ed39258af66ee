//! Current time tool.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use serde_json::{Value, json};
use stepwise_core::{ParamSpec, ParamType, Tool, ToolArguments, ToolDefinition, ToolError};

/// Reports the current date and time, in UTC or the host's local zone.
pub struct CurrentTimeTool {
    definition: ToolDefinition,
}

impl CurrentTimeTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition {
                name: "current_time".into(),
                description: "Get the current date and time.".into(),
                parameters: vec![
                    ParamSpec::new(
                        "timezone",
                        ParamType::String,
                        "Which clock to read (default utc)",
                        false,
                    )
                    .with_enum(["utc", "local"]),
                ],
            },
        }
    }
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<Value, ToolError> {
        let zone = match arguments.get("timezone") {
            None | Some(Value::Null) => "utc",
            Some(Value::String(zone)) => zone.as_str(),
            Some(other) => {
                return Err(ToolError::InvalidArguments(format!(
                    "timezone must be a string, got {other}"
                )));
            }
        };

        match zone.to_ascii_lowercase().as_str() {
            "utc" => Ok(describe(&Utc::now(), "utc")),
            "local" => Ok(describe(&Local::now(), "local")),
            other => Err(ToolError::InvalidArguments(format!(
                "unknown timezone '{other}', expected utc or local"
            ))),
        }
    }
}

fn describe<Tz: TimeZone>(now: &DateTime<Tz>, zone: &str) -> Value
where
    Tz::Offset: std::fmt::Display,
{
    json!({
        "timezone": zone,
        "iso8601": now.to_rfc3339(),
        "unix": now.timestamp(),
        "weekday": now.format("%A").to_string(),
    })
}
