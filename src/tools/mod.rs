//! # Tool Trait
//!
//! This module defines the core `Tool` trait that all workspace tools implement,
//! together with the schema types sent to the model and the result type the
//! registry turns into a `tool` message.

use crate::error::ToolError;
use crate::sandbox::Sandbox;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

pub mod list_directory;
pub mod read_file;
pub mod search_in_file;
pub mod write_file;
pub use self::list_directory::ListDirectoryTool;
pub use self::read_file::ReadFileTool;
pub use self::search_in_file::SearchInFileTool;
pub use self::write_file::WriteFileTool;

/// Default cap for `read_file`, in bytes.
pub const DEFAULT_MAX_READ_BYTES: u64 = 1024 * 1024;

/// Everything a tool may use besides its arguments.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub sandbox: Sandbox,
    pub max_read_bytes: u64,
}

impl ToolContext {
    pub fn new(sandbox: Sandbox) -> Self {
        Self {
            sandbox,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
        }
    }

    pub fn with_max_read_bytes(mut self, max_read_bytes: u64) -> Self {
        self.max_read_bytes = max_read_bytes;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    fn as_json_type(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub description: &'static str,
    pub required: bool,
}

impl ParameterSpec {
    pub fn required_string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamType::String,
            description,
            required: true,
        }
    }
}

/// Name, description and parameters of a tool, as advertised to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDefinition {
    /// JSON Schema for the parameters object.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.to_string(),
                json!({
                    "type": param.kind.as_json_type(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// The entry for the `tools` array of a chat completion request.
    pub fn to_openai_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema(),
            }
        })
    }
}

/// Outcome of one tool call. Failures are data, not errors: they go back to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(Value),
    Failure(String),
}

impl ToolResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, ToolResult::Failure(_))
    }

    /// Content of the `tool` message: strings verbatim, other payloads as compact
    /// JSON, failures as `{"error": ...}`.
    pub fn to_content(&self) -> String {
        match self {
            ToolResult::Success(Value::String(text)) => text.clone(),
            ToolResult::Success(value) => value.to_string(),
            ToolResult::Failure(message) => json!({ "error": message }).to_string(),
        }
    }
}

impl From<Result<Value, ToolError>> for ToolResult {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(value) => ToolResult::Success(value),
            Err(e) => ToolResult::Failure(e.to_string()),
        }
    }
}

/// A trait representing a self-contained, executable tool.
///
/// This trait is designed to be object-safe, allowing for dynamic dispatch
/// via `Box<dyn Tool>`. Implementations must resolve every path argument through
/// `ctx.sandbox` before touching the filesystem.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique, static name of the tool.
    fn name(&self) -> &'static str;

    /// Returns the definition advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool and returns the payload for the model.
    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// Deserializes the arguments object into the tool's typed argument struct.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, args: &Value) -> Result<T, ToolError> {
    serde_json::from_value(args.clone()).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_schema() {
        let definition = ToolDefinition {
            name: "demo",
            description: "A demo tool.",
            parameters: vec![
                ParameterSpec::required_string("path", "Where."),
                ParameterSpec {
                    name: "limit",
                    kind: ParamType::Integer,
                    description: "How many.",
                    required: false,
                },
            ],
        };

        let schema = definition.to_openai_json();
        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "demo");
        let params = &schema["function"]["parameters"];
        assert_eq!(params["properties"]["path"]["type"], "string");
        assert_eq!(params["properties"]["limit"]["type"], "integer");
        assert_eq!(params["required"], json!(["path"]));
    }

    #[test]
    fn test_result_content_encoding() {
        assert_eq!(
            ToolResult::Success(Value::String("hello".into())).to_content(),
            "hello"
        );
        assert_eq!(
            ToolResult::Success(json!(["a", "b/"])).to_content(),
            r#"["a","b/"]"#
        );
        let failure = ToolResult::Failure("boom".into()).to_content();
        assert_eq!(serde_json::from_str::<Value>(&failure).unwrap(), json!({"error": "boom"}));
    }
}
