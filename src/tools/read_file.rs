use crate::error::ToolError;
use crate::tools::{ParameterSpec, Tool, ToolContext, ToolDefinition, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, Debug)]
pub struct ReadFileArgs {
    pub path: String,
}

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Reads the full content of a text file in the workspace.",
            parameters: vec![ParameterSpec::required_string(
                "path",
                "Path to the file, relative to the workspace root.",
            )],
        }
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: ReadFileArgs = parse_args(self.name(), args)?;
        let file = ctx.sandbox.resolve(&args.path)?;
        let name = file.display_name();

        let metadata = tokio::fs::metadata(&file)
            .await
            .map_err(|e| ToolError::io("read", name, e))?;
        if metadata.is_dir() {
            return Err(ToolError::IsADirectory(name.to_string()));
        }
        if metadata.len() > ctx.max_read_bytes {
            return Err(ToolError::TooLarge {
                path: name.to_string(),
                size: metadata.len(),
                limit: ctx.max_read_bytes,
            });
        }

        let bytes = tokio::fs::read(&file)
            .await
            .map_err(|e| ToolError::io("read", name, e))?;
        let text = String::from_utf8(bytes).map_err(|_| ToolError::NotText(name.to_string()))?;

        Ok(Value::String(text))
    }
}
