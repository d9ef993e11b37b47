//! # Write File Tool
//!
//! Creates or overwrites a file. Parent directories are created as needed.

use crate::error::ToolError;
use crate::tools::{ParameterSpec, Tool, ToolContext, ToolDefinition, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, Debug)]
pub struct WriteFileArgs {
    pub path: String,
    pub content: String,
}

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Creates a file, or replaces an existing one, with the given content. \
Missing parent directories are created.",
            parameters: vec![
                ParameterSpec::required_string(
                    "path",
                    "Path to the file, relative to the workspace root.",
                ),
                ParameterSpec::required_string("content", "The complete new file content."),
            ],
        }
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: WriteFileArgs = parse_args(self.name(), args)?;
        let file = ctx.sandbox.resolve(&args.path)?;
        let name = file.display_name();

        if tokio::fs::metadata(&file)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(ToolError::IsADirectory(name.to_string()));
        }

        if let Some(parent) = file.as_path().parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io("create parent directories for", name, e))?;
        }
        tokio::fs::write(&file, args.content.as_bytes())
            .await
            .map_err(|e| ToolError::io("write", name, e))?;

        Ok(Value::String(format!(
            "Wrote {} bytes to {name}",
            args.content.len()
        )))
    }
}
