use crate::error::ToolError;
use crate::tools::{ParameterSpec, Tool, ToolContext, ToolDefinition, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, Debug)]
pub struct ListDirectoryArgs {
    pub path: String,
}

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Lists the entries of a directory in the workspace (not recursive). \
Sub-directories end with a `/`. Use \".\" for the workspace root.",
            parameters: vec![ParameterSpec::required_string(
                "path",
                "Path to the directory, relative to the workspace root.",
            )],
        }
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: ListDirectoryArgs = parse_args(self.name(), args)?;
        let dir = ctx.sandbox.resolve(&args.path)?;

        let metadata = tokio::fs::metadata(&dir)
            .await
            .map_err(|e| ToolError::io("list", dir.display_name(), e))?;
        if !metadata.is_dir() {
            return Err(ToolError::NotADirectory(dir.display_name().to_string()));
        }

        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ToolError::io("list", dir.display_name(), e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| ToolError::io("list", dir.display_name(), e))?
        {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        Ok(Value::from(entries))
    }
}
