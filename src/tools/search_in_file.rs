use crate::error::ToolError;
use crate::tools::{ParameterSpec, Tool, ToolContext, ToolDefinition, parse_args};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize, Debug)]
pub struct SearchInFileArgs {
    pub path: String,
    pub pattern: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct LineMatch {
    pub line: usize,
    pub text: String,
}

/// Returns the 1-based line number and text of every line matching `pattern`.
pub fn find_matches(content: &str, pattern: &Regex) -> Vec<LineMatch> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| pattern.is_match(line))
        .map(|(idx, line)| LineMatch {
            line: idx + 1,
            text: line.to_string(),
        })
        .collect()
}

pub struct SearchInFileTool;

#[async_trait]
impl Tool for SearchInFileTool {
    fn name(&self) -> &'static str {
        "search_in_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: "Searches a text file for a regular expression (a plain word works too) \
and returns the number and text of every matching line.",
            parameters: vec![
                ParameterSpec::required_string(
                    "path",
                    "Path to the file, relative to the workspace root.",
                ),
                ParameterSpec::required_string("pattern", "Regular expression to search for."),
            ],
        }
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: SearchInFileArgs = parse_args(self.name(), args)?;
        let pattern = Regex::new(&args.pattern)?;
        let file = ctx.sandbox.resolve(&args.path)?;
        let name = file.display_name();

        let metadata = tokio::fs::metadata(&file)
            .await
            .map_err(|e| ToolError::io("search", name, e))?;
        if metadata.is_dir() {
            return Err(ToolError::IsADirectory(name.to_string()));
        }

        let bytes = tokio::fs::read(&file)
            .await
            .map_err(|e| ToolError::io("search", name, e))?;
        let content =
            String::from_utf8(bytes).map_err(|_| ToolError::NotText(name.to_string()))?;

        Ok(Value::Array(
            find_matches(&content, &pattern)
                .into_iter()
                .map(|m| json!({ "line": m.line, "text": m.text }))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::workspace;
    use std::fs;

    #[test]
    fn test_find_matches_reports_one_based_lines() {
        let pattern = Regex::new("fn ").unwrap();
        let matches = find_matches("use x;\nfn main() {}\n\nfn helper() {}", &pattern);
        assert_eq!(
            matches,
            vec![
                LineMatch {
                    line: 2,
                    text: "fn main() {}".to_string()
                },
                LineMatch {
                    line: 4,
                    text: "fn helper() {}".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_search_regex() {
        let (tmp_dir, ctx) = workspace();
        fs::write(tmp_dir.path().join("log.txt"), "ok\nerror: 1\nok\nerror: 22").unwrap();

        let result = SearchInFileTool
            .execute(&json!({"path": "log.txt", "pattern": r"error: \d{2}"}), &ctx)
            .await
            .unwrap();

        assert_eq!(result, json!([{"line": 4, "text": "error: 22"}]));
    }

    #[tokio::test]
    async fn test_no_matches() {
        let (tmp_dir, ctx) = workspace();
        fs::write(tmp_dir.path().join("a.txt"), "nothing here").unwrap();

        let result = SearchInFileTool
            .execute(&json!({"path": "a.txt", "pattern": "TODO"}), &ctx)
            .await
            .unwrap();

        assert_eq!(result, json!([]));
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let (tmp_dir, ctx) = workspace();
        fs::write(tmp_dir.path().join("a.txt"), "x").unwrap();

        let err = SearchInFileTool
            .execute(&json!({"path": "a.txt", "pattern": "(unclosed"}), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::InvalidPattern(_)));
    }
}
