//! # Tool Registry
//!
//! The `ToolRegistry` holds every tool the model may call and dispatches calls by
//! name. Dispatch always yields a [`ToolResult`]: lookup failures, bad arguments,
//! sandbox violations and I/O errors all come back as `ToolResult::Failure`, so a
//! single failing call can never abort the agent loop.

use crate::tools::{
    ListDirectoryTool, ReadFileTool, SearchInFileTool, Tool, ToolContext, ToolDefinition,
    ToolResult, WriteFileTool,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Box<dyn Tool>>,
    ctx: ToolContext,
}

impl ToolRegistry {
    /// Creates an empty registry bound to a workspace.
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            tools: BTreeMap::new(),
            ctx,
        }
    }

    /// Creates a registry with the four workspace tools registered.
    pub fn with_builtin_tools(ctx: ToolContext) -> Self {
        let mut registry = Self::new(ctx);
        registry.register(Box::new(ListDirectoryTool));
        registry.register(Box::new(ReadFileTool));
        registry.register(Box::new(SearchInFileTool));
        registry.register(Box::new(WriteFileTool));
        registry
    }

    /// Registers a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    /// Definitions of all registered tools, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    /// Runs the tool called `name` with an already parsed arguments object.
    pub async fn dispatch(&self, name: &str, args: &Value) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = name, "model requested an unknown tool");
            return ToolResult::Failure(format!("unknown tool '{name}'"));
        };

        debug!(tool = name, %args, "dispatching tool call");
        let result = ToolResult::from(tool.execute(args, &self.ctx).await);
        if let ToolResult::Failure(message) = &result {
            warn!(tool = name, error = %message, "tool call failed");
        }
        result
    }
}
