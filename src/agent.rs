//! # Agent Loop
//!
//! Drives one user turn: ask the model, run the tools it requests, feed the
//! results back, repeat until it answers. The conversation is borrowed mutably and
//! only ever appended to. An assistant message that requests tools is always
//! followed by exactly one `tool` message per request, in request order, before
//! the next completion call, so an abort can never leave a dangling call.

use crate::client::{Completion, CompletionClient};
use crate::config::Config;
use crate::error::AgentError;
use crate::message::{Conversation, Message, ToolCall};
use crate::registry::ToolRegistry;
use crate::tools::ToolResult;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Progress reported to an observer while a turn runs.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The model answered with text; the turn is over.
    AssistantText { content: String },
    /// The model asked for one or more tools.
    ToolCallsRequested {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    /// A requested tool finished, successfully or not.
    ToolResult {
        tool_name: String,
        tool_call_id: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug)]
enum LoopState {
    AwaitingCompletion,
    ExecutingTools(Vec<ToolCall>),
    Done(String),
}

#[derive(Clone)]
pub struct Agent {
    client: Arc<dyn CompletionClient>,
    registry: Arc<ToolRegistry>,
    max_turns: Option<usize>,
    parallel_tool_calls: bool,
    events: Option<UnboundedSender<AgentEvent>>,
}

impl Agent {
    /// Creates an agent with no turn limit and sequential tool execution.
    pub fn new(client: Arc<dyn CompletionClient>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            registry,
            max_turns: None,
            parallel_tool_calls: false,
            events: None,
        }
    }

    pub fn from_config(
        config: &Config,
        client: Arc<dyn CompletionClient>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self::new(client, registry)
            .with_max_turns((config.max_turns > 0).then_some(config.max_turns))
            .with_parallel_tool_calls(config.parallel_tool_calls)
    }

    /// Caps the number of completion requests per turn. `None` means unbounded.
    pub fn with_max_turns(mut self, max_turns: Option<usize>) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Runs the tool calls of one batch concurrently. Results keep request order.
    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }

    pub fn with_events(mut self, events: UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs the loop until the model produces a final answer and returns it.
    ///
    /// On a completion error or when the turn limit is hit, the error is returned
    /// and `conversation` keeps everything appended so far; it is always in a
    /// state that can be sent to the model again.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<String, AgentError> {
        let tools = self.registry.definitions();
        let mut requests = 0;
        let mut state = LoopState::AwaitingCompletion;

        loop {
            state = match state {
                LoopState::AwaitingCompletion => {
                    if let Some(max) = self.max_turns {
                        if requests >= max {
                            info!(max, "turn limit reached without a final answer");
                            return Err(AgentError::MaxTurnsExceeded(max));
                        }
                    }
                    requests += 1;
                    debug!(request = requests, "awaiting completion");

                    match self.client.complete(conversation.messages(), &tools).await? {
                        Completion::FinalAnswer(text) => {
                            conversation.push(Message::assistant(text.clone()));
                            self.emit(AgentEvent::AssistantText {
                                content: text.clone(),
                            });
                            LoopState::Done(text)
                        }
                        Completion::ToolRequests { content, calls } => {
                            debug!(count = calls.len(), "model requested tools");
                            conversation
                                .push(Message::assistant_tool_calls(content.clone(), calls.clone()));
                            self.emit(AgentEvent::ToolCallsRequested {
                                content,
                                calls: calls.clone(),
                            });
                            LoopState::ExecutingTools(calls)
                        }
                        Completion::Empty => {
                            debug!("model ended the turn without content");
                            LoopState::Done(String::new())
                        }
                    }
                }
                LoopState::ExecutingTools(calls) => {
                    if self.parallel_tool_calls {
                        let results = join_all(calls.iter().map(|call| self.execute(call))).await;
                        for (message, is_error) in results {
                            self.record(conversation, message, is_error);
                        }
                    } else {
                        for call in &calls {
                            let (message, is_error) = self.execute(call).await;
                            self.record(conversation, message, is_error);
                        }
                    }
                    LoopState::AwaitingCompletion
                }
                LoopState::Done(answer) => return Ok(answer),
            };
        }
    }

    /// Parses the raw arguments and dispatches one call. Never fails: every
    /// problem becomes the content of the returned `tool` message.
    async fn execute(&self, call: &ToolCall) -> (Message, bool) {
        let result = match parse_arguments(call) {
            Ok(args) => self.registry.dispatch(call.name(), &args).await,
            Err(message) => ToolResult::Failure(message),
        };
        (Message::tool(call, result.to_content()), result.is_failure())
    }

    fn record(&self, conversation: &mut Conversation, message: Message, is_error: bool) {
        self.emit(AgentEvent::ToolResult {
            tool_name: message.tool_name.clone().unwrap_or_default(),
            tool_call_id: message.tool_call_id.clone().unwrap_or_default(),
            content: message.text_content().to_string(),
            is_error,
        });
        conversation.push(message);
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(events) = &self.events {
            // A closed receiver only means nobody is watching.
            let _ = events.send(event);
        }
    }
}

/// Parses the raw argument text of `call` into a JSON object. Blank arguments
/// are read as `{}`, which some models send for calls without parameters.
fn parse_arguments(call: &ToolCall) -> Result<Value, String> {
    let raw = call.function.arguments.trim();
    if raw.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(format!(
            "invalid arguments for tool '{}': expected a JSON object",
            call.name()
        )),
        Err(e) => Err(format!("invalid arguments for tool '{}': {e}", call.name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_arguments() {
        let call = ToolCall::new("1", "read_file", r#"{"path": "a"}"#);
        assert_eq!(parse_arguments(&call).unwrap(), json!({"path": "a"}));

        let call = ToolCall::new("1", "list_directory", "  ");
        assert_eq!(parse_arguments(&call).unwrap(), json!({}));

        let call = ToolCall::new("1", "read_file", r#"["a"]"#);
        assert!(parse_arguments(&call).unwrap_err().contains("expected a JSON object"));

        let call = ToolCall::new("1", "read_file", r#"{"path": "#);
        assert!(
            parse_arguments(&call)
                .unwrap_err()
                .starts_with("invalid arguments for tool 'read_file'")
        );
    }
}
