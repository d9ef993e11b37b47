//! # Completion Client
//!
//! The agent loop only knows the [`CompletionClient`] trait. [`OpenAiClient`]
//! implements it for any server speaking the OpenAI chat completions protocol
//! (LM Studio, Ollama, OpenAI, OpenRouter).

use crate::config::Config;
use crate::error::CompletionError;
use crate::message::{Message, ToolCall};
use crate::tools::ToolDefinition;
use anyhow::{Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// What the model wants next.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// A plain answer for the user; the turn is over.
    FinalAnswer(String),
    /// One or more tools to run before asking again. `content` is any text the
    /// model produced alongside the calls.
    ToolRequests {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    /// Neither text nor tool calls.
    Empty,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Completion, CompletionError>;
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

/// Turns the first choice of a response body into a [`Completion`].
pub fn parse_completion(body: &str) -> Result<Completion, CompletionError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Protocol(e.to_string()))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Protocol("response has no choices".to_string()))?;
    debug!(finish_reason = ?choice.finish_reason, "completion received");

    let content = choice.message.content.filter(|c| !c.trim().is_empty());
    let mut calls = choice.message.tool_calls.unwrap_or_default();
    for (idx, call) in calls.iter_mut().enumerate() {
        if call.id.is_empty() {
            call.id = format!("call_{idx}");
        }
    }

    Ok(match (content, calls.is_empty()) {
        (content, false) => Completion::ToolRequests { content, calls },
        (Some(text), true) => Completion::FinalAnswer(text),
        (None, true) => Completion::Empty,
    })
}

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn payload(&self, messages: &[Message], tools: &[ToolDefinition]) -> Value {
        let mut payload = json!({
            "model": self.model,
            "messages": messages,
        });
        if !tools.is_empty() {
            payload["tools"] = tools.iter().map(ToolDefinition::to_openai_json).collect();
        }
        payload
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Completion, CompletionError> {
        let url = self.endpoint();
        debug!(%url, model = %self.model, messages = messages.len(), "requesting completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(messages, tools))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::Transport(format!(
                "{status} from {url}: {body}"
            )));
        }

        parse_completion(&body)
    }
}

/// Builds the HTTP client for the configured backend.
pub fn initialize_client(config: &Config) -> Result<OpenAiClient> {
    let api_key = match (&config.api_key, config.backend.config().api_key_env_var) {
        (Some(key), _) => key.clone(),
        (None, Some(env_var)) => match std::env::var(env_var) {
            Ok(val) => val,
            Err(_) => bail!("environment variable {} not set", env_var),
        },
        // Local servers ignore the key but some reject an empty Authorization header.
        (None, None) => config.backend.to_string(),
    };
    let client = OpenAiClient::new(
        config.base_url(),
        api_key,
        &config.model,
        Duration::from_secs(config.timeout_seconds),
    )?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;
    use crate::sandbox::Sandbox;
    use crate::tools::ToolContext;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response: ResponseTemplate) -> (MockServer, OpenAiClient) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        let client = OpenAiClient::new(
            format!("{}/v1", mock_server.uri()),
            "test_api_key",
            "test-model",
            Duration::from_secs(5),
        )
        .unwrap();
        (mock_server, client)
    }

    #[tokio::test]
    async fn test_final_answer() {
        let body = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "All done.", "tool_calls": null},
                "finish_reason": "stop"
            }]
        });
        let (_server, client) = setup_mock_server(ResponseTemplate::new(200).set_body_json(body)).await;

        let completion = client.complete(&[Message::user("hi")], &[]).await.unwrap();
        assert_eq!(completion, Completion::FinalAnswer("All done.".to_string()));
    }

    #[tokio::test]
    async fn test_tool_requests() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function",
                         "function": {"name": "list_directory", "arguments": "{\"path\":\".\"}"}},
                        {"id": "call_b", "type": "function",
                         "function": {"name": "read_file", "arguments": "{\"path\":\"a.txt\"}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let (_server, client) = setup_mock_server(ResponseTemplate::new(200).set_body_json(body)).await;

        let completion = client.complete(&[Message::user("hi")], &[]).await.unwrap();
        let Completion::ToolRequests { content, calls } = completion else {
            panic!("expected tool requests");
        };
        assert_eq!(content, None);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[1].name(), "read_file");
    }

    #[tokio::test]
    async fn test_request_carries_model_tools_and_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "model": "m",
                "messages": [{"role": "user", "content": "hi"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let tmp_dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::with_builtin_tools(ToolContext::new(
            Sandbox::new(tmp_dir.path()).unwrap(),
        ));
        let client =
            OpenAiClient::new(mock_server.uri(), "secret", "m", Duration::from_secs(5)).unwrap();

        let completion = client
            .complete(&[Message::user("hi")], &registry.definitions())
            .await
            .unwrap();
        assert_eq!(completion, Completion::FinalAnswer("ok".to_string()));

        let requests = mock_server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["tools"].as_array().unwrap().len(), 4);
        assert_eq!(sent["tools"][0]["function"]["name"], "list_directory");
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let (_server, client) =
            setup_mock_server(ResponseTemplate::new(500).set_body_string("overloaded")).await;

        let err = client.complete(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport() {
        let client = OpenAiClient::new(
            "http://127.0.0.1:9/v1",
            "k",
            "m",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.complete(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }

    #[tokio::test]
    async fn test_garbage_body_is_protocol() {
        let (_server, client) =
            setup_mock_server(ResponseTemplate::new(200).set_body_string("<html>nope</html>")).await;

        let err = client.complete(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, CompletionError::Protocol(_)));
    }

    #[test]
    fn test_no_choices_is_protocol() {
        let err = parse_completion(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, CompletionError::Protocol(_)));
    }

    #[test]
    fn test_empty_message() {
        let completion =
            parse_completion(r#"{"choices": [{"message": {"content": "  "}, "finish_reason": "stop"}]}"#)
                .unwrap();
        assert_eq!(completion, Completion::Empty);
    }

    #[test]
    fn test_missing_call_ids_are_filled() {
        let completion = parse_completion(
            r#"{"choices": [{"message": {"tool_calls": [
                {"function": {"name": "read_file", "arguments": {"path": "a"}}},
                {"function": {"name": "read_file", "arguments": {"path": "b"}}}
            ]}}]}"#,
        )
        .unwrap();
        let Completion::ToolRequests { calls, .. } = completion else {
            panic!("expected tool requests");
        };
        assert_eq!(calls[0].id, "call_0");
        assert_eq!(calls[1].id, "call_1");
        assert_eq!(calls[1].function.arguments, r#"{"path":"b"}"#);
    }
}
