use crate::client::{Completion, CompletionClient};
use crate::error::CompletionError;
use crate::message::Message;
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// A completion client that replays pre-configured responses and records every
/// conversation it was asked to complete.
#[derive(Clone, Default)]
pub struct MockClient {
    responses: Arc<Mutex<VecDeque<Result<Completion, CompletionError>>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockClient {
    /// Create a new mock client with a sequence of responses
    pub fn new(responses: Vec<Completion>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            requests: Arc::default(),
        }
    }

    /// Queues a response after the ones already configured.
    pub fn push(&self, response: Result<Completion, CompletionError>) {
        lock(&self.responses).push_back(response);
    }

    /// Snapshots of the conversation passed to each `complete` call.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<Completion, CompletionError> {
        lock(&self.requests).push(messages.to_vec());
        // An exhausted script behaves like a model that stops talking.
        lock(&self.responses)
            .pop_front()
            .unwrap_or(Ok(Completion::Empty))
    }
}
