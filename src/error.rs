//! # Errors
//!
//! Typed failures for every layer below the binary. Sandbox and tool errors are
//! recoverable and end up as the content of a `tool` message; completion errors
//! abort the current turn and are returned to the session host.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("path '{path}' is outside the workspace '{base}'")]
    Violation { path: String, base: PathBuf },

    #[error("cannot resolve path '{path}': {source}")]
    Unresolvable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("workspace '{path}' is not an existing directory")]
    InvalidBase { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("'{0}' is not a directory")]
    NotADirectory(String),

    #[error("'{0}' is a directory")]
    IsADirectory(String),

    #[error("'{0}' is not valid UTF-8 text")]
    NotText(String),

    #[error("'{path}' is {size} bytes, larger than the {limit} byte read limit")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error("failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    pub fn io(action: &'static str, path: impl Into<String>, source: io::Error) -> Self {
        ToolError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum CompletionError {
    /// The service could not be reached or answered with a failure status.
    #[error("completion service unavailable: {0}")]
    Transport(String),

    /// The service answered, but not with something we understand.
    #[error("malformed completion response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CompletionError::Protocol(e.to_string())
        } else {
            CompletionError::Transport(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("no final answer after {0} completion requests")]
    MaxTurnsExceeded(usize),
}
