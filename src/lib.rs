pub mod agent;
pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod mock;
pub mod registry;
pub mod sandbox;
pub mod tools;
pub mod ui;

pub use agent::{Agent, AgentEvent};
pub use config::Config;
pub use message::{Conversation, Message, Role, ToolCall};
pub use registry::ToolRegistry;
pub use sandbox::{Sandbox, SandboxedPath};
