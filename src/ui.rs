//! # Session Host
//!
//! Owns the conversation for the lifetime of a session and feeds user input to
//! the agent. Each turn runs on a spawned worker task; progress comes back over
//! an event channel that this side drains and prints, so the prompt loop never
//! touches the conversation while a turn is in flight.

use crate::agent::{Agent, AgentEvent};
use crate::config::Config;
use crate::message::Conversation;
use anyhow::{Result, anyhow};
use console::style;
use std::io::{self, Write};
use tokio::sync::mpsc;

const HELP: &str = "Commands:
  /help          show this help
  /clear         forget the conversation so far
  /logs          toggle printing of tool output
  /exit, /quit   end the session (so do `exit`, `quit`, Ctrl+C and Ctrl+D)";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    Clear,
    ToggleToolOutput,
    Unknown(String),
}

/// Recognizes session commands. Anything else is a prompt for the model.
pub fn parse_command(input: &str) -> Option<Command> {
    let lowered = input.trim().to_lowercase();
    match lowered.as_str() {
        "exit" | "quit" | "/exit" | "/quit" => Some(Command::Exit),
        "/help" => Some(Command::Help),
        "/clear" => Some(Command::Clear),
        "/logs" => Some(Command::ToggleToolOutput),
        other if other.starts_with('/') => Some(Command::Unknown(input.trim().to_string())),
        _ => None,
    }
}

#[derive(Debug)]
pub enum AppState {
    WaitingForUserInput,
    ProcessingPrompt(String),
    Shutdown,
}

pub struct App {
    pub config: Config,
    agent: Agent,
    conversation: Conversation,
    state: AppState,
    show_tool_output: bool,
}

impl App {
    pub fn new(config: Config, agent: Agent) -> Self {
        let conversation = Conversation::new(config.system_prompt.clone());
        let show_tool_output = config.show_tool_output;
        Self {
            config,
            agent,
            conversation,
            state: AppState::WaitingForUserInput,
            show_tool_output,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Runs a single turn for `prompt` and returns the final answer.
    pub async fn run_once(&mut self, prompt: &str) -> Result<String> {
        self.run_turn(prompt.to_string()).await
    }

    /// Interactive session: read prompts until the user leaves.
    pub async fn run_interactive(&mut self) -> Result<()> {
        let mut stdin_receiver = spawn_stdin_channel();
        println!(
            "{} Type {} for commands, {} to leave.\n",
            style("Craft session started.").bold(),
            style("/help").cyan(),
            style("exit").cyan()
        );
        self.state = AppState::WaitingForUserInput;

        loop {
            match &self.state {
                AppState::WaitingForUserInput => {
                    print!("{} ", style("user>").cyan().bold());
                    io::stdout().flush()?;

                    tokio::select! {
                        biased;
                        _ = tokio::signal::ctrl_c() => {
                            println!();
                            self.state = AppState::Shutdown;
                        }
                        line_opt = stdin_receiver.recv() => {
                            // recv() returns None if channel is closed.
                            match line_opt.flatten() {
                                Some(input) if input.is_empty() => {}
                                Some(input) => self.handle_input(input),
                                None => {
                                    // Ctrl+D was pressed
                                    println!();
                                    self.state = AppState::Shutdown;
                                }
                            }
                        }
                    }
                }
                AppState::ProcessingPrompt(prompt) => {
                    let prompt = prompt.clone();
                    if let Err(e) = self.run_turn(prompt).await {
                        eprintln!("{}", style(format!("Error: {e}")).red());
                        eprintln!(
                            "{}",
                            style("The conversation was kept; send another message to retry.")
                                .dim()
                        );
                    }
                    if !matches!(self.state, AppState::Shutdown) {
                        self.state = AppState::WaitingForUserInput;
                    }
                    println!();
                }
                AppState::Shutdown => {
                    println!("{}", style("Session ended.").dim());
                    return Ok(());
                }
            }
        }
    }

    fn handle_input(&mut self, input: String) {
        match parse_command(&input) {
            None => self.state = AppState::ProcessingPrompt(input),
            Some(Command::Exit) => self.state = AppState::Shutdown,
            Some(Command::Help) => println!("{HELP}"),
            Some(Command::Clear) => {
                self.conversation.reset();
                println!("{}", style("Conversation cleared.").dim());
            }
            Some(Command::ToggleToolOutput) => {
                self.show_tool_output = !self.show_tool_output;
                let status = if self.show_tool_output { "on" } else { "off" };
                println!("{}", style(format!("Tool output display {status}.")).dim());
            }
            Some(Command::Unknown(cmd)) => {
                println!("{}", style(format!("Unknown command: {cmd}")).yellow());
            }
        }
    }

    /// Appends the prompt and runs the agent on a worker task, printing its events
    /// as they arrive. The conversation comes back with the result, whether the
    /// turn succeeded or not.
    async fn run_turn(&mut self, prompt: String) -> Result<String> {
        self.conversation.push_user(prompt);

        if self.config.print_messages {
            println!("{}", style("Messages being sent to API:").yellow().bold());
            for message in self.conversation.messages() {
                let message_json = serde_json::to_string_pretty(message)
                    .unwrap_or_else(|e| format!("Failed to serialize message: {e}"));
                println!("{message_json}");
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let agent = self.agent.clone().with_events(tx);
        let mut conversation = self.conversation.clone();
        let worker = tokio::spawn(async move {
            let result = agent.run(&mut conversation).await;
            (conversation, result)
        });

        let mut interrupted = false;
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.display_event(&event),
                    // The worker dropped its sender: the turn is over.
                    None => break,
                },
                _ = tokio::signal::ctrl_c(), if !interrupted => {
                    println!(
                        "\n{}",
                        style("Finishing the current turn, then ending the session.").yellow()
                    );
                    interrupted = true;
                }
            }
        }
        if interrupted {
            self.state = AppState::Shutdown;
        }

        let (conversation, result) = worker
            .await
            .map_err(|e| anyhow!("agent task failed: {e}"))?;
        self.conversation = conversation;

        let answer = result?;
        if answer.is_empty() {
            println!("{}", style("(the model ended without an answer)").dim());
        }
        Ok(answer)
    }

    fn display_event(&self, event: &AgentEvent) {
        match event {
            AgentEvent::AssistantText { content } => {
                println!("[{}]", style("assistant").blue());
                println!("{content}");
            }
            AgentEvent::ToolCallsRequested { content, calls } => {
                if let Some(text) = content {
                    println!("[{}]", style("assistant").blue());
                    println!("{}", style(text).dim());
                }
                for call in calls {
                    println!(
                        "[{}] {}",
                        style(format!("tool: {}", call.name())).magenta(),
                        style(&call.function.arguments).dim()
                    );
                }
            }
            AgentEvent::ToolResult {
                tool_name,
                content,
                is_error,
                ..
            } => {
                if *is_error {
                    eprintln!("{}", style(format!("{tool_name} failed: {content}")).red());
                } else if self.show_tool_output {
                    println!("{}", style(content).dim());
                } else {
                    println!(
                        "{}",
                        style(format!("{tool_name}: ok ({} chars)", content.chars().count())).dim()
                    );
                }
            }
        }
    }
}

fn spawn_stdin_channel() -> mpsc::Receiver<Option<String>> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        loop {
            let result = tokio::task::spawn_blocking(|| {
                let mut buffer = String::new();
                match io::stdin().read_line(&mut buffer) {
                    Ok(0) => Ok(None), // EOF (Ctrl+D)
                    Ok(_) => Ok(Some(buffer.trim().to_string())),
                    Err(e) => Err(e),
                }
            })
            .await;

            match result {
                Ok(Ok(line_opt)) => {
                    let eof = line_opt.is_none();
                    if tx.send(line_opt).await.is_err() || eof {
                        break;
                    }
                }
                _ => {
                    // An error occurred, signal EOF and exit the task.
                    tx.send(None).await.ok();
                    break;
                }
            }
        }
    });
    rx
}
