use crate::backend::Backend;
use clap::Parser;
use std::path::PathBuf;

/// Craft: chat with your codebase through a local or hosted LLM.
///
/// The model can list, read, search and write files, but only inside the workspace.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Ask a single question and exit instead of starting a session
    #[arg(short, long)]
    pub question: Option<String>,

    /// Directory the assistant is confined to
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Show detailed debug logs on stderr
    #[arg(long)]
    pub logs: bool,

    /// Completion service to use, overriding the config file
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Model name, overriding the config file
    #[arg(long)]
    pub model: Option<String>,

    /// Completion requests allowed per turn (0 for no limit)
    #[arg(long)]
    pub max_turns: Option<usize>,
}
