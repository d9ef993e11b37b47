use crate::backend::Backend;
use crate::tools::DEFAULT_MAX_READ_BYTES;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Craft, a local developer assistant working inside the user's workspace.

Use the available tools to inspect and change files instead of guessing:
- list_directory to see what is in a folder
- read_file to read a file
- search_in_file to find lines matching a pattern
- write_file to create or replace a file

Every path is relative to the workspace root; you cannot access anything outside it.
You may call several tools in a row, for example read a file and then write a modified version.
When you are done, answer briefly and summarize what you found or changed.";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    /// Overrides the backend's default endpoint.
    pub base_url: Option<String>,
    pub model: String,
    /// Overrides the backend's API key environment variable.
    pub api_key: Option<String>,
    pub system_prompt: String,
    pub timeout_seconds: u64,
    /// Completion requests allowed per turn; 0 disables the limit.
    pub max_turns: usize,
    pub max_read_bytes: u64,
    pub parallel_tool_calls: bool,
    pub show_tool_output: bool,
    pub print_messages: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            base_url: None,
            model: "qwen/qwen3-4b-2507".to_string(),
            api_key: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout_seconds: 120,
            max_turns: 25,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
            parallel_tool_calls: false,
            show_tool_output: false,
            print_messages: false,
        }
    }
}

impl Config {
    /// The endpoint to talk to: the explicit override or the backend default.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => self.backend.config().base_url.to_string(),
        }
    }
}

/// Loads the user's config from the XDG config directory, creating it on first use.
pub fn load_or_create() -> Result<Config> {
    let xdg_dirs = xdg::BaseDirectories::new();
    let config_path = xdg_dirs.place_config_file("craft/config.toml")?;
    load_from(&config_path)
}

/// Loads the config at `config_path`.
///
/// A missing file is created with the defaults. Fields missing from an existing
/// file, or left empty, take their default values, and the completed config is
/// written back so users can see every available option.
pub fn load_from(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        let default_config = Config::default();
        let toml_string = toml::to_string_pretty(&default_config)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(config_path, toml_string)?;

        println!("Created default config at: {}", config_path.display());
        return Ok(default_config);
    }

    let config_string = fs::read_to_string(config_path)?;
    let mut config: Config = toml::from_str(&config_string)?;

    let default_config = Config::default();
    if config.model.is_empty() {
        config.model = default_config.model;
    }
    if config.system_prompt.trim().is_empty() {
        config.system_prompt = default_config.system_prompt;
    }
    if config.timeout_seconds == 0 {
        config.timeout_seconds = default_config.timeout_seconds;
    }
    if config.max_read_bytes == 0 {
        config.max_read_bytes = default_config.max_read_bytes;
    }

    let final_toml_string = toml::to_string_pretty(&config)?;
    if final_toml_string != config_string {
        fs::write(config_path, final_toml_string)?;
    }

    Ok(config)
}
