use serde::{Deserialize, Serialize};
use std::fmt;

pub struct BackendConfig {
    pub base_url: &'static str,
    pub api_key_env_var: Option<&'static str>,
}

/// Completion services that speak the OpenAI chat completions protocol.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Lmstudio,
    Ollama,
    Openai,
    Openrouter,
}

impl Backend {
    pub fn config(&self) -> BackendConfig {
        match self {
            Backend::Lmstudio => BackendConfig {
                base_url: "http://localhost:1234/v1",
                api_key_env_var: None,
            },
            Backend::Ollama => BackendConfig {
                base_url: "http://localhost:11434/v1",
                api_key_env_var: None,
            },
            Backend::Openai => BackendConfig {
                base_url: "https://api.openai.com/v1",
                api_key_env_var: Some("OPENAI_API_KEY"),
            },
            Backend::Openrouter => BackendConfig {
                base_url: "https://openrouter.ai/api/v1",
                api_key_env_var: Some("OPENROUTER_API_KEY"),
            },
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Lmstudio => "lmstudio",
            Backend::Ollama => "ollama",
            Backend::Openai => "openai",
            Backend::Openrouter => "openrouter",
        };
        f.write_str(name)
    }
}
