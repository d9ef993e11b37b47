use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use craft::agent::Agent;
use craft::cli::Cli;
use craft::client;
use craft::config;
use craft::registry::ToolRegistry;
use craft::sandbox::Sandbox;
use craft::tools::ToolContext;
use craft::ui::App;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "craft=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stderr, so logs never mix with the answer on stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.logs);

    let mut config = config::load_or_create()?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(max_turns) = cli.max_turns {
        config.max_turns = max_turns;
    }

    let sandbox = Sandbox::new(&cli.workspace)
        .with_context(|| format!("invalid workspace '{}'", cli.workspace.display()))?;
    let ctx = ToolContext::new(sandbox).with_max_read_bytes(config.max_read_bytes);
    let registry = Arc::new(ToolRegistry::with_builtin_tools(ctx));
    let client = Arc::new(client::initialize_client(&config)?);

    println!("Backend: {} ({})", config.backend, config.base_url());
    println!("Model: {}", config.model);
    println!("Workspace: {}", registry.context().sandbox.base_dir().display());
    println!("Tools: {}", registry.names().join(", "));

    let agent = Agent::from_config(&config, client, registry);
    let mut app = App::new(config, agent);

    if let Some(question) = cli.question {
        if let Err(e) = app.run_once(&question).await {
            eprintln!("{}", style(format!("Error: {e}")).red());
            std::process::exit(1);
        }
        return Ok(());
    }

    app.run_interactive().await?;
    // The stdin reader may still be blocked in read_line; don't wait for it.
    std::process::exit(0);
}
