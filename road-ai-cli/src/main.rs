//! CLI entry point for road-ai

mod chat;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, Input, Select};
use road_ai_agent::{ConversationDriver, TurnOutcome};
use road_ai_core::config::{Config, ConfigLoader, ProviderKind};
use road_ai_core::logging::init_logging;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "road-ai")]
#[command(about = "Chat with an assistant grounded in the Oman Highway Design Standards")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize road-ai configuration
    Onboard,
    /// Start an interactive chat
    Chat {
        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Ask a single question in a fresh discussion
    Ask {
        /// Question to send
        #[arg(short, long)]
        message: String,
        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Show status information
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    // A broken config file is reported by the command itself.
    let logging_config = config_loader
        .load()
        .map(|config| config.logging)
        .unwrap_or_default();
    let _log_guard = init_logging(&logging_config);

    match cli.command {
        Commands::Onboard => {
            info!("Running onboard command");
            run_onboard(&config_loader)?;
        }
        Commands::Chat { model } => {
            info!("Starting chat");
            run_chat(&config_loader, model).await?;
        }
        Commands::Ask { message, model } => {
            info!("Asking a single question");
            run_ask(&config_loader, &message, model).await?;
        }
        Commands::Status => {
            info!("Showing status");
            run_status(&config_loader)?;
        }
    }

    Ok(())
}

/// Load configuration and build a driver, applying a model override
fn build_driver(loader: &ConfigLoader, model: Option<String>) -> Result<ConversationDriver> {
    let mut config = loader.load()?;
    if let Some(model) = model {
        config.provider.model = model;
    }
    if config.provider.api_key.trim().is_empty() {
        println!(
            "{}",
            style("No API key configured; run `road-ai onboard` or set GEMINI_API_KEY.").yellow()
        );
    }
    Ok(ConversationDriver::from_config(&config)?)
}

async fn run_chat(loader: &ConfigLoader, model: Option<String>) -> Result<()> {
    let driver = Arc::new(build_driver(loader, model)?);
    chat::run_chat(driver).await
}

async fn run_ask(loader: &ConfigLoader, message: &str, model: Option<String>) -> Result<()> {
    let driver = build_driver(loader, model)?;
    let session_id = driver.store().write().create_session();

    println!("{}", style("Consulting the standards...").cyan());

    match driver.send_turn(&session_id, message).await? {
        TurnOutcome::Fulfilled(reply) => {
            println!("\n{}", style("Response:").bold());
            println!("{}", reply.text);
        }
        TurnOutcome::Failed(diagnostic) => {
            error!("Question could not be answered");
            println!("\n{}", style(&diagnostic.text).red());
            anyhow::bail!("the model did not answer");
        }
    }

    Ok(())
}

fn run_onboard(loader: &ConfigLoader) -> Result<()> {
    println!("{}", style("Welcome to Oman Road AI!").bold().cyan());
    println!("Let's set up your configuration.\n");

    let config_path = loader.config_path();
    if config_path.exists() {
        let overwrite = Confirm::new()
            .with_prompt("Configuration already exists. Overwrite?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Onboard cancelled.");
            return Ok(());
        }
    }

    let kinds = [ProviderKind::Gemini, ProviderKind::Openai];
    let labels = ["gemini", "openai (or any compatible endpoint)"];
    let kind_idx = Select::new()
        .with_prompt("Select your model provider")
        .items(&labels)
        .default(0)
        .interact()?;
    let kind = kinds[kind_idx];

    let api_key: String = Input::new()
        .with_prompt(format!("Enter your {} API key", kind.as_str()))
        .allow_empty(true)
        .interact_text()?;

    let default_model = match kind {
        ProviderKind::Gemini => "gemini-2.5-flash",
        ProviderKind::Openai => "gpt-4o-mini",
    };
    let model: String = Input::new()
        .with_prompt("Enter the model to use")
        .default(default_model.to_string())
        .interact_text()?;

    let api_base: String = Input::new()
        .with_prompt("API base URL (leave empty for the provider default)")
        .allow_empty(true)
        .interact_text()?;

    let mut config = Config::default();
    config.provider.kind = kind;
    config.provider.api_key = api_key;
    config.provider.model = model;
    config.provider.api_base = Some(api_base.trim().to_string()).filter(|b| !b.is_empty());

    loader.save(&config)?;

    println!(
        "\n{}",
        style("Configuration saved successfully!").green().bold()
    );
    println!("Config location: {}", config_path.display());
    println!("\nYou can now run:");
    println!("  {} - Start chatting", style("road-ai chat").cyan());
    println!(
        "  {} - Ask one question",
        style("road-ai ask --message 'Minimum lane width?'").cyan()
    );

    Ok(())
}

fn run_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;

    println!("{}", style("Oman Road AI Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    let file_state = if loader.config_path().exists() {
        style("present").green()
    } else {
        style("missing (defaults in use)").yellow()
    };
    println!("  Config file: {}", file_state);
    println!("  Log directory: {}", config.logging.dir);
    println!();

    println!("{}", style("Provider:").bold());
    println!("  Kind: {}", config.provider.kind.as_str());
    println!("  Model: {}", config.provider.model);
    if let Some(base) = &config.provider.api_base {
        println!("  API base: {}", base);
    }
    let key_state = if config.provider.api_key.trim().is_empty() {
        style("not configured").red()
    } else {
        style("configured").green()
    };
    println!("  API key: {}", key_state);
    println!();

    println!("{}", style("Reference document:").bold());
    match &config.knowledge.document_path {
        Some(path) => println!("  {}", path),
        None => println!("  built-in Highway Design Standards 2017 (Volume 3)"),
    }

    Ok(())
}
