//! Mentora command line client

mod commands;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mentora_core::service::config::{self, AppConfig};
use mentora_core::{JsonFileStore, KeyValueStore, MemoryStore, SkillTreeStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "mentora", version, about = "Mentora learning platform client")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// trace, debug, info, warn, error or off
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat with the mentor agent; without a prompt, starts a session
    Chat {
        #[arg(long)]
        agent_id: Option<String>,
        prompt: Option<String>,
    },
    /// Generate a skill tree for a prompt and show its layout
    Tree {
        prompt: String,
        /// Also store the tree under this goal id
        #[arg(long)]
        goal: Option<String>,
        #[arg(short, long)]
        direction: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Lay out a skill tree from a file or a stored goal
    Layout {
        input: Option<PathBuf>,
        #[arg(long)]
        goal: Option<String>,
        #[arg(short, long)]
        direction: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Build a skill tree locally from a nested topic document
    Generate {
        input: PathBuf,
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Take the quiz attached to a skill-tree node
    Quiz {
        input: Option<PathBuf>,
        #[arg(long)]
        goal: Option<String>,
        #[arg(long, default_value = "1")]
        node: String,
    },
}

async fn open_store(config: &AppConfig) -> Result<SkillTreeStore> {
    let store: Arc<dyn KeyValueStore> = match config.storage_path() {
        Some(path) => {
            log::debug!("Opening state file: path={}", path.display());
            Arc::new(JsonFileStore::open(path).await?)
        }
        None => {
            log::warn!("No data directory available, state will not be persisted");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(SkillTreeStore::load(store).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_level = std::env::var(logging::LOG_LEVEL_ENV).ok();
    let level = logging::resolve_log_level(cli.log_level.as_deref(), env_level.as_deref(), cli.verbose);
    logging::init_logging(level)?;

    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Chat { agent_id, prompt } => commands::chat::run(&config, agent_id, prompt).await,
        Command::Tree {
            prompt,
            goal,
            direction,
            json,
        } => {
            let direction = direction.as_deref().map(commands::tree::parse_direction).transpose()?;
            let store = open_store(&config).await?;
            commands::tree::generate_remote(&config, &store, &prompt, goal.as_deref(), direction, json).await
        }
        Command::Layout {
            input,
            goal,
            direction,
            json,
        } => {
            let direction = direction.as_deref().map(commands::tree::parse_direction).transpose()?;
            let store = open_store(&config).await?;
            commands::tree::layout_file(&config, &store, input.as_deref(), goal.as_deref(), direction, json)
                .await
        }
        Command::Generate { input, max_depth } => commands::tree::generate_local(&config, &input, max_depth),
        Command::Quiz { input, goal, node } => {
            let store = open_store(&config).await?;
            commands::quiz::run(&store, input.as_deref(), goal.as_deref(), &node).await
        }
    }
}
