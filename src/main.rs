//! AutoDev Team - entry point.
//!
//! `autodev-team serve` (the default) starts the web UI; `autodev-team run`
//! executes a single task from the command line.

use std::sync::Arc;

use autodev_team::{
    api,
    config::Config,
    crew::{Crew, LogProgress},
    llm::{LlmClient, OpenAiClient},
    task::TaskRecord,
    OutputStore,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "autodev-team", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP server and web UI
    Serve,
    /// Run one task and print the combined result
    Run {
        /// Task description
        task: String,
        /// Also write extracted code blocks to the output directory
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autodev_team=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, output_dir={}",
        config.llm.model,
        config.output_dir.display()
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting server on {}:{}", config.host, config.port);
            api::serve(config).await?;
        }
        Command::Run { task, save } => run_once(config, &task, save).await?,
    }

    Ok(())
}

async fn run_once(config: Config, task: &str, save: bool) -> anyhow::Result<()> {
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::from_config(&config.llm)?);
    let crew = Crew::from_config(llm, &config.llm);

    let mut record = TaskRecord::new(task)?;
    let result = crew.run(&mut record, &LogProgress).await?;

    println!("\n🎉 Final Result:");
    println!("{}", result);

    if save {
        let store = OutputStore::new(config.output_dir);
        for file in store.save_result(&result).await? {
            println!("📄 {}", file.path.display());
        }
    }

    Ok(())
}
