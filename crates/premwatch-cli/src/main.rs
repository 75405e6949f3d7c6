mod output;
mod run;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "premwatch")]
#[command(about = "UK premises licence register monitor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one extraction pass over the configured councils
    Run {
        /// Only process this council id
        #[arg(long)]
        council: Option<String>,
        /// Process at most this many targets, in file order
        #[arg(long)]
        max_targets: Option<usize>,
        /// Show the strategy plan for each target without fetching anything
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Validate the targets file and list its entries
    Targets,
    /// Summarize the canonical licence record store
    Records {
        /// Number of highest-risk records to list
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = premwatch_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(env = %config.env, config = ?config, "configuration loaded");

    match command {
        Commands::Run {
            council,
            max_targets,
            dry_run,
        } => {
            let options = run::RunOptions {
                council,
                max_targets,
                dry_run,
            };
            run::run_extraction(&config, &options).await?;
        }
        Commands::Targets => run::list_targets(&config)?,
        Commands::Records { limit } => run::show_records(&config, limit)?,
    }

    Ok(())
}
