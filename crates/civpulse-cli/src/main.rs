mod commands;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "civpulse")]
#[command(about = "Collect and classify public sentiment about government policies")]
struct Cli {
    /// Print `{ records, errors, stats }` as JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect one search query from every configured source
    Run {
        /// Search query sent to each platform
        #[arg(long)]
        query: String,

        /// Size of the time window, ending now
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Collect every search query configured for a policy
    Policy {
        /// Policy label, e.g. "Digital India"
        name: String,

        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Run the pipeline over generated posts; needs no credentials
    Demo {
        /// Posts generated per platform
        #[arg(long, default_value_t = 100)]
        posts: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 90)]
        days: i64,
    },
    /// Classify a CSV with `date`, `text` and `platform` columns
    Upload {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = civpulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let taxonomy = match &config.taxonomy_path {
        Some(path) => civpulse_core::load_taxonomy(path)?,
        None => civpulse_core::Taxonomy::builtin(),
    };

    let outcome = match cli.command {
        Commands::Run { query, days } => commands::run_query(&config, &taxonomy, &query, days).await?,
        Commands::Policy { name, days } => {
            commands::run_policy(&config, &taxonomy, &name, days).await?
        }
        Commands::Demo { posts, seed, days } => {
            commands::run_demo(&config, &taxonomy, posts, seed, days).await?
        }
        Commands::Upload { path } => commands::run_upload(&config, &taxonomy, &path).await?,
    };

    if cli.json {
        println!("{}", report::to_json(&outcome)?);
    } else {
        report::print_summary(&outcome);
    }

    Ok(())
}
