use clap::{Parser, Subcommand};
use tracing::error;

use patent_unifier::apis::GooglePatentsClient;
use patent_unifier::config::Config;
use patent_unifier::index::SourceData;
use patent_unifier::logging;
use patent_unifier::pipeline::{
    self, run_index_stage, run_integrate_stage, run_process_stage, StageResult,
};

#[derive(Parser)]
#[command(name = "patent_unifier")]
#[command(about = "Patent and drug data integration pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize the Cortellis sheet exports into JSON artifacts
    Process,
    /// Fetch Google Patents data and merge it with the processed records
    Integrate,
    /// Build the cross-source availability index
    Index,
    /// Run the full batch (process + integrate + index)
    Run,
}

fn report(result: &StageResult) {
    println!("\n📊 Stage summary:");
    println!("   Processed: {}", result.processed_count);
    println!("   Errors: {}", result.error_count);
    println!("   {}", result.message);
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Ok(Config::load_from(path)?)
    } else {
        // No config file is fine; everything has a default except the API
        // credential, which only the integrate stage needs.
        Ok(Config::default())
    }
}

fn build_search_client(config: &Config) -> anyhow::Result<GooglePatentsClient> {
    let api_key = config.serpapi_key()?;
    Ok(GooglePatentsClient::new(
        config.google_patents.clone(),
        api_key,
    )?)
}

fn print_unified_summary(config: &Config) {
    match pipeline::load_unified_summary(config) {
        Ok(SourceData::Ok(summary)) => {
            println!("\n📦 Unified dataset:");
            for (category, count) in &summary {
                println!("   {}: {}", category, count);
            }
        }
        Ok(SourceData::Unavailable) => {
            println!("\n📦 No unified dataset yet (run `integrate` first)");
        }
        Ok(SourceData::Failed(reason)) => {
            println!("\n⚠️  Unified dataset unreadable: {}", reason);
        }
        Err(e) => {
            error!("Failed to summarize unified dataset: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Process => {
            println!("🔄 Running process stage...");
            let result = run_process_stage(&config)?;
            report(&result);
        }
        Commands::Integrate => {
            println!("🔎 Running integrate stage...");
            let client = build_search_client(&config)?;
            let result = run_integrate_stage(&config, &client).await?;
            report(&result);
        }
        Commands::Index => {
            println!("🗂️  Running index stage...");
            let result = run_index_stage(&config)?;
            report(&result);
            print_unified_summary(&config);
        }
        Commands::Run => {
            println!("🚀 Running full pipeline (process + integrate + index)...");
            let client = build_search_client(&config)?;
            for result in pipeline::run_full(&config, &client).await? {
                report(&result);
            }
            print_unified_summary(&config);
        }
    }

    Ok(())
}
