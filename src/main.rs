//! Command-line entry point for the scraper.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use sc2_data_scraper::application::ScrapeOrchestrator;
use sc2_data_scraper::infrastructure::config::ScraperConfig;
use sc2_data_scraper::infrastructure::http_client::{HttpClient, HttpClientConfig};
use sc2_data_scraper::infrastructure::logging::init_logging;

/// Scrape StarCraft II unit, building and upgrade data from Liquipedia.
#[derive(Parser, Debug)]
#[command(name = "sc2-data-scraper", version)]
struct Args {
    /// Output directory for the JSON artifact and icons
    #[arg(short, long, default_value = "assets")]
    output: PathBuf,

    /// Maximum number of concurrent workers
    #[arg(long, default_value_t = 5)]
    max_workers: usize,

    /// Delay between requests in seconds
    #[arg(long, default_value_t = 1.0)]
    delay: f64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging("info");

    let mut config = ScraperConfig::default();
    config.output_dir = args.output;
    config.workers.max_workers = args.max_workers;
    config.workers.request_delay_ms = (args.delay.max(0.0) * 1000.0) as u64;
    let config = config.validated();

    let cancellation = CancellationToken::new();
    {
        let token = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, aborting scrape");
                token.cancel();
            }
        });
    }

    let client_config = HttpClientConfig {
        user_agent: config.source.user_agent.clone(),
        timeout_seconds: config.workers.request_timeout_seconds,
        max_requests_per_second: config.workers.max_requests_per_second,
    };
    let client = match HttpClient::new(client_config, cancellation.clone()) {
        Ok(client) => Arc::new(client),
        Err(error) => {
            error!(error = ?error, "failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = match ScrapeOrchestrator::new(client, config, cancellation) {
        Ok(orchestrator) => orchestrator,
        Err(error) => {
            error!(error = ?error, "failed to initialize scraper");
            return ExitCode::FAILURE;
        }
    };

    match orchestrator.run().await {
        Ok(result) => {
            info!(
                total_entities = result.metadata.total_entities,
                "scraping complete"
            );
            for (race, dataset) in &result.races {
                info!(
                    race = %race,
                    detailed = dataset.detailed_data.len(),
                    listed = dataset.entities.len(),
                    upgrades = dataset.upgrades.len(),
                    "race summary"
                );
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(error = ?error, "scrape failed");
            ExitCode::FAILURE
        }
    }
}
