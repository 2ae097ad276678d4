mod collectors;
mod config;
mod db;
mod error;
mod events;
mod models;
mod store;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::collectors::fetcher::HttpFetcher;
use crate::collectors::filter::RelevanceFilter;
use crate::collectors::runner::{self, Crawler};
use crate::config::Config;
use crate::events::TracingEventSink;
use crate::store::PgJobStore;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobscout=info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let crawl_config = config.crawl_config()?;
    let relevance = RelevanceFilter::new(&crawl_config)?;
    let fetcher = HttpFetcher::new(&crawl_config)?;

    let pool = db::create_pool(&config.database_url)?;
    let mut had_errors = false;
    if config.run_migrations {
        tracing::info!("Running database migrations...");
        match db::run_migrations(&pool).await {
            Ok(()) => tracing::info!("Migrations complete"),
            Err(e) => {
                tracing::error!("Migrations failed: {e}");
                had_errors = true;
            }
        }
    }
    let store = PgJobStore::new(pool);

    let crawler = Crawler {
        config: &crawl_config,
        filter: &relevance,
        fetcher: &fetcher,
        store: &store,
    };
    let interval = config.crawl_interval.map(Duration::from_secs);
    had_errors |= runner::run(&crawler, &TracingEventSink, interval).await;

    Ok(if had_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
