use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use bank_review_scraper::source::GooglePlayClient;
use bank_review_scraper::{Args, Config, Scraper};

#[tokio::main]
async fn main() -> Result<()> {
    // .env has to be loaded before clap reads its env fallbacks.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::from_args(args).context("invalid configuration")?;
    info!(
        "scraper: {} targets, reviews_per_bank={} max_retries={} lang={} country={} data_dir={}",
        config.targets.len(),
        config.reviews_per_bank,
        config.max_retries,
        config.language,
        config.country,
        config.data_dir.display()
    );

    let client = GooglePlayClient::new(config.http_timeout).context("build http client")?;
    let scraper = Scraper::new(config, client);
    let table = scraper.run_all().await;

    info!(
        "Scraping completed: {} reviews, {} apps with metadata",
        table.reviews.len(),
        table.metadata.len()
    );
    Ok(())
}
