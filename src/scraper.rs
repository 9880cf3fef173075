use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{error, info, warn};

use crate::config::Config;
use crate::models::{AppMetadata, AppTarget, RawReview, ReviewTable, TargetSummary};
use crate::normalize::normalize;
use crate::output;
use crate::source::{ReviewQuery, ReviewSource, Sort};

/// Pause between retry attempts.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs the per-bank fetch and flattens everything into one review table.
pub struct Scraper<S, D = TokioDelay> {
    config: Config,
    source: S,
    delay: D,
    bank_names: HashMap<String, String>,
}

impl<S: ReviewSource> Scraper<S, TokioDelay> {
    pub fn new(config: Config, source: S) -> Self {
        Self::with_delay(config, source, TokioDelay)
    }
}

impl<S: ReviewSource, D: Delay> Scraper<S, D> {
    pub fn with_delay(config: Config, source: S, delay: D) -> Self {
        let bank_names = config
            .targets
            .iter()
            .map(|t| (t.app_id.clone(), t.bank_name.clone()))
            .collect();
        Self { config, source, delay, bank_names }
    }

    /// Single attempt; a failure is logged and yields `None`.
    pub async fn fetch_app_info(&self, target: &AppTarget) -> Option<AppMetadata> {
        match self
            .source
            .get_app(&target.app_id, &self.config.language, &self.config.country)
            .await
        {
            Ok(app) => {
                let meta = AppMetadata::from_store(target, app);
                info!(
                    "App Name: {}, Installs: {}",
                    meta.app_name.as_deref().unwrap_or("-"),
                    meta.installs.as_deref().unwrap_or("-")
                );
                Some(meta)
            }
            Err(e) => {
                error!("Error fetching app info for {}: {}", target.app_id, e);
                None
            }
        }
    }

    /// Up to `max_retries` attempts with a fixed pause in between. Returns
    /// whatever the first successful attempt produced, or nothing once every
    /// attempt has failed.
    pub async fn fetch_reviews(&self, app_id: &str, target_count: usize) -> Vec<RawReview> {
        info!("Scraping reviews for {}...", app_id);
        let max = self.config.max_retries.max(1);
        let query = ReviewQuery {
            lang: &self.config.language,
            country: &self.config.country,
            sort: Sort::Newest,
            count: target_count,
            filter_score: None,
        };

        for attempt in 1..=max {
            match self.source.get_reviews(app_id, query).await {
                Ok(reviews) => {
                    info!("Successfully fetched {} reviews for {}", reviews.len(), app_id);
                    return reviews;
                }
                Err(e) => {
                    warn!("Attempt {} failed for {}: {}", attempt, app_id, e);
                    if attempt < max {
                        info!(
                            "Retrying in {}... ({}/{})",
                            humantime::format_duration(self.config.retry_delay),
                            attempt,
                            max
                        );
                        self.delay.wait(self.config.retry_delay).await;
                    }
                }
            }
        }

        error!("Max retries reached for {}. Skipping.", app_id);
        Vec::new()
    }

    /// Fetches every target in order, writes both tables and returns what was
    /// collected. Never fails: missing data just means fewer rows.
    pub async fn run_all(&self) -> ReviewTable {
        let bar = target_progress(self.config.targets.len());
        let table = self.run_with_progress(&bar).await;
        bar.finish_and_clear();
        table
    }

    /// `run_all` reporting progress on `bar`, one tick per target.
    pub async fn run_with_progress(&self, bar: &ProgressBar) -> ReviewTable {
        let mut table = ReviewTable::default();

        for target in &self.config.targets {
            info!("Starting scrape for {} ({})", target.bank_code, target.app_id);
            bar.set_message(target.bank_code.clone());

            let meta = self.fetch_app_info(target).await;
            let metadata_fetched = meta.is_some();
            table.metadata.extend(meta);

            let raw = self
                .fetch_reviews(&target.app_id, self.config.reviews_per_bank)
                .await;
            let processed = normalize(&raw, &self.bank_names, Utc::now());
            info!("Processed {} reviews.", processed.len());

            table.summary.push(TargetSummary {
                bank_code: target.bank_code.clone(),
                app_id: target.app_id.clone(),
                reviews: processed.len(),
                metadata_fetched,
            });
            table.reviews.extend(processed);
            bar.inc(1);
        }

        self.save(&table);

        for s in &table.summary {
            info!(
                "summary: bank={} app={} reviews={} metadata={}",
                s.bank_code, s.app_id, s.reviews, s.metadata_fetched
            );
        }
        table
    }

    fn save(&self, table: &ReviewTable) {
        let reviews_path = self.config.reviews_path();
        match output::write_reviews(&reviews_path, &table.reviews) {
            Ok(()) => info!("Saved all reviews to {}", reviews_path.display()),
            Err(e) => error!("Failed to save reviews to {}: {:?}", reviews_path.display(), e),
        }

        let metadata_path = self.config.metadata_path();
        match output::write_metadata(&metadata_path, &table.metadata) {
            Ok(()) => info!("Saved app metadata to {}", metadata_path.display()),
            Err(e) => error!("Failed to save app metadata to {}: {:?}", metadata_path.display(), e),
        }
    }
}

fn target_progress(len: usize) -> ProgressBar {
    let bar =
        ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::stderr_with_hz(4));
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} banks {msg}",
    ) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}
