use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::warn;

use crate::models::AppTarget;

/// Banks the scraper knows about: (code, display name). Order is run order.
pub const BANKS: [(&str, &str); 3] = [
    ("CBE", "Commercial Bank of Ethiopia"),
    ("BOA", "Bank of Abyssinia"),
    ("DASHEN", "Dashen Bank"),
];

#[derive(Parser, Debug, Clone)]
#[command(
    name = "bank-review-scraper",
    about = "Fetch Google Play reviews and app details for bank apps"
)]
pub struct Args {
    /// Store id of the Commercial Bank of Ethiopia app
    #[arg(long, env = "CBE_ID")]
    pub cbe_id: Option<String>,

    /// Store id of the Bank of Abyssinia app
    #[arg(long, env = "BOA_ID")]
    pub boa_id: Option<String>,

    /// Store id of the Dashen Bank app
    #[arg(long, env = "DASHEN_ID")]
    pub dashen_id: Option<String>,

    /// Reviews requested per bank
    #[arg(long, env = "REVIEWS_PER_BANK", default_value_t = 400)]
    pub reviews_per_bank: usize,

    /// Attempts per review fetch
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    #[arg(long, env = "LANGUAGE", default_value = "en")]
    pub language: String,

    #[arg(long, env = "COUNTRY", default_value = "Ethiopia")]
    pub country: String,

    /// Pause between review fetch attempts
    #[arg(
        long,
        env = "RETRY_DELAY",
        default_value = "3s",
        value_parser = humantime::parse_duration
    )]
    pub retry_delay: Duration,

    #[arg(
        long,
        env = "HTTP_TIMEOUT",
        default_value = "20s",
        value_parser = humantime::parse_duration
    )]
    pub http_timeout: Duration,

    /// Root of the output tree
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub targets: Vec<AppTarget>,
    pub reviews_per_bank: usize,
    pub max_retries: u32,
    pub language: String,
    pub country: String,
    pub retry_delay: Duration,
    pub http_timeout: Duration,
    pub data_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No app ids configured; set at least one of CBE_ID, BOA_ID, DASHEN_ID")]
    NoTargets,

    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let ids = [args.cbe_id, args.boa_id, args.dashen_id];
        let mut targets = Vec::with_capacity(BANKS.len());
        for ((code, name), id) in BANKS.iter().zip(ids) {
            match id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
                Some(app_id) => targets.push(AppTarget::new(code, &app_id, name)),
                None => warn!("{}_ID not set; skipping {}", code, name),
            }
        }

        let config = Self {
            targets,
            reviews_per_bank: args.reviews_per_bank,
            max_retries: args.max_retries,
            language: args.language,
            country: args.country,
            retry_delay: args.retry_delay,
            http_timeout: args.http_timeout,
            data_dir: args.data_dir,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MAX_RETRIES".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "LANGUAGE".to_string(),
                "cannot be empty".to_string(),
            ));
        }
        if self.country.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "COUNTRY".to_string(),
                "cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reviews_path(&self) -> PathBuf {
        self.data_dir.join("raw").join("raw_reviews.csv")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("processed").join("app_metadata.csv")
    }
}
