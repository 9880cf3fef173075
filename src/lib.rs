pub mod config;
pub mod models;
pub mod normalize;
pub mod output;
pub mod scraper;
pub mod source;

pub use config::{Args, Config, ConfigError};
pub use scraper::Scraper;
