use async_trait::async_trait;
use thiserror::Error;

use crate::models::{RawReview, StoreApp};

pub mod google_play;

pub use google_play::GooglePlayClient;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {app_id}")]
    Status { app_id: String, status: u16 },
    #[error("app not found: {0}")]
    NotFound(String),
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing data in response: {0}")]
    MissingData(String),
}

/// Review ordering understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sort {
    MostRelevant,
    #[default]
    Newest,
    Rating,
}

impl Sort {
    pub fn code(self) -> u8 {
        match self {
            Sort::MostRelevant => 1,
            Sort::Newest => 2,
            Sort::Rating => 3,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReviewQuery<'a> {
    pub lang: &'a str,
    pub country: &'a str,
    pub sort: Sort,
    pub count: usize,
    /// Only reviews with this star rating; `None` keeps all.
    pub filter_score: Option<u8>,
}

/// Where app details and reviews come from.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn get_app(
        &self,
        app_id: &str,
        lang: &str,
        country: &str,
    ) -> Result<StoreApp, SourceError>;

    async fn get_reviews(
        &self,
        app_id: &str,
        query: ReviewQuery<'_>,
    ) -> Result<Vec<RawReview>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_codes() {
        assert_eq!(Sort::MostRelevant.code(), 1);
        assert_eq!(Sort::Newest.code(), 2);
        assert_eq!(Sort::Rating.code(), 3);
        assert_eq!(Sort::default(), Sort::Newest);
    }

    #[test]
    fn test_error_display() {
        let e = SourceError::Status { app_id: "com.x".to_string(), status: 503 };
        assert_eq!(e.to_string(), "unexpected status 503 for com.x");
        assert_eq!(SourceError::NotFound("com.y".to_string()).to_string(), "app not found: com.y");
    }
}
