use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const REVIEW_SOURCE_LABEL: &str = "Google Play";
pub const UNKNOWN_BANK: &str = "Unknown Bank";

/// One configured (bank, store app id) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTarget {
    pub bank_code: String,
    pub app_id: String,
    pub bank_name: String,
}

impl AppTarget {
    pub fn new(bank_code: &str, app_id: &str, bank_name: &str) -> Self {
        Self {
            bank_code: bank_code.to_string(),
            app_id: app_id.to_string(),
            bank_name: bank_name.to_string(),
        }
    }
}

/// Review record as handed back by a review source. Keys may be missing;
/// a JSON `null` counts as missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReview(Map<String, Value>);

impl RawReview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for RawReview {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Flattened review row. `rating == None` is written as an empty field,
/// which keeps "no rating" distinct from a zero rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedReview {
    pub review_text: Option<String>,
    pub rating: Option<u8>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub date: DateTime<Utc>,
    pub bank_app_name: String,
    pub source: &'static str,
}

/// App details as returned by the store, before being tied to a target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreApp {
    pub title: Option<String>,
    pub installs: Option<String>,
    pub developer: Option<String>,
    pub score: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppMetadata {
    pub bank_code: String,
    pub app_id: String,
    pub app_name: Option<String>,
    pub installs: Option<String>,
    pub developer: Option<String>,
    pub score: Option<f64>,
    pub description: Option<String>,
}

impl AppMetadata {
    pub fn from_store(target: &AppTarget, app: StoreApp) -> Self {
        Self {
            bank_code: target.bank_code.clone(),
            app_id: target.app_id.clone(),
            app_name: app.title,
            installs: app.installs,
            developer: app.developer,
            score: app.score,
            description: app.description,
        }
    }
}

/// Per-target outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSummary {
    pub bank_code: String,
    pub app_id: String,
    pub reviews: usize,
    pub metadata_fetched: bool,
}

/// Everything one run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewTable {
    pub reviews: Vec<NormalizedReview>,
    pub metadata: Vec<AppMetadata>,
    pub summary: Vec<TargetSummary>,
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_review_null_is_missing() {
        let r = RawReview::new().with("score", Value::Null).with("content", "ok");
        assert!(r.get("score").is_none());
        assert_eq!(r.get_str("content"), Some("ok"));
        assert!(r.get("at").is_none());
    }

    #[test]
    fn test_raw_review_from_map() {
        let map = json!({"content": "great app", "score": 4})
            .as_object()
            .cloned()
            .unwrap();
        let r = RawReview::from(map);
        assert_eq!(r.get("score").and_then(Value::as_u64), Some(4));
    }

    #[test]
    fn test_metadata_from_store() {
        let target =
            AppTarget::new("CBE", "com.combanketh.mobilebanking", "Commercial Bank of Ethiopia");
        let app = StoreApp {
            title: Some("CBE Mobile".to_string()),
            installs: Some("1,000,000+".to_string()),
            developer: None,
            score: Some(4.2),
            description: None,
        };
        let meta = AppMetadata::from_store(&target, app);
        assert_eq!(meta.bank_code, "CBE");
        assert_eq!(meta.app_id, "com.combanketh.mobilebanking");
        assert_eq!(meta.app_name.as_deref(), Some("CBE Mobile"));
        assert_eq!(meta.score, Some(4.2));
    }
}
