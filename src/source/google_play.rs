use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use reqwest::header;
use serde_json::{json, Value};

use super::{ReviewQuery, ReviewSource, SourceError};
use crate::models::{RawReview, StoreApp};

const PLAY_BASE_URL: &str = "https://play.google.com";
const REVIEWS_RPC_ID: &str = "UsvDTd";
/// The store refuses larger pages.
const MAX_REVIEWS_PER_REQUEST: usize = 199;
const USER_AGENT: &str = "bank-review-scraper/0.1";

/// Client for the public Google Play web endpoints.
pub struct GooglePlayClient {
    client: reqwest::Client,
    base_url: String,
}

impl GooglePlayClient {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        Self::with_base_url(PLAY_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_review_page(
        &self,
        app_id: &str,
        query: &ReviewQuery<'_>,
        count: usize,
        token: Option<&str>,
    ) -> Result<(Vec<RawReview>, Option<String>), SourceError> {
        let url = format!(
            "{}/_/PlayStoreUi/data/batchexecute?hl={}&gl={}",
            self.base_url,
            urlencoding::encode(query.lang),
            urlencoding::encode(query.country)
        );
        let body = format!(
            "f.req={}",
            urlencoding::encode(&reviews_request_payload(app_id, query, count, token))
        );
        let resp = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded;charset=UTF-8")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(app_id.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Status { app_id: app_id.to_string(), status: status.as_u16() });
        }
        let text = resp.text().await?;
        parse_reviews_response(&text, app_id)
    }
}

#[async_trait]
impl ReviewSource for GooglePlayClient {
    async fn get_app(
        &self,
        app_id: &str,
        lang: &str,
        country: &str,
    ) -> Result<StoreApp, SourceError> {
        let url = format!(
            "{}/store/apps/details?id={}&hl={}&gl={}",
            self.base_url,
            urlencoding::encode(app_id),
            urlencoding::encode(lang),
            urlencoding::encode(country)
        );
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(app_id.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Status { app_id: app_id.to_string(), status: status.as_u16() });
        }
        let html = resp.text().await?;
        parse_app_page(&html)
    }

    async fn get_reviews(
        &self,
        app_id: &str,
        query: ReviewQuery<'_>,
    ) -> Result<Vec<RawReview>, SourceError> {
        let mut out: Vec<RawReview> = Vec::new();
        let mut token: Option<String> = None;
        while out.len() < query.count {
            let want = (query.count - out.len()).min(MAX_REVIEWS_PER_REQUEST);
            let (page, next) = self
                .fetch_review_page(app_id, &query, want, token.as_deref())
                .await?;
            debug!("{}: fetched page of {} reviews", app_id, page.len());
            if page.is_empty() {
                break;
            }
            out.extend(page);
            match next {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        out.truncate(query.count);
        Ok(out)
    }
}

fn reviews_request_payload(
    app_id: &str,
    query: &ReviewQuery<'_>,
    count: usize,
    token: Option<&str>,
) -> String {
    let inner = json!([
        null,
        null,
        [2, query.sort.code(), [count, null, token], null, [null, query.filter_score]],
        [app_id, 7]
    ]);
    json!([[[REVIEWS_RPC_ID, inner.to_string(), null, "generic"]]]).to_string()
}

/// Parses a `batchexecute` reply into reviews plus the continuation token.
pub(crate) fn parse_reviews_response(
    body: &str,
    app_id: &str,
) -> Result<(Vec<RawReview>, Option<String>), SourceError> {
    let payload = body.trim_start_matches(")]}'").trim_start();
    let envelope: Value = serde_json::from_str(payload)?;
    let inner = match nested(&envelope, &[0, 2]).and_then(Value::as_str) {
        Some(s) => s,
        // The store answers with a null payload once there is nothing left.
        None => return Ok((Vec::new(), None)),
    };
    let data: Value = serde_json::from_str(inner)?;

    let items = data
        .get(0)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let reviews = items.iter().map(|item| review_from_item(item, app_id)).collect();

    let token = data
        .as_array()
        .and_then(|arr| arr.len().checked_sub(2).and_then(|i| arr.get(i)))
        .and_then(Value::as_array)
        .and_then(|last| last.last())
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok((reviews, token))
}

fn review_from_item(item: &Value, app_id: &str) -> RawReview {
    let mut r = RawReview::new().with("appId", app_id);
    let fields: [(&str, &[usize]); 9] = [
        ("reviewId", &[0]),
        ("userName", &[1, 0]),
        ("content", &[4]),
        ("score", &[2]),
        ("thumbsUpCount", &[6]),
        ("at", &[5, 0]),
        ("replyContent", &[7, 1]),
        ("repliedAt", &[7, 2, 0]),
        ("appVersion", &[10]),
    ];
    for (key, path) in fields {
        if let Some(v) = nested(item, path).filter(|v| !v.is_null()) {
            r.insert(key, v.clone());
        }
    }
    r
}

fn dataset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"AF_initDataCallback\(\{key:\s*'(ds:\d+)'",
            r"[\s\S]*?data:([\s\S]*?), sideChannel: \{\}\}\);"
        ))
        .expect("dataset regex")
    })
}

/// Collects the `AF_initDataCallback` datasets embedded in a details page.
fn extract_datasets(html: &str) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    for caps in dataset_regex().captures_iter(html) {
        let key = caps[1].to_string();
        match serde_json::from_str::<Value>(&caps[2]) {
            Ok(v) => {
                out.insert(key, v);
            }
            Err(e) => debug!("skipping dataset {}: {}", key, e),
        }
    }
    out
}

pub(crate) fn parse_app_page(html: &str) -> Result<StoreApp, SourceError> {
    let datasets = extract_datasets(html);
    let details = datasets
        .get("ds:5")
        .and_then(|ds| nested(ds, &[1, 2]))
        .ok_or_else(|| SourceError::MissingData("ds:5 app details".to_string()))?;

    let text = |path: &[usize]| nested(details, path).and_then(Value::as_str).map(str::to_string);

    Ok(StoreApp {
        title: text(&[0, 0]),
        installs: text(&[13, 0]),
        developer: text(&[68, 0]),
        score: nested(details, &[51, 0, 1]).and_then(Value::as_f64),
        description: text(&[72, 0, 1]).map(|d| d.replace("<br>", "\n")),
    })
}

fn nested<'a>(v: &'a Value, path: &[usize]) -> Option<&'a Value> {
    path.iter().try_fold(v, |cur, &i| cur.get(i))
}
