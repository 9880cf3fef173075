use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::models::{NormalizedReview, RawReview, REVIEW_SOURCE_LABEL, UNKNOWN_BANK};

/// Maps raw store reviews onto the flat review row, one output per input and
/// in input order. `bank_names` is keyed by store app id. `fetched_at` stands
/// in for reviews that carry no usable timestamp.
pub fn normalize(
    raw_reviews: &[RawReview],
    bank_names: &HashMap<String, String>,
    fetched_at: DateTime<Utc>,
) -> Vec<NormalizedReview> {
    raw_reviews
        .iter()
        .map(|r| normalize_one(r, bank_names, fetched_at))
        .collect()
}

fn normalize_one(
    review: &RawReview,
    bank_names: &HashMap<String, String>,
    fetched_at: DateTime<Utc>,
) -> NormalizedReview {
    let bank_app_name = review
        .get_str("appId")
        .and_then(|id| bank_names.get(id))
        .cloned()
        .unwrap_or_else(|| UNKNOWN_BANK.to_string());

    NormalizedReview {
        review_text: review.get_str("content").map(str::to_string),
        rating: review.get("score").and_then(parse_rating),
        date: review.get("at").and_then(parse_timestamp).unwrap_or(fetched_at),
        bank_app_name,
        source: REVIEW_SOURCE_LABEL,
    }
}

fn parse_rating(v: &Value) -> Option<u8> {
    match v {
        Value::Number(n) => match n.as_u64() {
            Some(u) => u8::try_from(u).ok(),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && (0.0..=255.0).contains(f))
                .map(|f| f as u8),
        },
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts unix seconds, RFC 3339, or `YYYY-MM-DD HH:MM:SS` (taken as UTC).
fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("com.boa.boaMobileBanking".to_string(), "Bank of Abyssinia".to_string());
        m.insert("com.dashen.dashensuperapp".to_string(), "Dashen Bank".to_string());
        m
    }

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_normalize_full_record() {
        let raw = RawReview::new()
            .with("content", "Works well")
            .with("score", 5)
            .with("at", 1_717_243_200)
            .with("appId", "com.boa.boaMobileBanking");
        let out = normalize(&[raw], &lookup(), fetched_at());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].review_text.as_deref(), Some("Works well"));
        assert_eq!(out[0].rating, Some(5));
        assert_eq!(out[0].date, Utc.timestamp_opt(1_717_243_200, 0).unwrap());
        assert_eq!(out[0].bank_app_name, "Bank of Abyssinia");
        assert_eq!(out[0].source, "Google Play");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let raw = RawReview::new().with("appId", "com.dashen.dashensuperapp");
        let out = normalize(&[raw], &lookup(), fetched_at());
        assert_eq!(out[0].review_text, None);
        assert_eq!(out[0].rating, None);
        assert_eq!(out[0].date, fetched_at());
        assert_eq!(out[0].bank_app_name, "Dashen Bank");
    }

    #[test]
    fn test_zero_rating_is_not_missing() {
        let raw = RawReview::new().with("score", 0);
        let out = normalize(&[raw], &lookup(), fetched_at());
        assert_eq!(out[0].rating, Some(0));
    }

    #[test]
    fn test_unmapped_app_id_is_unknown_bank() {
        let raws = vec![
            RawReview::new().with("appId", "com.example.other"),
            RawReview::new(),
        ];
        let out = normalize(&raws, &lookup(), fetched_at());
        assert!(out.iter().all(|r| r.bank_app_name == "Unknown Bank"));
    }

    #[test]
    fn test_order_and_length_preserved() {
        let raws: Vec<RawReview> = (0..10)
            .map(|i| RawReview::new().with("content", format!("review {}", i)))
            .collect();
        let out = normalize(&raws, &lookup(), fetched_at());
        assert_eq!(out.len(), raws.len());
        for (i, r) in out.iter().enumerate() {
            assert_eq!(r.review_text.as_deref(), Some(format!("review {}", i).as_str()));
        }
        assert!(normalize(&[], &lookup(), fetched_at()).is_empty());
    }

    #[test]
    fn test_timestamp_formats() {
        let rfc = RawReview::new().with("at", "2024-03-05T10:20:30Z");
        let plain = RawReview::new().with("at", "2024-03-05 10:20:30");
        let junk = RawReview::new().with("at", "yesterday");
        let out = normalize(&[rfc, plain, junk], &lookup(), fetched_at());
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 20, 30).unwrap();
        assert_eq!(out[0].date, expected);
        assert_eq!(out[1].date, expected);
        assert_eq!(out[2].date, fetched_at());
    }

    #[test]
    fn test_rating_out_of_range_is_missing() {
        let raws = vec![
            RawReview::new().with("score", 300),
            RawReview::new().with("score", "4"),
            RawReview::new().with("score", -1),
        ];
        let out = normalize(&raws, &lookup(), fetched_at());
        assert_eq!(out[0].rating, None);
        assert_eq!(out[1].rating, Some(4));
        assert_eq!(out[2].rating, None);
    }

    #[test]
    fn test_integral_float_rating_is_kept() {
        let raws = vec![
            RawReview::new().with("score", 4.0),
            RawReview::new().with("score", 0.0),
            RawReview::new().with("score", 3.5),
            RawReview::new().with("score", 256.0),
        ];
        let out = normalize(&raws, &lookup(), fetched_at());
        assert_eq!(out[0].rating, Some(4));
        assert_eq!(out[1].rating, Some(0));
        assert_eq!(out[2].rating, None);
        assert_eq!(out[3].rating, None);
    }
}
