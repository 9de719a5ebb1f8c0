//! Raw row normalization.
//!
//! Pure functions only: no I/O, no logging of state. The caller decides what
//! to report about the returned counts.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{RawRecord, Record, UNKNOWN};

/// Spelled-out scores that show up in the source data.
const SCORE_PHRASES: &[(&str, f64)] = &[("three point six", 3.6)];

/// Plausible bounds for an LPI score (the published scale is 1 to 5).
const SCORE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=5.0;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w\S*").expect("word pattern"));
static DECIMAL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("decimal pattern"));
static INTEGER_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+").expect("integer pattern"));

/// Result of one normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub records: Vec<Record>,
    /// Maximum `year` among `records`, or `0` when there are none.
    pub latest_period: i64,
    /// Rows excluded because their score was unusable.
    pub dropped: usize,
}

/// Title-case free text.
///
/// Each run starting at a word character and extending to the next
/// whitespace gets an upper-case first letter and lower-case remainder.
/// Absent or blank input maps to `"Unknown"`.
pub fn title_case(input: Option<&str>) -> String {
    let Some(text) = input.filter(|s| !s.trim().is_empty()) else {
        return UNKNOWN.to_string();
    };

    WORD.replace_all(text, |caps: &regex::Captures<'_>| {
        let word = &caps[0];
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            return String::new();
        };
        let mut cased: String = first.to_uppercase().collect();
        cased.push_str(&chars.as_str().to_lowercase());
        cased
    })
    .into_owned()
}

/// Parse a score from a native number, a numeric-looking string, or a known phrase.
///
/// Returns `None` when the value is unusable, including finite values
/// outside the plausible range.
pub fn parse_lpi_score(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let text = s.trim().to_lowercase();
            if text.is_empty() {
                return None;
            }
            match SCORE_PHRASES.iter().find(|(phrase, _)| *phrase == text) {
                Some((_, score)) => *score,
                None => DECIMAL_PREFIX.find(&text)?.as_str().parse::<f64>().ok()?,
            }
        }
        _ => return None,
    };

    (score.is_finite() && SCORE_RANGE.contains(&score)).then_some(score)
}

/// Coerce a period identifier to an integer; unparseable input yields `0`.
pub fn parse_year(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => INTEGER_PREFIX
            .find(s.trim())
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0),
        _ => 0,
    }
}

fn text_field(row: &RawRecord, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => title_case(Some(s)),
        Some(Value::Number(n)) => title_case(Some(&n.to_string())),
        Some(Value::Bool(b)) => title_case(Some(&b.to_string())),
        _ => title_case(None),
    }
}

/// Normalize raw store rows into typed records.
///
/// Rows without a usable `lpi_score` are dropped and counted. The latest
/// period is recomputed from scratch over the retained records.
pub fn normalize(rows: Vec<RawRecord>) -> Normalized {
    let total = rows.len();
    let records: Vec<Record> = rows
        .into_iter()
        .filter_map(|row| {
            let lpi_score = row.get("lpi_score").and_then(parse_lpi_score)?;
            Some(Record {
                id: row.get("id").cloned().unwrap_or(Value::Null),
                country: text_field(&row, "country"),
                region: text_field(&row, "region"),
                lpi_score,
                year: row.get("year").map(parse_year).unwrap_or(0),
            })
        })
        .collect();

    let latest_period = records.iter().map(|r| r.year).max().unwrap_or(0);
    let dropped = total - records.len();

    Normalized { records, latest_period, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_title_case_words() {
        assert_eq!(title_case(Some("united STATES")), "United States");
        assert_eq!(title_case(Some("east asia & pacific")), "East Asia & Pacific");
        assert_eq!(title_case(Some("  cote d'IVOIRE")), "  Cote D'ivoire");
    }

    #[test]
    fn test_title_case_hyphenated_run_is_one_word() {
        assert_eq!(title_case(Some("guinea-BISSAU")), "Guinea-bissau");
    }

    #[test]
    fn test_title_case_unknown_sentinel() {
        assert_eq!(title_case(None), "Unknown");
        assert_eq!(title_case(Some("")), "Unknown");
        assert_eq!(title_case(Some("   ")), "Unknown");
    }

    #[test]
    fn test_parse_score_native_and_text() {
        assert_eq!(parse_lpi_score(&json!(3.91)), Some(3.91));
        assert_eq!(parse_lpi_score(&json!(4)), Some(4.0));
        assert_eq!(parse_lpi_score(&json!(" 3.2 ")), Some(3.2));
        assert_eq!(parse_lpi_score(&json!("2.75 points")), Some(2.75));
        assert_eq!(parse_lpi_score(&json!(".5")), Some(0.5));
    }

    #[test]
    fn test_parse_score_phrase_table() {
        assert_eq!(parse_lpi_score(&json!("Three Point Six")), Some(3.6));
        assert_eq!(parse_lpi_score(&json!("  three point six ")), Some(3.6));
    }

    #[test]
    fn test_parse_score_rejects_unusable() {
        assert_eq!(parse_lpi_score(&json!("")), None);
        assert_eq!(parse_lpi_score(&json!("n/a")), None);
        assert_eq!(parse_lpi_score(&json!("four")), None);
        assert_eq!(parse_lpi_score(&json!(null)), None);
        assert_eq!(parse_lpi_score(&json!(true)), None);
        assert_eq!(parse_lpi_score(&json!(42.0)), None);
        assert_eq!(parse_lpi_score(&json!(-1)), None);
        assert_eq!(parse_lpi_score(&json!("1e400")), None);
    }

    #[test]
    fn test_parse_year_lenient() {
        assert_eq!(parse_year(&json!(2023)), 2023);
        assert_eq!(parse_year(&json!(2018.0)), 2018);
        assert_eq!(parse_year(&json!("2016")), 2016);
        assert_eq!(parse_year(&json!("2014 (revised)")), 2014);
        assert_eq!(parse_year(&json!("FY2014")), 0);
        assert_eq!(parse_year(&json!(null)), 0);
    }

    #[test]
    fn test_normalize_drops_unparseable_scores() {
        let rows = vec![
            row(json!({"id": 1, "country": "germany", "region": "europe", "lpi_score": 4.1, "year": 2023})),
            row(json!({"id": 2, "country": "chad", "region": "africa", "lpi_score": "n/a", "year": 2023})),
            row(json!({"id": 3, "country": "peru", "region": "latin america", "lpi_score": "three point six", "year": "2018"})),
            row(json!({"id": 4, "country": "mali", "region": "africa", "year": 2018})),
        ];

        let normalized = normalize(rows);
        assert_eq!(normalized.records.len(), 2);
        assert_eq!(normalized.dropped, 2);
        assert!(normalized.records.iter().all(|r| r.lpi_score.is_finite()));
        assert_eq!(normalized.records[1].country, "Peru");
        assert_eq!(normalized.records[1].region, "Latin America");
        assert_eq!(normalized.records[1].lpi_score, 3.6);
        assert_eq!(normalized.records[1].year, 2018);
    }

    #[test]
    fn test_normalize_latest_period_is_max_of_retained() {
        let rows = vec![
            row(json!({"id": 1, "country": "a", "lpi_score": 3.0, "year": 2018})),
            row(json!({"id": 2, "country": "b", "lpi_score": 3.0, "year": 2023})),
            row(json!({"id": 3, "country": "c", "lpi_score": "bad", "year": 2030})),
        ];

        let normalized = normalize(rows);
        assert_eq!(normalized.latest_period, 2023);
    }

    #[test]
    fn test_normalize_keeps_unparseable_year_as_zero() {
        let rows = vec![row(json!({"id": "x-1", "country": null, "lpi_score": 2.5, "year": "unknown"}))];

        let normalized = normalize(rows);
        assert_eq!(normalized.records.len(), 1);
        let record = &normalized.records[0];
        assert_eq!(record.year, 0);
        assert_eq!(record.country, "Unknown");
        assert_eq!(record.region, "Unknown");
        assert_eq!(record.id, json!("x-1"));
        assert_eq!(normalized.latest_period, 0);
    }

    #[test]
    fn test_normalize_empty() {
        let normalized = normalize(Vec::new());
        assert!(normalized.records.is_empty());
        assert_eq!(normalized.latest_period, 0);
        assert_eq!(normalized.dropped, 0);
    }
}
