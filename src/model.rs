//! # Data model
//! Wire types shared by the pipeline, the store and the HTTP API.
//!
//! Everything here is tolerant on input: missing or malformed optional fields
//! deserialize to defaults (empty strings, zero counts, `None`) instead of
//! failing the whole document. Default labels for missing grouping keys are
//! applied through the `*_or_default` accessors, once, at the point where a
//! record is grouped.

use chrono::{SecondsFormat, Utc};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label used when an article has no source.
pub const UNKNOWN_SOURCE: &str = "Unknown";
/// Label used when an article has no region (per-article aggregation).
pub const GLOBAL_REGION: &str = "Global";
/// Label used when a publication bucket has no region (re-derived regions).
pub const OTHER_REGION: &str = "Other";
/// Label used when an article has no topic and nothing classifies it.
pub const OTHER_TOPIC: &str = "Other";

/// Three-valued sentiment classification attached to an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    /// Case-insensitive parse; anything unknown is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

/// One headline as produced by the fetcher and stored by the editor.
///
/// Unknown fields (`id`, `compound`, ...) are kept in `extra` so a
/// save/load cycle through the store does not drop them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Article {
    #[serde(default, deserialize_with = "string_or_default")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub url: String,
    #[serde(
        default,
        deserialize_with = "opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub region: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub topic: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_sentiment",
        skip_serializing_if = "Option::is_none"
    )]
    pub sentiment: Option<Sentiment>,
    /// ISO-8601 timestamp, kept verbatim.
    #[serde(default, deserialize_with = "string_or_default")]
    pub published: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    pub fn source_or_default(&self) -> &str {
        non_empty(self.source.as_deref()).unwrap_or(UNKNOWN_SOURCE)
    }

    pub fn region_or_default(&self) -> &str {
        non_empty(self.region.as_deref()).unwrap_or(GLOBAL_REGION)
    }

    pub fn topic_or_default(&self) -> &str {
        non_empty(self.topic.as_deref()).unwrap_or(OTHER_TOPIC)
    }

    /// Source as stored, `""` when absent. Sort key of the editor table.
    pub fn source_str(&self) -> &str {
        self.source.as_deref().unwrap_or_default()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

/// Grouping dimension of a bucket; decides the wire name of its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimension {
    #[default]
    Source,
    Region,
    Topic,
}

impl Dimension {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Region => "region",
            Self::Topic => "topic",
        }
    }
}

/// Aggregate sentiment counts for one key of one dimension.
///
/// `count` is kept as delivered. For publication buckets coming from the
/// data source it may differ from `positive + neutral + negative`.
/// Sums over delivered counts saturate at `u64::MAX`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bucket {
    pub dimension: Dimension,
    pub key: String,
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
    pub count: u64,
    /// Region of a publication; only meaningful for `Dimension::Source`.
    pub region: Option<String>,
}

impl Bucket {
    pub fn new(dimension: Dimension, key: impl Into<String>) -> Self {
        Self {
            dimension,
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, sentiment: Option<Sentiment>) {
        self.count += 1;
        match sentiment {
            Some(Sentiment::Positive) => self.positive += 1,
            Some(Sentiment::Neutral) => self.neutral += 1,
            Some(Sentiment::Negative) => self.negative += 1,
            None => {}
        }
    }

    pub fn sentiment_sum(&self) -> u64 {
        self.positive
            .saturating_add(self.neutral)
            .saturating_add(self.negative)
    }

    pub fn get(&self, sentiment: Sentiment) -> u64 {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }
}

impl Serialize for Bucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let with_region = self.dimension == Dimension::Source && self.region.is_some();
        let mut map = serializer.serialize_map(Some(if with_region { 6 } else { 5 }))?;
        map.serialize_entry(self.dimension.field(), &self.key)?;
        map.serialize_entry("positive", &self.positive)?;
        map.serialize_entry("neutral", &self.neutral)?;
        map.serialize_entry("negative", &self.negative)?;
        map.serialize_entry("count", &self.count)?;
        if with_region {
            map.serialize_entry("region", &self.region)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct RawBucket {
    #[serde(default, deserialize_with = "opt_string")]
    source: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    topic: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    region: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    positive: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    neutral: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    negative: u64,
    #[serde(default, deserialize_with = "lenient_opt_count")]
    count: Option<u64>,
}

impl<'de> Deserialize<'de> for Bucket {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawBucket::deserialize(deserializer)?;
        let (dimension, key, region) = match (raw.source, raw.topic, raw.region) {
            (Some(source), _, region) => (Dimension::Source, source, region),
            (None, Some(topic), _) => (Dimension::Topic, topic, None),
            (None, None, Some(region)) => (Dimension::Region, region, None),
            (None, None, None) => (Dimension::Source, UNKNOWN_SOURCE.to_string(), None),
        };
        let sum = raw
            .positive
            .saturating_add(raw.neutral)
            .saturating_add(raw.negative);
        Ok(Bucket {
            dimension,
            key,
            positive: raw.positive,
            neutral: raw.neutral,
            negative: raw.negative,
            count: raw.count.unwrap_or(sum),
            region,
        })
    }
}

/// Overall sentiment counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    #[serde(default, deserialize_with = "lenient_count")]
    pub positive: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub neutral: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub negative: u64,
}

impl Totals {
    pub fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    /// Adds the sentiment fields of a bucket (its `count` is ignored).
    pub fn add_bucket(&mut self, b: &Bucket) {
        self.positive = self.positive.saturating_add(b.positive);
        self.neutral = self.neutral.saturating_add(b.neutral);
        self.negative = self.negative.saturating_add(b.negative);
    }

    pub fn total(&self) -> u64 {
        self.positive
            .saturating_add(self.neutral)
            .saturating_add(self.negative)
    }
}

/// Current-window aggregate statistics (`latest.json`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "string_or_default")]
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_hours: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub totals: Totals,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_publication: Vec<Bucket>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_topic: Vec<Bucket>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_region: Vec<Bucket>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_headlines: Vec<Article>,
}

/// One day of the rolling history.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryPoint {
    #[serde(default, deserialize_with = "string_or_default")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub positive: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub neutral: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub negative: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: u64,
}

/// `history.json`, chronological.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryDoc {
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<HistoryPoint>,
}

/// The single document kept by the headlines store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadlinesDoc {
    #[serde(default, deserialize_with = "string_or_default")]
    pub generated_at: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headlines: Vec<Article>,
}

impl HeadlinesDoc {
    pub fn new(headlines: Vec<Article>) -> Self {
        Self {
            generated_at: now_iso(),
            count: headlines.len(),
            headlines,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

/// Current UTC time as an RFC 3339 string with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/* ----------------------------
Lenient field deserializers
---------------------------- */

fn string_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(opt_string(d)?.unwrap_or_default())
}

fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_sentiment<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Sentiment>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Sentiment::parse(&s),
        _ => None,
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(lenient_opt_count(d)?.unwrap_or(0))
}

fn lenient_opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn article_tolerates_missing_and_bogus_fields() {
        let a: Article = serde_json::from_value(json!({
            "title": null,
            "source": "BBC News",
            "sentiment": "Mixed",
            "compound": 0.42,
            "id": "abc"
        }))
        .unwrap();
        assert_eq!(a.title, "");
        assert_eq!(a.sentiment, None);
        assert_eq!(a.region_or_default(), GLOBAL_REGION);
        assert_eq!(a.topic_or_default(), OTHER_TOPIC);
        assert_eq!(a.extra.get("id"), Some(&json!("abc")));

        let back = serde_json::to_value(&a).unwrap();
        assert_eq!(back["compound"], json!(0.42));
        assert!(back.get("sentiment").is_none());
    }

    #[test]
    fn empty_source_counts_as_unknown() {
        let a = Article {
            source: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(a.source_or_default(), UNKNOWN_SOURCE);
    }

    #[test]
    fn bucket_key_follows_wire_field() {
        let pubs: Vec<Bucket> = serde_json::from_value(json!([
            {"source": "CNN", "region": "US", "positive": 2, "neutral": 1, "negative": 0, "count": 7}
        ]))
        .unwrap();
        assert_eq!(pubs[0].dimension, Dimension::Source);
        assert_eq!(pubs[0].region.as_deref(), Some("US"));
        // pre-computed count is kept even when it disagrees with the sum
        assert_eq!(pubs[0].count, 7);

        let topics: Vec<Bucket> =
            serde_json::from_value(json!([{"topic": "Tech", "positive": "3"}])).unwrap();
        assert_eq!(topics[0].dimension, Dimension::Topic);
        assert_eq!(topics[0].positive, 3);
        assert_eq!(topics[0].count, 3);

        let v = serde_json::to_value(&topics[0]).unwrap();
        assert_eq!(v["topic"], json!("Tech"));
        assert!(v.get("region").is_none());
    }

    #[test]
    fn snapshot_defaults_when_fields_missing() {
        let s: Snapshot = serde_json::from_str(r#"{"generated_at":"x","by_topic":null}"#).unwrap();
        assert_eq!(s.totals, Totals::default());
        assert!(s.by_publication.is_empty());
        assert!(s.by_topic.is_empty());
        assert!(s.sample_headlines.is_empty());
    }

    #[test]
    fn oversized_counts_saturate_instead_of_overflowing() {
        let s: Snapshot = serde_json::from_str(
            r#"{"totals":{"positive":1e30,"neutral":5},
                "by_publication":[{"source":"A","positive":1e30,"neutral":1,"negative":0}]}"#,
        )
        .unwrap();
        let b = &s.by_publication[0];
        assert_eq!(b.positive, u64::MAX);
        assert_eq!(b.count, u64::MAX);
        assert_eq!(b.sentiment_sum(), u64::MAX);
        assert_eq!(s.totals.total(), u64::MAX);

        let mut t = Totals::default();
        t.add_bucket(b);
        t.add_bucket(b);
        assert_eq!(t.positive, u64::MAX);
    }
}
