//! # Topic classifier
//! Maps a headline to a topic label by case-insensitive keyword substring
//! matching against an **ordered** topic table.
//!
//! - The first topic (in table order) with any matching keyword wins.
//! - No match, or no text at all, yields [`OTHER_TOPIC`].
//! - The table can be replaced from TOML; file order is table order.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::model::OTHER_TOPIC;

/// Built-in table. Order matters: "startup" appears under Business and Tech,
/// and Business wins because it comes first.
const DEFAULT_TABLE: &[(&str, &[&str])] = &[
    (
        "Politics",
        &[
            "election", "president", "parliament", "congress", "minister", "policy", "politic",
            "government", "senate", "vote",
        ],
    ),
    (
        "Business",
        &[
            "market", "stocks", "earnings", "profit", "merger", "economy", "inflation", "startup",
            "ipo", "trading", "finance",
        ],
    ),
    (
        "Tech",
        &[
            "ai",
            "artificial intelligence",
            "iphone",
            "android",
            "microsoft",
            "google",
            "apple",
            "meta",
            "openai",
            "software",
            "chip",
            "semiconductor",
            "startup",
            "tech",
        ],
    ),
    (
        "Sports",
        &[
            "match",
            "game",
            "tournament",
            "league",
            "world cup",
            "olympic",
            "goal",
            "coach",
            "player",
            "team",
            "football",
            "basketball",
            "tennis",
        ],
    ),
    (
        "Health",
        &[
            "covid", "cancer", "vaccine", "health", "disease", "nhs", "virus", "medical",
            "hospital", "doctor",
        ],
    ),
    (
        "Science",
        &[
            "research", "study", "space", "nasa", "astronomy", "physics", "biology", "climate",
            "environment",
        ],
    ),
    (
        "Entertainment",
        &[
            "movie",
            "film",
            "celebrity",
            "music",
            "box office",
            "tv",
            "netflix",
            "streaming",
            "hollywood",
        ],
    ),
    (
        "World",
        &[
            "ukraine",
            "gaza",
            "israel",
            "middle east",
            "eu",
            "china",
            "russia",
            "africa",
            "asia",
            "europe",
            "america",
            "war",
            "conflict",
        ],
    ),
];

/// One entry of the topic table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopicRule {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TopicFile {
    #[serde(default)]
    topics: Vec<TopicRule>,
}

/// Ordered topic → keywords mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTable {
    rules: Vec<TopicRule>,
}

impl Default for TopicTable {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE.iter().map(|(name, kws)| TopicRule {
            name: (*name).to_string(),
            keywords: kws.iter().map(|k| (*k).to_string()).collect(),
        }))
    }
}

impl TopicTable {
    /// Build from rules in the given order. Keywords are trimmed and
    /// lowercased; empty keywords and nameless rules are dropped.
    pub fn new(rules: impl IntoIterator<Item = TopicRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter_map(|r| {
                let name = r.name.trim().to_string();
                if name.is_empty() {
                    return None;
                }
                let keywords = r
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                Some(TopicRule { name, keywords })
            })
            .collect();
        Self { rules }
    }

    /// Parse a table from TOML:
    ///
    /// ```toml
    /// [[topics]]
    /// name = "Politics"
    /// keywords = ["election", "senate"]
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let f: TopicFile = toml::from_str(s).context("parsing topic table")?;
        Ok(Self::new(f.topics))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading topic table from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// First topic whose keyword occurs in the lowercased text, else "Other".
    pub fn classify(&self, text: Option<&str>) -> &str {
        let lower = text.unwrap_or_default().to_lowercase();
        if lower.is_empty() {
            return OTHER_TOPIC;
        }
        self.rules
            .iter()
            .find(|r| r.keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|r| r.name.as_str())
            .unwrap_or(OTHER_TOPIC)
    }

    /// Topic names in table order, followed by "Other".
    pub fn topics(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();
        if !out.contains(&OTHER_TOPIC) {
            out.push(OTHER_TOPIC);
        }
        out
    }

    pub fn rules(&self) -> &[TopicRule] {
        &self.rules
    }
}
