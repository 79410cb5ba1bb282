//! Trending keywords over headline titles.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::model::{Article, Sentiment};

static NON_ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z\s]").expect("keyword regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "to", "of", "and", "in", "on", "for", "with", "at", "by", "from", "up",
        "about", "into", "over", "after", "under", "above", "below", "between", "through",
        "during", "before", "again", "further", "then", "once", "all", "am", "is", "are", "was",
        "were", "be", "been", "being", "have", "has", "had", "having", "do", "does", "did",
        "doing", "but", "if", "or", "because", "as", "until", "while", "nor", "so", "than", "too",
        "very", "can", "will", "just", "more", "most", "other", "some", "such", "no", "not",
        "only", "own", "same", "s", "t", "re", "ll", "d", "ve", "m", "y", "don", "should", "now",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordFilter {
    #[default]
    All,
    Only(Sentiment),
}

impl KeywordFilter {
    /// `"all"` (or anything unrecognised) → `All`.
    pub fn parse(s: &str) -> Self {
        Sentiment::parse(s).map(Self::Only).unwrap_or(Self::All)
    }

    fn admits(&self, a: &Article) -> bool {
        match self {
            Self::All => true,
            Self::Only(s) => a.sentiment == Some(*s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

/// Most frequent non-stopword title words, highest count first.
/// Ties keep first-seen order.
pub fn extract_top_keywords(
    headlines: &[Article],
    filter: KeywordFilter,
    top_n: usize,
) -> Vec<KeywordCount> {
    let mut order: Vec<String> = Vec::new();
    let mut freq: HashMap<String, usize> = HashMap::new();

    for h in headlines.iter().filter(|h| filter.admits(h)) {
        let lower = h.title.to_lowercase();
        let cleaned = NON_ALPHA.replace_all(&lower, " ");
        for w in cleaned.split_whitespace() {
            if STOPWORDS.contains(w) {
                continue;
            }
            let c = freq.entry(w.to_string()).or_insert_with(|| {
                order.push(w.to_string());
                0
            });
            *c += 1;
        }
    }

    let mut out: Vec<KeywordCount> = order
        .into_iter()
        .map(|k| {
            let count = freq[&k];
            KeywordCount { keyword: k, count }
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out.truncate(top_n);
    out
}
