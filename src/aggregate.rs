//! # Aggregator
//! Groups a flat list of articles into sentiment buckets by source, region
//! and topic, and builds the full statistics document the store keeps next
//! to the headlines.

use std::collections::HashMap;

use crate::model::{now_iso, Article, Bucket, Dimension, Snapshot, Totals};

/// Number of headlines copied into `sample_headlines` by [`compute_stats`].
pub const SAMPLE_LIMIT: usize = 100;
/// Window advertised in stored statistics.
pub const STATS_WINDOW_HOURS: u32 = 24;

/// Buckets for the three grouping dimensions, in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregates {
    pub by_source: Vec<Bucket>,
    pub by_region: Vec<Bucket>,
    pub by_topic: Vec<Bucket>,
}

/// Insertion-ordered bucket accumulator.
#[derive(Debug)]
pub(crate) struct BucketSet {
    dimension: Dimension,
    index: HashMap<String, usize>,
    buckets: Vec<Bucket>,
}

impl BucketSet {
    pub(crate) fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            index: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    /// Returns the bucket for `key`, creating it on first sight.
    pub(crate) fn entry(&mut self, key: &str) -> &mut Bucket {
        let i = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.buckets.push(Bucket::new(self.dimension, key));
                self.index.insert(key.to_string(), self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[i]
    }

    pub(crate) fn into_vec(self) -> Vec<Bucket> {
        self.buckets
    }
}

/// Group articles by source, region and topic.
///
/// Every article lands in exactly one bucket per dimension. Articles without
/// a sentiment still increment `count`, but no sentiment field.
pub fn aggregate(articles: &[Article]) -> Aggregates {
    let mut sources = BucketSet::new(Dimension::Source);
    let mut regions = BucketSet::new(Dimension::Region);
    let mut topics = BucketSet::new(Dimension::Topic);

    for a in articles {
        let region = a.region_or_default();

        let b = sources.entry(a.source_or_default());
        if b.region.is_none() {
            b.region = Some(region.to_string());
        }
        b.add(a.sentiment);

        regions.entry(region).add(a.sentiment);
        topics.entry(a.topic_or_default()).add(a.sentiment);
    }

    Aggregates {
        by_source: sources.into_vec(),
        by_region: regions.into_vec(),
        by_topic: topics.into_vec(),
    }
}

/// Sentiment totals over articles; articles without a sentiment are skipped.
pub fn sum_sentiments(articles: &[Article]) -> Totals {
    let mut t = Totals::default();
    for s in articles.iter().filter_map(|a| a.sentiment) {
        t.add(s);
    }
    t
}

/// Sort buckets by `count`, largest first. Stable: ties keep input order.
pub fn sort_by_count_desc(buckets: &mut [Bucket]) {
    buckets.sort_by(|a, b| b.count.cmp(&a.count));
}

/// Full statistics document for a headline list, as written on every save.
pub fn compute_stats(articles: &[Article]) -> Snapshot {
    let Aggregates {
        mut by_source,
        mut by_region,
        mut by_topic,
    } = aggregate(articles);
    sort_by_count_desc(&mut by_source);
    sort_by_count_desc(&mut by_region);
    sort_by_count_desc(&mut by_topic);

    let sample_headlines = articles
        .iter()
        .take(SAMPLE_LIMIT)
        .map(|a| Article {
            title: a.title.clone(),
            url: a.url.clone(),
            source: a.source.clone(),
            region: Some(a.region_or_default().to_string()),
            topic: a.topic.clone(),
            sentiment: a.sentiment,
            published: a.published.clone(),
            extra: Default::default(),
        })
        .collect();

    Snapshot {
        generated_at: now_iso(),
        window_hours: Some(STATS_WINDOW_HOURS),
        totals: sum_sentiments(articles),
        by_publication: by_source,
        by_topic,
        by_region,
        sample_headlines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Sentiment, GLOBAL_REGION, OTHER_TOPIC, UNKNOWN_SOURCE};

    fn art(source: Option<&str>, region: Option<&str>, s: Option<Sentiment>) -> Article {
        Article {
            title: "t".into(),
            source: source.map(Into::into),
            region: region.map(Into::into),
            sentiment: s,
            ..Default::default()
        }
    }

    #[test]
    fn groups_in_first_occurrence_order_with_defaults() {
        let arts = vec![
            art(Some("B"), Some("UK"), Some(Sentiment::Positive)),
            art(None, None, Some(Sentiment::Negative)),
            art(Some("B"), Some("US"), None),
        ];
        let agg = aggregate(&arts);

        let keys: Vec<_> = agg.by_source.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["B", UNKNOWN_SOURCE]);
        // region of the first article seen sticks to the publication
        assert_eq!(agg.by_source[0].region.as_deref(), Some("UK"));
        assert_eq!(agg.by_source[0].count, 2);
        assert_eq!(agg.by_source[0].positive, 1);

        let regions: Vec<_> = agg.by_region.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(regions, vec!["UK", GLOBAL_REGION, "US"]);
        assert_eq!(agg.by_topic.len(), 1);
        assert_eq!(agg.by_topic[0].key, OTHER_TOPIC);
        assert_eq!(agg.by_topic[0].count, 3);
    }

    #[test]
    fn missing_sentiment_counts_only_toward_count() {
        let agg = aggregate(&[art(Some("A"), None, None)]);
        let b = &agg.by_source[0];
        assert_eq!(b.count, 1);
        assert_eq!(b.sentiment_sum(), 0);
    }

    #[test]
    fn stats_sort_stable_and_sample_capped() {
        let mut arts = Vec::new();
        for i in 0..120 {
            let src = if i % 3 == 0 { "A" } else { "B" };
            arts.push(art(Some(src), None, Some(Sentiment::Neutral)));
        }
        arts.push(art(Some("C"), None, None));
        let s = compute_stats(&arts);
        assert_eq!(s.sample_headlines.len(), SAMPLE_LIMIT);
        assert_eq!(s.by_publication[0].key, "B");
        assert_eq!(s.totals.neutral, 120);
        assert_eq!(s.totals.total(), 120);
        assert_eq!(s.sample_headlines[0].region.as_deref(), Some(GLOBAL_REGION));
        assert_eq!(s.window_hours, Some(STATS_WINDOW_HOURS));
    }
}
