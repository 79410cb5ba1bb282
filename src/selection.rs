//! # Selection filter
//! Narrows a snapshot to a chosen set of publications.
//!
//! Selection is two-state: [`Selection::All`] shows everything, and
//! [`Selection::Sources`] shows exactly the named sources (an empty set
//! shows nothing). Filtering never fails; a selection that matches no
//! source gives zero totals and empty lists.
//!
//! Known limitation: topics are passed through unfiltered for a specific
//! selection. Publication buckets carry no topic breakdown, so there is
//! nothing to re-derive them from. [`FilteredView::topics_filtered`] reports
//! this to the caller.

use std::collections::BTreeSet;

use crate::aggregate::BucketSet;
use crate::model::{Article, Bucket, Dimension, Snapshot, Totals, OTHER_REGION};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Sources(BTreeSet<String>),
}

impl Selection {
    pub fn from_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Sources(sources.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn contains(&self, source: &str) -> bool {
        match self {
            Self::All => true,
            Self::Sources(s) => s.contains(source),
        }
    }

    pub fn select_all(&mut self) {
        *self = Self::All;
    }

    pub fn select_none(&mut self) {
        *self = Self::Sources(BTreeSet::new());
    }

    /// Flip one source. Toggling off a source while in `All` expands the
    /// selection to every other known source first.
    pub fn toggle<'a>(&mut self, source: &str, known: impl IntoIterator<Item = &'a str>) {
        if let Self::All = self {
            *self = Self::from_sources(known);
        }
        if let Self::Sources(set) = self {
            if !set.remove(source) {
                set.insert(source.to_string());
            }
        }
    }
}

/// Views derived from a snapshot for one selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilteredView {
    pub totals: Totals,
    pub by_publication: Vec<Bucket>,
    pub by_topic: Vec<Bucket>,
    pub by_region: Vec<Bucket>,
    pub sample_headlines: Vec<Article>,
    /// `false` when `by_topic` could not follow the selection.
    pub topics_filtered: bool,
}

/// Apply a selection to a snapshot. Pure: the snapshot is not modified.
pub fn filter(snapshot: &Snapshot, selection: &Selection) -> FilteredView {
    let selected = match selection {
        Selection::All => {
            return FilteredView {
                totals: snapshot.totals,
                by_publication: snapshot.by_publication.clone(),
                by_topic: snapshot.by_topic.clone(),
                by_region: snapshot.by_region.clone(),
                sample_headlines: snapshot.sample_headlines.clone(),
                topics_filtered: true,
            }
        }
        Selection::Sources(s) => s,
    };

    let by_publication: Vec<Bucket> = snapshot
        .by_publication
        .iter()
        .filter(|b| selected.contains(&b.key))
        .cloned()
        .collect();

    let mut totals = Totals::default();
    for b in &by_publication {
        totals.add_bucket(b);
    }

    let sample_headlines = snapshot
        .sample_headlines
        .iter()
        .filter(|h| selected.contains(h.source_or_default()))
        .cloned()
        .collect();

    FilteredView {
        totals,
        by_region: regions_from_publications(&by_publication),
        by_publication,
        by_topic: snapshot.by_topic.clone(),
        sample_headlines,
        topics_filtered: false,
    }
}

/// Re-aggregate publication buckets by their region. `count` is the
/// sentiment sum; publications without a region go to "Other".
pub fn regions_from_publications(pubs: &[Bucket]) -> Vec<Bucket> {
    let mut regions = BucketSet::new(Dimension::Region);
    for p in pubs {
        let key = p
            .region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(OTHER_REGION);
        let r = regions.entry(key);
        r.positive = r.positive.saturating_add(p.positive);
        r.neutral = r.neutral.saturating_add(p.neutral);
        r.negative = r.negative.saturating_add(p.negative);
        r.count = r.sentiment_sum();
    }
    regions.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pubb(key: &str, region: Option<&str>, p: u64, n: u64, g: u64, count: u64) -> Bucket {
        Bucket {
            dimension: Dimension::Source,
            key: key.into(),
            positive: p,
            neutral: n,
            negative: g,
            count,
            region: region.map(Into::into),
        }
    }

    #[test]
    fn toggle_from_all_expands_then_removes() {
        let mut s = Selection::All;
        s.toggle("B", ["A", "B", "C"]);
        assert_eq!(s, Selection::from_sources(["A", "C"]));
        s.toggle("B", ["A", "B", "C"]);
        assert_eq!(s, Selection::from_sources(["A", "B", "C"]));
        s.select_none();
        assert!(!s.contains("A"));
        s.select_all();
        assert!(s.is_all());
    }

    #[test]
    fn regions_rederived_with_sum_count() {
        let pubs = vec![
            pubb("A", Some("UK"), 1, 2, 3, 99),
            pubb("B", None, 1, 0, 0, 1),
            pubb("C", Some("UK"), 1, 1, 1, 3),
        ];
        let r = regions_from_publications(&pubs);
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].key, "UK");
        assert_eq!(r[0].count, 9);
        assert_eq!(r[1].key, OTHER_REGION);
    }

    #[test]
    fn empty_specific_selection_shows_nothing() {
        let snap = Snapshot {
            by_publication: vec![pubb("A", None, 1, 1, 1, 3)],
            totals: Totals {
                positive: 1,
                neutral: 1,
                negative: 1,
            },
            ..Default::default()
        };
        let v = filter(&snap, &Selection::Sources(BTreeSet::new()));
        assert_eq!(v.totals, Totals::default());
        assert!(v.by_publication.is_empty());
        assert!(!v.topics_filtered);
    }
}
