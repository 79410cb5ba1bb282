//! # Headlines editor table
//!
//! Filter → stable sort → paginate over an in-memory headline list, with a
//! sparse overlay of unsaved edits keyed by row id (the article's index in
//! the loaded list).
//!
//! Row lifecycle: `Unedited → Edited → Deleted`; `save` merges the overlay
//! into the canonical list and clears it, `discard` drops it.
//!
//! Page rules: any change to the query or sort resets to page 1. Paging,
//! single-field edits and deletes keep the page (clamped to the new range).

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::EditorError;
use crate::history::parse_published;
use crate::model::{Article, HeadlinesDoc, Sentiment, Snapshot};
use crate::topics::TopicTable;

pub const DEFAULT_PAGE_SIZE: usize = 50;

/* ----------------------------
Overlay
---------------------------- */

/// Pending changes for one row. `None` fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

impl Edit {
    fn apply_to(&self, a: &mut Article) {
        if let Some(v) = &self.title {
            a.title = v.clone();
        }
        if let Some(v) = &self.url {
            a.url = v.clone();
        }
        if let Some(v) = &self.source {
            a.source = Some(v.clone());
        }
        if let Some(v) = &self.region {
            a.region = Some(v.clone());
        }
        if let Some(v) = &self.topic {
            a.topic = Some(v.clone());
        }
        if let Some(v) = self.sentiment {
            a.sentiment = Some(v);
        }
    }
}

/// A single-field change, as made from an inline table control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Title(String),
    Url(String),
    Source(String),
    Region(String),
    Topic(String),
    Sentiment(Sentiment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Unedited,
    Edited,
    Deleted,
}

/// Unsaved edits keyed by row id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    edits: BTreeMap<usize, Edit>,
}

impl Overlay {
    pub fn get(&self, id: usize) -> Option<&Edit> {
        self.edits.get(&id)
    }

    pub fn state(&self, id: usize) -> RowState {
        match self.edits.get(&id) {
            None => RowState::Unedited,
            Some(e) if e.deleted => RowState::Deleted,
            Some(_) => RowState::Edited,
        }
    }

    pub fn set_field(&mut self, id: usize, edit: FieldEdit) {
        let e = self.edits.entry(id).or_default();
        match edit {
            FieldEdit::Title(v) => e.title = Some(v),
            FieldEdit::Url(v) => e.url = Some(v),
            FieldEdit::Source(v) => e.source = Some(v),
            FieldEdit::Region(v) => e.region = Some(v),
            FieldEdit::Topic(v) => e.topic = Some(v),
            FieldEdit::Sentiment(v) => e.sentiment = Some(v),
        }
    }

    pub fn mark_deleted(&mut self, id: usize) {
        self.edits.entry(id).or_default().deleted = true;
    }

    pub fn replace(&mut self, id: usize, edit: Edit) {
        self.edits.insert(id, edit);
    }

    /// The article as it currently looks with edits applied. Borrows when
    /// there is nothing to apply.
    pub fn effective<'a>(&self, id: usize, original: &'a Article) -> Cow<'a, Article> {
        match self.edits.get(&id) {
            None => Cow::Borrowed(original),
            Some(e) => {
                let mut a = original.clone();
                e.apply_to(&mut a);
                Cow::Owned(a)
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (usize, &Edit)> {
        self.edits.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }
}

/* ----------------------------
Query & sort
---------------------------- */

/// Table filters; empty strings and `None` mean "no constraint". The title
/// search is taken verbatim apart from case, surrounding spaces included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pub search: String,
    pub source: Option<String>,
    pub topic: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub region: Option<String>,
}

impl TableQuery {
    pub fn matches(&self, a: &Article) -> bool {
        let needle = self.search.to_lowercase();
        if !needle.is_empty() && !a.title.to_lowercase().contains(&needle) {
            return false;
        }
        exact(&self.source, a.source.as_deref())
            && exact(&self.topic, a.topic.as_deref())
            && exact(&self.region, a.region.as_deref())
            && self.sentiment.is_none_or(|s| a.sentiment == Some(s))
    }
}

fn exact(want: &Option<String>, have: Option<&str>) -> bool {
    match want.as_deref() {
        None | Some("") => true,
        Some(w) => have == Some(w),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Published,
    Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub dir: SortDir,
}

/// Timestamps compare chronologically; unparseable ones sort before all
/// parseable ones and among themselves by raw text.
fn cmp_published(a: &str, b: &str) -> Ordering {
    parse_published(a)
        .cmp(&parse_published(b))
        .then_with(|| a.cmp(b))
}

fn cmp_articles(a: &Article, b: &Article, field: SortField) -> Ordering {
    match field {
        SortField::Published => cmp_published(&a.published, &b.published),
        SortField::Source => a.source_str().cmp(b.source_str()),
    }
}

/// Stable sort: rows with equal keys keep their relative order in either
/// direction.
pub fn sort_articles(rows: &mut [(usize, Article)], spec: SortSpec) {
    rows.sort_by(|(_, a), (_, b)| {
        let o = cmp_articles(a, b, spec.field);
        match spec.dir {
            SortDir::Asc => o,
            SortDir::Desc => o.reverse(),
        }
    });
}

/* ----------------------------
Table session
---------------------------- */

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: usize,
    pub article: Article,
    pub state: RowState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub rows: Vec<Row>,
    pub page: usize,
    pub page_count: usize,
    pub total_filtered: usize,
    pub total_loaded: usize,
}

impl PageView {
    pub fn summary(&self) -> String {
        format!(
            "Showing {} of {} headlines",
            self.total_filtered, self.total_loaded
        )
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }
}

/// Distinct values for the filter dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterOptions {
    pub sources: Vec<String>,
    pub regions: Vec<String>,
    pub topics: Vec<String>,
}

/// Editor state for one page session.
#[derive(Debug, Clone)]
pub struct Table {
    articles: Vec<Article>,
    overlay: Overlay,
    query: TableQuery,
    sort: SortSpec,
    page_size: usize,
    page: usize,
    /// Ids of visible rows in display order.
    visible: Vec<usize>,
    topics: Vec<String>,
}

impl Table {
    /// Articles without a topic get one from the classifier.
    pub fn new(mut articles: Vec<Article>, topics: &TopicTable, page_size: usize) -> Self {
        for a in &mut articles {
            if a.topic.as_deref().is_none_or(str::is_empty) {
                a.topic = Some(topics.classify(Some(&a.title)).to_string());
            }
        }
        let mut t = Self {
            articles,
            overlay: Overlay::default(),
            query: TableQuery::default(),
            sort: SortSpec::default(),
            page_size: page_size.max(1),
            page: 1,
            visible: Vec::new(),
            topics: topics.topics().into_iter().map(String::from).collect(),
        };
        t.recompute();
        t
    }

    pub fn from_snapshot(snapshot: &Snapshot, topics: &TopicTable, page_size: usize) -> Self {
        Self::new(snapshot.sample_headlines.clone(), topics, page_size)
    }

    fn recompute(&mut self) {
        let mut rows: Vec<(usize, Article)> = self
            .articles
            .iter()
            .enumerate()
            .filter(|(id, _)| self.overlay.state(*id) != RowState::Deleted)
            .map(|(id, a)| (id, self.overlay.effective(id, a).into_owned()))
            .filter(|(_, a)| self.query.matches(a))
            .collect();
        sort_articles(&mut rows, self.sort);
        self.visible = rows.into_iter().map(|(id, _)| id).collect();
        self.clamp_page();
    }

    fn clamp_page(&mut self) {
        self.page = self.page.clamp(1, self.page_count());
    }

    fn check_row(&self, id: usize) -> Result<(), EditorError> {
        if id >= self.articles.len() {
            return Err(EditorError::UnknownRow(id));
        }
        if self.overlay.state(id) == RowState::Deleted {
            return Err(EditorError::DeletedRow(id));
        }
        Ok(())
    }

    pub fn query(&self) -> &TableQuery {
        &self.query
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// At least 1, even when nothing matches.
    pub fn page_count(&self) -> usize {
        self.visible.len().div_ceil(self.page_size).max(1)
    }

    pub fn has_pending_edits(&self) -> bool {
        !self.overlay.is_empty()
    }

    pub fn set_query(&mut self, query: TableQuery) {
        self.query = query;
        self.page = 1;
        self.recompute();
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.page = 1;
        self.recompute();
    }

    /// Header click: same field flips direction, a new field starts descending.
    pub fn toggle_sort(&mut self, field: SortField) {
        let next = if self.sort.field == field {
            SortSpec {
                field,
                dir: self.sort.dir.flipped(),
            }
        } else {
            SortSpec {
                field,
                dir: SortDir::Desc,
            }
        };
        self.set_sort(next);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn next_page(&mut self) -> bool {
        if self.page < self.page_count() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Inline edit of one field. Keeps the current page.
    pub fn update_field(&mut self, id: usize, edit: FieldEdit) -> Result<(), EditorError> {
        self.check_row(id)?;
        self.overlay.set_field(id, edit);
        self.recompute();
        Ok(())
    }

    /// Full-record edit from the modal. Re-applies filters and resets the page.
    pub fn replace_edit(&mut self, id: usize, edit: Edit) -> Result<(), EditorError> {
        self.check_row(id)?;
        self.overlay.replace(id, edit);
        self.page = 1;
        self.recompute();
        Ok(())
    }

    /// Hide a row from all views until the next save or discard.
    pub fn delete(&mut self, id: usize) -> Result<(), EditorError> {
        self.check_row(id)?;
        self.overlay.mark_deleted(id);
        self.visible.retain(|v| *v != id);
        self.clamp_page();
        Ok(())
    }

    pub fn row_state(&self, id: usize) -> RowState {
        self.overlay.state(id)
    }

    fn row(&self, id: usize) -> Row {
        Row {
            id,
            article: self.overlay.effective(id, &self.articles[id]).into_owned(),
            state: self.overlay.state(id),
        }
    }

    pub fn page_view(&self) -> PageView {
        let start = (self.page - 1) * self.page_size;
        let rows = self
            .visible
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|id| self.row(*id))
            .collect();
        PageView {
            rows,
            page: self.page,
            page_count: self.page_count(),
            total_filtered: self.visible.len(),
            total_loaded: self.articles.len(),
        }
    }

    /// Merge the overlay into the canonical list, drop deleted rows and
    /// clear the overlay. Returns the list to persist. Row ids are
    /// renumbered afterwards.
    pub fn save(&mut self) -> Vec<Article> {
        let merged: Vec<Article> = self
            .articles
            .iter()
            .enumerate()
            .filter(|(id, _)| self.overlay.state(*id) != RowState::Deleted)
            .map(|(id, a)| self.overlay.effective(id, a).into_owned())
            .collect();
        debug!(
            target: "editor",
            edits = self.overlay.len(),
            kept = merged.len(),
            "overlay merged"
        );
        self.articles = merged.clone();
        self.overlay.clear();
        self.page = 1;
        self.recompute();
        merged
    }

    /// Drop every pending edit.
    pub fn discard(&mut self) {
        self.overlay.clear();
        self.page = 1;
        self.recompute();
    }

    /// Currently visible rows (all pages) as a headlines document.
    pub fn export_filtered(&self) -> HeadlinesDoc {
        HeadlinesDoc::new(self.visible.iter().map(|id| self.row(*id).article).collect())
    }

    /// Distinct sorted sources and regions of the loaded list, and the
    /// classifier's topic names.
    pub fn filter_options(&self) -> FilterOptions {
        let sources: BTreeSet<&str> = self
            .articles
            .iter()
            .filter_map(|a| a.source.as_deref())
            .collect();
        let regions: BTreeSet<&str> = self
            .articles
            .iter()
            .filter_map(|a| a.region.as_deref())
            .collect();
        FilterOptions {
            sources: sources.into_iter().map(String::from).collect(),
            regions: regions.into_iter().map(String::from).collect(),
            topics: self.topics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(title: &str, source: &str, published: &str) -> Article {
        Article {
            title: title.into(),
            source: Some(source.into()),
            published: published.into(),
            sentiment: Some(Sentiment::Neutral),
            ..Default::default()
        }
    }

    #[test]
    fn effective_does_not_touch_original() {
        let orig = a("Old", "CNN", "");
        let mut o = Overlay::default();
        assert!(matches!(o.effective(0, &orig), Cow::Borrowed(_)));
        o.set_field(0, FieldEdit::Title("New".into()));
        assert_eq!(o.effective(0, &orig).title, "New");
        assert_eq!(orig.title, "Old");
        assert_eq!(o.state(0), RowState::Edited);
        o.mark_deleted(0);
        assert_eq!(o.state(0), RowState::Deleted);
    }

    #[test]
    fn query_ignores_empty_constraints() {
        let q = TableQuery {
            search: String::new(),
            source: Some(String::new()),
            ..Default::default()
        };
        assert!(q.matches(&a("x", "CNN", "")));
        let q = TableQuery {
            search: "FED".into(),
            ..Default::default()
        };
        assert!(q.matches(&a("The Fed holds", "CNN", "")));
        assert!(!q.matches(&a("Markets", "CNN", "")));
    }

    #[test]
    fn search_keeps_surrounding_spaces() {
        let q = TableQuery {
            search: " fed".into(),
            ..Default::default()
        };
        assert!(!q.matches(&a("Fed holds rates", "CNN", "")));
        assert!(q.matches(&a("The Fed holds rates", "CNN", "")));

        let q = TableQuery {
            search: "  ".into(),
            ..Default::default()
        };
        assert!(!q.matches(&a("x", "CNN", "")));
        assert!(q.matches(&a("two  spaces", "CNN", "")));
    }

    #[test]
    fn published_sort_is_chronological_not_lexical() {
        let mut rows = vec![
            (0, a("a", "X", "2025-08-20T10:00:00+02:00")), // 08:00Z
            (1, a("b", "X", "2025-08-20T09:00:00Z")),
            (2, a("c", "X", "bogus")),
        ];
        sort_articles(
            &mut rows,
            SortSpec {
                field: SortField::Published,
                dir: SortDir::Asc,
            },
        );
        let ids: Vec<_> = rows.iter().map(|r| r.0).collect();
        assert_eq!(ids, vec![2, 0, 1]);
    }

    #[test]
    fn unknown_and_deleted_rows_are_rejected() {
        let mut t = Table::new(vec![a("x", "CNN", "")], &TopicTable::default(), 10);
        assert_eq!(
            t.update_field(5, FieldEdit::Region("UK".into())),
            Err(EditorError::UnknownRow(5))
        );
        t.delete(0).unwrap();
        assert_eq!(t.delete(0), Err(EditorError::DeletedRow(0)));
    }
}
