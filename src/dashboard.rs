//! # Dashboard refresh orchestrator
//!
//! Turns a loaded snapshot + history into the views the page shows, for the
//! current [`Session`]. Every [`Dashboard::refresh`] recomputes from scratch
//! and pushes each view to an external collaborator:
//!
//! - [`DashboardView`]: counters, sources sidebar, headline list, status line.
//! - [`ChartBackend`]: chart instances, owned through a [`ChartRegistry`]
//!   which always disposes the previous instance of a slot before creating
//!   the next one.
//!
//! The orchestrator keeps no derived state between calls.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, error, info};

use crate::error::DashboardError;
use crate::history::{parse_published, trend_window, TREND_DAYS};
use crate::keywords::{extract_top_keywords, KeywordFilter};
use crate::loader::Loader;
use crate::model::{Article, Bucket, HistoryDoc, Snapshot, Totals};
use crate::selection::{filter, Selection};

/// Bars shown by the ranked publication chart.
pub const DEFAULT_TOP_N: usize = 8;
/// Headlines shown in the list widget.
pub const DEFAULT_HEADLINE_LIMIT: usize = 30;
/// Bars shown by the trending keywords chart.
pub const DEFAULT_KEYWORDS_TOP_N: usize = 10;
/// Display width of publication labels.
pub const DEFAULT_LABEL_MAX: usize = 12;

/* ----------------------------
Configuration & session
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardConfig {
    pub top_n: usize,
    pub headline_limit: usize,
    pub keywords_top_n: usize,
    pub trend_days: usize,
    pub label_max: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            headline_limit: DEFAULT_HEADLINE_LIMIT,
            keywords_top_n: DEFAULT_KEYWORDS_TOP_N,
            trend_days: TREND_DAYS,
            label_max: DEFAULT_LABEL_MAX,
        }
    }
}

/// Field used to rank publications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankKey {
    #[default]
    Count,
    Positive,
    Neutral,
    Negative,
}

impl RankKey {
    /// Unknown names fall back to `Count`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Self::Positive,
            "neutral" => Self::Neutral,
            "negative" => Self::Negative,
            _ => Self::Count,
        }
    }

    fn value(&self, b: &Bucket) -> u64 {
        match self {
            Self::Count => b.count,
            Self::Positive => b.positive,
            Self::Neutral => b.neutral,
            Self::Negative => b.negative,
        }
    }
}

/// Per-page mutable state, owned by the caller and passed into every
/// refresh. Discarded on reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub selection: Selection,
    pub rank_key: RankKey,
    pub keyword_filter: KeywordFilter,
}

/* ----------------------------
Collaborator interfaces
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartSlot {
    Overall,
    Publications,
    Topics,
    Regions,
    Trend,
    Keywords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Doughnut,
    StackedBar,
    Line,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub label: String,
    pub values: Vec<u64>,
}

/// Everything a chart library needs to draw one chart.
///
/// `labels` are for display and may be truncated; `keys` are the untouched
/// lookup keys in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub keys: Vec<String>,
    pub series: Vec<Series>,
}

/// Chart library seam. A handle is bound to one drawing surface until it is
/// handed back to `dispose`.
pub trait ChartBackend {
    type Handle;
    fn create(&mut self, slot: ChartSlot, spec: &ChartSpec) -> Self::Handle;
    fn dispose(&mut self, handle: Self::Handle);
}

/// Owns one live chart per slot.
pub struct ChartRegistry<B: ChartBackend> {
    backend: B,
    live: HashMap<ChartSlot, B::Handle>,
}

impl<B: ChartBackend> ChartRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            live: HashMap::new(),
        }
    }

    /// Dispose the slot's current chart (if any), then create the new one.
    pub fn replace(&mut self, slot: ChartSlot, spec: &ChartSpec) {
        if let Some(old) = self.live.remove(&slot) {
            self.backend.dispose(old);
        }
        let h = self.backend.create(slot, spec);
        self.live.insert(slot, h);
    }

    pub fn dispose_all(&mut self) {
        for (_, h) in self.live.drain() {
            self.backend.dispose(h);
        }
    }

    pub fn is_live(&self, slot: ChartSlot) -> bool {
        self.live.contains_key(&slot)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// One row of the sources sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub source: String,
    pub count: u64,
}

/// Non-chart widgets of the page.
pub trait DashboardView {
    fn show_status(&mut self, text: &str);
    fn show_error(&mut self, message: &str);
    fn show_sources(&mut self, sources: &[SourceEntry], selection: &Selection);
    fn show_totals(&mut self, totals: &Totals);
    fn show_headlines(&mut self, headlines: &[Article], total: usize);
}

/// What one refresh pushed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub totals: Totals,
    pub ranked_publications: Vec<String>,
    pub headlines_shown: usize,
    pub headlines_total: usize,
    pub topics_filtered: bool,
}

/* ----------------------------
Pure helpers
---------------------------- */

/// Top `top_n` buckets by `key`, descending; ties by `count` descending,
/// then input order.
pub fn rank(buckets: &[Bucket], key: RankKey, top_n: usize) -> Vec<Bucket> {
    let mut v = buckets.to_vec();
    v.sort_by(|a, b| {
        key.value(b)
            .cmp(&key.value(a))
            .then_with(|| b.count.cmp(&a.count))
    });
    v.truncate(top_n);
    v
}

/// Truncate a label for display, marking the cut with `…`.
pub fn display_label(key: &str, max: usize) -> String {
    if key.chars().count() > max {
        let mut s: String = key.chars().take(max).collect();
        s.push('…');
        s
    } else {
        key.to_string()
    }
}

/// "Just now", "5m ago", "3h ago", "2d ago". Unparseable input → "unknown".
pub fn format_time_ago(published: &str, now: DateTime<Utc>) -> String {
    let Some(ts) = parse_published(published) else {
        return "unknown".to_string();
    };
    let diff = (now - ts).num_seconds();
    match diff {
        d if d < 60 => "Just now".to_string(),
        d if d < 3_600 => format!("{}m ago", d / 60),
        d if d < 86_400 => format!("{}h ago", d / 3_600),
        d => format!("{}d ago", d / 86_400),
    }
}

fn format_generated_at(raw: &str) -> String {
    match parse_published(raw) {
        Some(ts) => format!("Last updated {}", ts.format("%-d %b, %H:%M")),
        None => format!("Last updated {raw}"),
    }
}

fn sentiment_series(rows: &[Bucket]) -> Vec<Series> {
    vec![
        Series {
            label: "Positive".into(),
            values: rows.iter().map(|b| b.positive).collect(),
        },
        Series {
            label: "Neutral".into(),
            values: rows.iter().map(|b| b.neutral).collect(),
        },
        Series {
            label: "Negative".into(),
            values: rows.iter().map(|b| b.negative).collect(),
        },
    ]
}

fn stacked(rows: &[Bucket], label_max: Option<usize>) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::StackedBar,
        labels: rows
            .iter()
            .map(|b| match label_max {
                Some(max) => display_label(&b.key, max),
                None => b.key.clone(),
            })
            .collect(),
        keys: rows.iter().map(|b| b.key.clone()).collect(),
        series: sentiment_series(rows),
    }
}

/* ----------------------------
Orchestrator
---------------------------- */

/// Loaded data plus display configuration.
#[derive(Debug, Clone)]
pub struct Dashboard {
    snapshot: Snapshot,
    history: HistoryDoc,
    config: DashboardConfig,
}

impl Dashboard {
    pub fn new(snapshot: Snapshot, history: HistoryDoc, config: DashboardConfig) -> Self {
        Self {
            snapshot,
            history,
            config,
        }
    }

    /// Fetch snapshot and history; both must succeed.
    pub async fn load(loader: &Loader, config: DashboardConfig) -> Result<Self, DashboardError> {
        let (snapshot, history) = loader.load().await?;
        Ok(Self::new(snapshot, history, config))
    }

    /// Load, then render the first frame. On failure the view gets an error
    /// status and nothing else is drawn.
    pub async fn start<B: ChartBackend, V: DashboardView>(
        loader: &Loader,
        config: DashboardConfig,
        session: &Session,
        charts: &mut ChartRegistry<B>,
        view: &mut V,
    ) -> Result<Self, DashboardError> {
        match Self::load(loader, config).await {
            Ok(d) => {
                d.init(session, charts, view);
                Ok(d)
            }
            Err(e) => {
                error!(target: "dashboard", error = %e, "dashboard load failed");
                view.show_error("Error loading data");
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn history(&self) -> &HistoryDoc {
        &self.history
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Sidebar entries, alphabetical by source.
    pub fn source_list(&self) -> Vec<SourceEntry> {
        let mut v: Vec<SourceEntry> = self
            .snapshot
            .by_publication
            .iter()
            .map(|b| SourceEntry {
                source: b.key.clone(),
                count: b.count,
            })
            .collect();
        v.sort_by(|a, b| a.source.cmp(&b.source));
        v
    }

    /// Toggle one source in the session selection.
    pub fn toggle_source(&self, session: &mut Session, source: &str) {
        let known = self.snapshot.by_publication.iter().map(|b| b.key.as_str());
        session.selection.toggle(source, known);
    }

    /// First frame: status line, sidebar, then a full refresh.
    pub fn init<B: ChartBackend, V: DashboardView>(
        &self,
        session: &Session,
        charts: &mut ChartRegistry<B>,
        view: &mut V,
    ) -> RefreshReport {
        view.show_status(&format_generated_at(&self.snapshot.generated_at));
        view.show_sources(&self.source_list(), &session.selection);
        self.refresh(session, charts, view)
    }

    /// Recompute every view for the session and push it out.
    pub fn refresh<B: ChartBackend, V: DashboardView>(
        &self,
        session: &Session,
        charts: &mut ChartRegistry<B>,
        view: &mut V,
    ) -> RefreshReport {
        let cfg = &self.config;
        let filtered = filter(&self.snapshot, &session.selection);

        view.show_totals(&filtered.totals);

        let t = &filtered.totals;
        charts.replace(
            ChartSlot::Overall,
            &ChartSpec {
                kind: ChartKind::Doughnut,
                labels: vec!["Positive".into(), "Neutral".into(), "Negative".into()],
                keys: vec!["positive".into(), "neutral".into(), "negative".into()],
                series: vec![Series {
                    label: "Sentiment".into(),
                    values: vec![t.positive, t.neutral, t.negative],
                }],
            },
        );

        let ranked = rank(&filtered.by_publication, session.rank_key, cfg.top_n);
        charts.replace(ChartSlot::Publications, &stacked(&ranked, Some(cfg.label_max)));

        let all = usize::MAX;
        let topics = rank(&filtered.by_topic, RankKey::Count, all);
        charts.replace(ChartSlot::Topics, &stacked(&topics, None));

        let regions = rank(&filtered.by_region, RankKey::Count, all);
        charts.replace(ChartSlot::Regions, &stacked(&regions, None));

        let window = trend_window(&self.history.history, cfg.trend_days);
        charts.replace(
            ChartSlot::Trend,
            &ChartSpec {
                kind: ChartKind::Line,
                labels: window
                    .iter()
                    .map(|p| match chrono::NaiveDate::parse_from_str(&p.date, "%Y-%m-%d") {
                        Ok(d) => d.format("%-d %b").to_string(),
                        Err(_) => p.date.clone(),
                    })
                    .collect(),
                keys: window.iter().map(|p| p.date.clone()).collect(),
                series: vec![
                    Series {
                        label: "Positive".into(),
                        values: window.iter().map(|p| p.positive).collect(),
                    },
                    Series {
                        label: "Neutral".into(),
                        values: window.iter().map(|p| p.neutral).collect(),
                    },
                    Series {
                        label: "Negative".into(),
                        values: window.iter().map(|p| p.negative).collect(),
                    },
                ],
            },
        );

        let kws = extract_top_keywords(
            &filtered.sample_headlines,
            session.keyword_filter,
            cfg.keywords_top_n,
        );
        charts.replace(
            ChartSlot::Keywords,
            &ChartSpec {
                kind: ChartKind::Bar,
                labels: kws.iter().map(|k| k.keyword.clone()).collect(),
                keys: kws.iter().map(|k| k.keyword.clone()).collect(),
                series: vec![Series {
                    label: "Frequency".into(),
                    values: kws.iter().map(|k| k.count as u64).collect(),
                }],
            },
        );

        let total = filtered.sample_headlines.len();
        let shown = total.min(cfg.headline_limit);
        view.show_headlines(&filtered.sample_headlines[..shown], total);

        if !filtered.topics_filtered {
            debug!(target: "dashboard", "topic breakdown shown unfiltered for source selection");
        }
        info!(
            target: "dashboard",
            publications = filtered.by_publication.len(),
            headlines = total,
            all_sources = session.selection.is_all(),
            "dashboard refreshed"
        );

        RefreshReport {
            totals: filtered.totals,
            ranked_publications: ranked.into_iter().map(|b| b.key).collect(),
            headlines_shown: shown,
            headlines_total: total,
            topics_filtered: filtered.topics_filtered,
        }
    }
}
