// tests/loader_e2e.rs
//
// Loader and dashboard start-up against the real router on a local socket.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{routing::get, Json, Router};
use serde_json::json;

use news_sentiment_dashboard::api::{router, AppState};
use news_sentiment_dashboard::dashboard::{
    ChartBackend, ChartRegistry, ChartSlot, ChartSpec, Dashboard, DashboardConfig, DashboardView,
    Session, SourceEntry,
};
use news_sentiment_dashboard::error::DashboardError;
use news_sentiment_dashboard::loader::Loader;
use news_sentiment_dashboard::model::{Article, Sentiment, Totals};
use news_sentiment_dashboard::selection::Selection;
use news_sentiment_dashboard::store::HeadlinesStore;

async fn spawn_server(store: HeadlinesStore) -> SocketAddr {
    spawn_app(router(AppState::new(store))).await
}

async fn spawn_app(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

fn article(source: &str, sentiment: Sentiment) -> Article {
    Article {
        title: format!("{source} headline"),
        source: Some(source.into()),
        sentiment: Some(sentiment),
        published: chrono::Utc::now().to_rfc3339(),
        ..Default::default()
    }
}

struct NullCharts;

impl ChartBackend for NullCharts {
    type Handle = ChartSlot;
    fn create(&mut self, slot: ChartSlot, _spec: &ChartSpec) -> ChartSlot {
        slot
    }
    fn dispose(&mut self, _handle: ChartSlot) {}
}

#[derive(Default)]
struct StatusView {
    status: Vec<String>,
    errors: Vec<String>,
    totals: Option<Totals>,
}

impl DashboardView for StatusView {
    fn show_status(&mut self, text: &str) {
        self.status.push(text.into());
    }
    fn show_error(&mut self, message: &str) {
        self.errors.push(message.into());
    }
    fn show_sources(&mut self, _sources: &[SourceEntry], _selection: &Selection) {}
    fn show_totals(&mut self, totals: &Totals) {
        self.totals = Some(*totals);
    }
    fn show_headlines(&mut self, _headlines: &[Article], _total: usize) {}
}

#[tokio::test]
async fn loads_snapshot_and_history_written_by_the_store() {
    let store = HeadlinesStore::in_memory();
    store
        .save(vec![
            article("CNN", Sentiment::Positive),
            article("CNN", Sentiment::Neutral),
            article("BBC", Sentiment::Negative),
        ])
        .await
        .unwrap();
    let addr = spawn_server(store).await;

    let loader = Loader::new(format!("http://{addr}/data"));
    let (snapshot, history) = loader.load().await.expect("load");
    assert_eq!(snapshot.totals.total(), 3);
    assert_eq!(snapshot.by_publication[0].key, "CNN");
    assert_eq!(history.history.len(), 7);
    assert_eq!(history.history.last().unwrap().count, 3);
}

#[tokio::test]
async fn start_renders_first_frame() {
    let store = HeadlinesStore::in_memory();
    store
        .save(vec![article("AP", Sentiment::Positive)])
        .await
        .unwrap();
    let addr = spawn_server(store).await;

    let mut charts = ChartRegistry::new(NullCharts);
    let mut view = StatusView::default();
    let d = Dashboard::start(
        &Loader::new(format!("http://{addr}/data/")),
        DashboardConfig::default(),
        &Session::default(),
        &mut charts,
        &mut view,
    )
    .await
    .expect("start");

    assert_eq!(d.source_list().len(), 1);
    assert!(view.errors.is_empty());
    assert!(view.status[0].starts_with("Last updated"));
    assert_eq!(view.totals.unwrap().positive, 1);
    assert_eq!(charts.live_count(), 6);
}

#[tokio::test]
async fn failed_fetch_shows_error_and_draws_nothing() {
    let addr = spawn_server(HeadlinesStore::in_memory()).await;

    let mut charts = ChartRegistry::new(NullCharts);
    let mut view = StatusView::default();
    let err = Dashboard::start(
        &Loader::new(format!("http://{addr}/missing")),
        DashboardConfig::default(),
        &Session::default(),
        &mut charts,
        &mut view,
    )
    .await
    .expect_err("404 must fail the load");

    assert!(matches!(err, DashboardError::Status { status: 404, .. }));
    assert_eq!(view.errors, vec!["Error loading data".to_string()]);
    assert!(view.status.is_empty());
    assert!(view.totals.is_none());
    assert_eq!(charts.live_count(), 0);
}

#[tokio::test]
async fn unreachable_host_is_a_request_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };
    let err = Loader::new(format!("http://{addr}/data"))
        .with_timeout(2)
        .load()
        .await
        .expect_err("nothing is listening");
    assert!(matches!(err, DashboardError::Request { .. }));
}

fn snapshot_body() -> serde_json::Value {
    json!({
        "generated_at": "2026-10-19T06:00:00Z",
        "totals": {"positive": 1, "neutral": 0, "negative": 0},
        "by_publication": [{"source": "AP", "positive": 1, "neutral": 0, "negative": 0, "count": 1}]
    })
}

#[tokio::test]
async fn one_missing_document_aborts_the_whole_load() {
    // Snapshot is served, history is not.
    let only_snapshot = Router::new().route(
        "/data/latest.json",
        get(|| async { Json(snapshot_body()) }),
    );
    let addr = spawn_app(only_snapshot).await;

    let mut charts = ChartRegistry::new(NullCharts);
    let mut view = StatusView::default();
    let err = Dashboard::start(
        &Loader::new(format!("http://{addr}/data")),
        DashboardConfig::default(),
        &Session::default(),
        &mut charts,
        &mut view,
    )
    .await
    .expect_err("history 404 must fail the load");

    match err {
        DashboardError::Status { url, status } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("history.json"), "{url}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(view.errors, vec!["Error loading data".to_string()]);
    assert!(view.totals.is_none());
    assert_eq!(charts.live_count(), 0);

    // And the other way round: history served, snapshot not.
    let only_history = Router::new().route(
        "/data/history.json",
        get(|| async { Json(json!({"history": []})) }),
    );
    let addr = spawn_app(only_history).await;
    let err = Loader::new(format!("http://{addr}/data"))
        .load()
        .await
        .expect_err("snapshot 404 must fail the load");
    assert!(matches!(err, DashboardError::Status { status: 404, .. }));
}

#[tokio::test]
async fn stalled_endpoint_hits_the_request_timeout() {
    let stalled = Router::new()
        .route(
            "/data/latest.json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(snapshot_body())
            }),
        )
        .route(
            "/data/history.json",
            get(|| async { Json(json!({"history": []})) }),
        );
    let addr = spawn_app(stalled).await;

    let started = Instant::now();
    let err = Loader::new(format!("http://{addr}/data"))
        .with_timeout(1)
        .load()
        .await
        .expect_err("stalled snapshot must time out");

    assert!(started.elapsed() < Duration::from_secs(10));
    match err {
        DashboardError::Request { source, .. } => assert!(source.is_timeout()),
        other => panic!("unexpected error: {other}"),
    }
}
