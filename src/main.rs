//! News sentiment dashboard backend. Binary entrypoint.
//! Boots the Axum HTTP server: headlines store endpoint, data views and
//! Prometheus metrics.

use news_sentiment_dashboard::{api, config::AppConfig, telemetry::Metrics};
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - DASHBOARD_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("DASHBOARD_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_sentiment_dashboard=info,api=info,store=info,warn"));

    // Shuttle may already have installed a global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = AppConfig::from_env()?;
    let metrics = Metrics::install()?;
    info!(
        store_dir = ?cfg.store_dir,
        trend_days = cfg.trend_days,
        "starting headlines service"
    );

    let state = api::AppState::new(cfg.headlines_store())
        .with_trend_days(cfg.trend_days)
        .with_metrics(metrics.handle);
    let router = api::router(state);

    Ok(router.into())
}
