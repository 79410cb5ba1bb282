//! HTTP surface: the headlines store endpoint plus read-only data views for
//! the dashboard.

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::aggregate::compute_stats;
use crate::history::{daily_history, TREND_DAYS};
use crate::model::{Article, HeadlinesDoc, HistoryDoc, Snapshot};
use crate::store::HeadlinesStore;
use crate::telemetry;

#[derive(Clone)]
pub struct AppState {
    pub store: HeadlinesStore,
    pub trend_days: usize,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(store: HeadlinesStore) -> Self {
        Self {
            store,
            trend_days: TREND_DAYS,
            metrics: None,
        }
    }

    pub fn with_trend_days(mut self, days: usize) -> Self {
        self.trend_days = days;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(
            "/api/headlines",
            get(get_headlines).post(save_headlines).options(preflight),
        )
        .route(
            "/api/headlines/{*rest}",
            get(get_headlines).post(save_headlines).options(preflight),
        )
        .route("/api/stats", get(get_stats))
        .route("/data/latest.json", get(get_stats))
        .route("/data/history.json", get(get_history))
        .route("/metrics", get(render_metrics))
        .fallback(fallback)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error responses: status + `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Internal(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

async fn get_headlines(State(state): State<AppState>) -> Result<Json<HeadlinesDoc>, ApiError> {
    telemetry::record_load();
    match state.store.load().await {
        Ok(doc) => Ok(Json(doc)),
        Err(e) => {
            error!(target: "api", error = %e, "loading headlines failed");
            Err(ApiError::Internal("Failed to load headlines"))
        }
    }
}

/// Parse a save body. Anything but a JSON array of objects is rejected
/// before the store is touched.
fn parse_headlines(body: &[u8]) -> Result<Vec<Article>, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| not_an_array())?;
    let Value::Array(items) = value else {
        return Err(not_an_array());
    };
    if !items.iter().all(Value::is_object) {
        return Err(not_an_array());
    }
    serde_json::from_value(Value::Array(items)).map_err(|_| not_an_array())
}

fn not_an_array() -> ApiError {
    ApiError::BadRequest("Expected array of headlines")
}

async fn save_headlines(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let headlines = match parse_headlines(&body) {
        Ok(h) => h,
        Err(e) => {
            warn!(target: "api", bytes = body.len(), "rejected headlines body");
            telemetry::record_rejected();
            return Err(e);
        }
    };

    match state.store.save(headlines).await {
        Ok(out) => {
            telemetry::record_save(out.count);
            info!(target: "api", count = out.count, "headlines replaced");
            Ok(Json(json!({
                "success": true,
                "message": format!("Successfully saved {} headlines", out.count),
                "count": out.count,
            })))
        }
        Err(e) => {
            telemetry::record_save_error();
            error!(target: "api", error = %e, "saving headlines failed");
            Err(ApiError::Internal("Failed to save headlines"))
        }
    }
}

/// Last saved statistics, or the statistics of an empty list.
async fn get_stats(State(state): State<AppState>) -> Result<Json<Snapshot>, ApiError> {
    match state.store.latest_stats().await {
        Ok(Some(s)) => Ok(Json(s)),
        Ok(None) => Ok(Json(compute_stats(&[]))),
        Err(e) => {
            error!(target: "api", error = %e, "loading stats failed");
            Err(ApiError::Internal("Failed to load statistics"))
        }
    }
}

/// Daily history derived from the stored headlines.
async fn get_history(State(state): State<AppState>) -> Result<Json<HistoryDoc>, ApiError> {
    match state.store.load().await {
        Ok(doc) => Ok(Json(HistoryDoc {
            history: daily_history(&doc.headlines, Utc::now(), state.trend_days),
        })),
        Err(e) => {
            error!(target: "api", error = %e, "loading history failed");
            Err(ApiError::Internal("Failed to load history"))
        }
    }
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(h) => h.render().into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_arrays_of_objects_are_accepted() {
        assert!(parse_headlines(b"[]").unwrap().is_empty());
        assert_eq!(parse_headlines(br#"[{"title":"x"}]"#).unwrap().len(), 1);
        assert!(matches!(parse_headlines(b"{}"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_headlines(b"[1,2]"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_headlines(b"not json"), Err(ApiError::BadRequest(_))));
    }
}
