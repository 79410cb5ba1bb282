// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod editor;
pub mod error;
pub mod history;
pub mod keywords;
pub mod loader;
pub mod model;
pub mod selection;
pub mod store;
pub mod telemetry;
pub mod topics;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::dashboard::{Dashboard, DashboardView, Session};
pub use crate::error::{DashboardError, EditorError, StoreError};
pub use crate::model::{Article, Bucket, HistoryDoc, Sentiment, Snapshot};
pub use crate::selection::Selection;
pub use crate::store::HeadlinesStore;
