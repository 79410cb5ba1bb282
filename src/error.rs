//! Error types for the dashboard pipeline, the editor and the store.

use thiserror::Error;

/// Failures while loading dashboard data. Any of these aborts the initial
/// render; there is no partial dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Transport failure, including timeouts
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Endpoint answered with a non-2xx status
    #[error("failed to load {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// Body was not the expected JSON document
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures of the headlines editor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("no headline with id {0}")]
    UnknownRow(usize),

    #[error("headline {0} is deleted")]
    DeletedRow(usize),
}

/// Failures of the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored document is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}
