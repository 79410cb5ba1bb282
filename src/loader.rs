// src/loader.rs
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::DashboardError;
use crate::model::{HistoryDoc, Snapshot};

pub const SNAPSHOT_FILE: &str = "latest.json";
pub const HISTORY_FILE: &str = "history.json";

/// Fetches the snapshot and history documents from a base URL.
///
/// Both requests run concurrently and both must succeed. Every request is
/// bounded by `timeout`; there are no retries.
#[derive(Clone)]
pub struct Loader {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl Loader {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn url_for(&self, file: &str) -> String {
        format!("{}{}", self.base_url, file.trim_start_matches('/'))
    }

    pub async fn load(&self) -> Result<(Snapshot, HistoryDoc), DashboardError> {
        let (snapshot, history) = tokio::try_join!(
            self.fetch_json::<Snapshot>(SNAPSHOT_FILE),
            self.fetch_json::<HistoryDoc>(HISTORY_FILE),
        )?;
        debug!(
            target: "loader",
            publications = snapshot.by_publication.len(),
            history_days = history.history.len(),
            "dashboard data loaded"
        );
        Ok((snapshot, history))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, file: &str) -> Result<T, DashboardError> {
        let url = self.url_for(file);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| DashboardError::Request {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(target: "loader", %url, status = status.as_u16(), "non-2xx response");
            return Err(DashboardError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes().await.map_err(|source| DashboardError::Request {
            url: url.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| DashboardError::Decode { url, source })
    }
}
