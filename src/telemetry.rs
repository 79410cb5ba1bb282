use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder. Safe to call more than
    /// once; later calls reuse the first handle.
    pub fn install() -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")
            })?
            .clone();
        ensure_described();
        Ok(Self { handle })
    }

    /// Prometheus exposition text.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// One-time metric descriptions (so series show up on /metrics).
fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("headlines_saves_total", "Successful saves of the headlines document.");
        describe_counter!(
            "headlines_save_errors_total",
            "Saves that failed in the storage backend."
        );
        describe_counter!("headlines_loads_total", "Reads of the headlines document.");
        describe_counter!(
            "headlines_rejected_total",
            "Save requests rejected for an invalid body."
        );
        describe_gauge!("headlines_stored_count", "Headlines in the last saved document.");
    });
}

pub(crate) fn record_save(count: usize) {
    counter!("headlines_saves_total").increment(1);
    gauge!("headlines_stored_count").set(count as f64);
}

pub(crate) fn record_save_error() {
    counter!("headlines_save_errors_total").increment(1);
}

pub(crate) fn record_load() {
    counter!("headlines_loads_total").increment(1);
}

pub(crate) fn record_rejected() {
    counter!("headlines_rejected_total").increment(1);
}
