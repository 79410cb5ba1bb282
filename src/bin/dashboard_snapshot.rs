//! Loads the dashboard data once and prints every view to stdout.
//!
//! Usage: `dashboard_snapshot [SOURCE ...]`. With no arguments all sources
//! are shown; otherwise only the named ones.

use news_sentiment_dashboard::config::AppConfig;
use news_sentiment_dashboard::dashboard::{
    format_time_ago, ChartBackend, ChartRegistry, ChartSlot, ChartSpec, Dashboard, DashboardView,
    Session, SourceEntry,
};
use news_sentiment_dashboard::model::{Article, Totals};
use news_sentiment_dashboard::selection::Selection;

/// Prints each chart as a small table instead of drawing it.
struct PrintCharts {
    next_id: u32,
}

impl ChartBackend for PrintCharts {
    type Handle = u32;

    fn create(&mut self, slot: ChartSlot, spec: &ChartSpec) -> u32 {
        self.next_id += 1;
        println!("\n[{slot:?}]");
        for series in &spec.series {
            let cells: Vec<String> = spec
                .labels
                .iter()
                .zip(&series.values)
                .map(|(l, v)| format!("{l}={v}"))
                .collect();
            println!("  {:<10} {}", series.label, cells.join("  "));
        }
        self.next_id
    }

    fn dispose(&mut self, _handle: u32) {}
}

struct Console;

impl DashboardView for Console {
    fn show_status(&mut self, text: &str) {
        println!("{text}");
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn show_sources(&mut self, sources: &[SourceEntry], selection: &Selection) {
        println!("\nSources:");
        for s in sources {
            let mark = if selection.contains(&s.source) { "x" } else { " " };
            println!("  [{mark}] {} ({})", s.source, s.count);
        }
    }

    fn show_totals(&mut self, totals: &Totals) {
        println!(
            "\nTotal {}  positive {}  neutral {}  negative {}",
            totals.total(),
            totals.positive,
            totals.neutral,
            totals.negative
        );
    }

    fn show_headlines(&mut self, headlines: &[Article], total: usize) {
        println!("\nHeadlines ({} of {total}):", headlines.len());
        let now = chrono::Utc::now();
        for a in headlines {
            let sentiment = a.sentiment.map(|s| s.as_str()).unwrap_or("-");
            println!(
                "  {:<8} {} [{}, {}]",
                sentiment,
                a.title,
                a.source_or_default(),
                format_time_ago(&a.published, now)
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = AppConfig::from_env()?;
    let sources: Vec<String> = std::env::args().skip(1).collect();
    let session = Session {
        selection: if sources.is_empty() {
            Selection::All
        } else {
            Selection::from_sources(sources)
        },
        ..Default::default()
    };

    let mut charts = ChartRegistry::new(PrintCharts { next_id: 0 });
    let mut view = Console;
    Dashboard::start(&cfg.loader(), cfg.dashboard(), &session, &mut charts, &mut view).await?;
    charts.dispose_all();
    Ok(())
}
