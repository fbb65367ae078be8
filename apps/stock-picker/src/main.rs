//! Stock Picker Binary
//!
//! Terminal driver for the query orchestrator. Reads change events from
//! stdin, one per line:
//!
//! ```text
//! symbol=AAPL
//! periodFrom=2023-01-01
//! periodTo=2023-01-15
//! period=5y
//! ```
//!
//! Every request the orchestrator emits is fetched from the quote cache
//! proxy and summarized on stdout. Blank lines and lines starting with `#`
//! are skipped.
//!
//! # Environment Variables
//!
//! - `STOCK_PICKER_PROXY_URL`: Quote proxy base URL (default: <http://localhost:3333>)
//! - `STOCK_PICKER_MODE`: `range` | `period` (default: range)
//! - `STOCK_PICKER_DEBOUNCE_MS`: Symbol quiet window (default: 300)
//! - `STOCK_PICKER_TIMEOUT_MS`: Per-attempt HTTP timeout (default: 10000)
//! - `STOCK_PICKER_DEDUPE`: Collapse consecutive identical requests (default: false)
//! - `STOCK_PICKER_CACHE_CAPACITY`: Charts kept for revalidation (default: 128)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Instant;

use quote_domain::QuoteRequest;
use stock_picker::domain::split_change_line;
use stock_picker::{
    ChartResponse, ChartSummary, PickerConfig, QueryOrchestrator, QuoteProxyClient, SystemClock,
    chart_series,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let config = PickerConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
    })?;
    tracing::info!(
        proxy = %config.client.base_url,
        mode = %config.orchestrator.mode,
        debounce_ms = config.orchestrator.symbol_debounce.as_millis(),
        "Stock picker started"
    );

    let client = Arc::new(QuoteProxyClient::new(&config.client)?);

    let (tx, mut rx) = mpsc::unbounded_channel::<QuoteRequest>();
    let fetcher = tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            match client.get_chart(&request).await {
                Ok(response) => print_chart(&request, &response),
                Err(e) => tracing::warn!(request = %request, error = %e, "Chart fetch failed"),
            }
        }
    });

    let mut orchestrator =
        QueryOrchestrator::new(config.orchestrator, SystemClock, move |request: QuoteRequest| {
            if tx.send(request).is_err() {
                tracing::warn!("Fetch task stopped, dropping request");
            }
        });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let deadline = orchestrator.next_deadline();
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => handle_line(&mut orchestrator, &line),
                None => break,
            },
            () = sleep_until(deadline) => orchestrator.poll_timers(),
        }
    }

    // Let a pending symbol settle before shutting down.
    if let Some(deadline) = orchestrator.next_deadline() {
        sleep_until(Some(deadline)).await;
        orchestrator.poll_timers();
    }
    orchestrator.dispose();

    fetcher.await?;
    Ok(())
}

fn handle_line<S: stock_picker::QuoteSink>(
    orchestrator: &mut QueryOrchestrator<SystemClock, S>,
    line: &str,
) {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return;
    }

    match split_change_line(line) {
        Ok((field, value)) => orchestrator.on_input(field, value),
        Err(e) => tracing::warn!(error = %e, "Ignoring input line"),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

fn print_chart(request: &QuoteRequest, response: &ChartResponse) {
    let series = match chart_series(&response.body) {
        Ok(series) => series,
        Err(e) => {
            tracing::warn!(request = %request, error = %e, "Chart payload is not JSON");
            return;
        }
    };

    match ChartSummary::of(&series) {
        Some(summary) => {
            let change = summary
                .change_pct()
                .map_or_else(|| "n/a".to_string(), |pct| format!("{pct:+.2}%"));
            println!(
                "{request}: {} points, {} {:.2} -> {} {:.2} ({change}), low {:.2}, high {:.2} [{:?}]",
                summary.points,
                summary.first.period,
                summary.first.close,
                summary.last.period,
                summary.last.close,
                summary.low,
                summary.high,
                response.source,
            );
        }
        None => println!("{request}: no data [{:?}]", response.source),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stock_picker=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
