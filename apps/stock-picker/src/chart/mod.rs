//! Chart Series
//!
//! Maps a provider chart payload to the `(period, close)` columns the chart
//! displays, plus a short summary for terminal output.

use serde_json::Value;

/// One plotted point.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    /// Period label (`date`, falling back to `label`).
    pub period: String,
    /// Closing price.
    pub close: f64,
}

/// Extract chart points from a payload.
///
/// The payload must be a JSON array. Entries without a label or a numeric
/// `close` are skipped.
///
/// # Errors
///
/// Returns an error if the payload is not JSON.
pub fn chart_series(payload: &[u8]) -> Result<Vec<ChartPoint>, serde_json::Error> {
    let value: Value = serde_json::from_slice(payload)?;

    let Some(entries) = value.as_array() else {
        return Ok(Vec::new());
    };

    Ok(entries.iter().filter_map(point).collect())
}

fn point(entry: &Value) -> Option<ChartPoint> {
    let period = entry
        .get("date")
        .or_else(|| entry.get("label"))
        .and_then(Value::as_str)?;
    let close = entry.get("close").and_then(Value::as_f64)?;

    Some(ChartPoint {
        period: period.to_string(),
        close,
    })
}

/// Summary of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSummary {
    /// Number of points.
    pub points: usize,
    /// First point.
    pub first: ChartPoint,
    /// Last point.
    pub last: ChartPoint,
    /// Lowest close.
    pub low: f64,
    /// Highest close.
    pub high: f64,
}

impl ChartSummary {
    /// Summarize a series. `None` when empty.
    #[must_use]
    pub fn of(series: &[ChartPoint]) -> Option<Self> {
        let first = series.first()?.clone();
        let last = series.last()?.clone();
        let (low, high) = series.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
            (lo.min(p.close), hi.max(p.close))
        });

        Some(Self {
            points: series.len(),
            first,
            last,
            low,
            high,
        })
    }

    /// Percentage change from first to last close.
    #[must_use]
    pub fn change_pct(&self) -> Option<f64> {
        (self.first.close != 0.0)
            .then(|| (self.last.close - self.first.close) / self.first.close * 100.0)
    }
}
