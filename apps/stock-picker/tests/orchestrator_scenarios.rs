//! Orchestrator Scenario Tests
//!
//! End-to-end input sequences driven through the public API with a manual
//! clock.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use quote_domain::{PeriodCode, QuoteRequest, Symbol};
use stock_picker::{
    Field, InputMode, ManualClock, OrchestratorSettings, QueryOrchestrator, QuoteSink,
};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<QuoteRequest>>>);

impl QuoteSink for Recorder {
    fn emit(&mut self, request: QuoteRequest) {
        self.0.lock().unwrap().push(request);
    }
}

impl Recorder {
    fn requests(&self) -> Vec<QuoteRequest> {
        self.0.lock().unwrap().clone()
    }
}

fn setup(mode: InputMode) -> (QueryOrchestrator<ManualClock, Recorder>, ManualClock, Recorder) {
    let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
    let recorder = Recorder::default();
    let settings = OrchestratorSettings {
        mode,
        ..OrchestratorSettings::default()
    };
    let orchestrator = QueryOrchestrator::new(settings, clock.clone(), recorder.clone());
    (orchestrator, clock, recorder)
}

fn request(symbol: &str, period: PeriodCode) -> QuoteRequest {
    QuoteRequest::new(Symbol::parse(symbol).unwrap(), period)
}

fn settle(orchestrator: &mut QueryOrchestrator<ManualClock, Recorder>, clock: &ManualClock) {
    while let Some(deadline) = orchestrator.next_deadline() {
        let now = stock_picker::Clock::now(clock);
        if deadline > now {
            clock.advance(deadline - now);
        }
        orchestrator.poll_timers();
    }
}

#[test]
fn test_two_week_range_requests_one_month() {
    let (mut orchestrator, clock, recorder) = setup(InputMode::DateRange);

    orchestrator.on_input(Field::Symbol, "AAPL");
    orchestrator.on_input(Field::PeriodFrom, "2023-01-01");
    orchestrator.on_input(Field::PeriodTo, "2023-01-15");
    assert!(recorder.requests().is_empty());

    settle(&mut orchestrator, &clock);

    assert_eq!(
        recorder.requests(),
        vec![request("AAPL", PeriodCode::OneMonth)]
    );
}

#[test]
fn test_inverted_range_collapses_to_one_month() {
    let (mut orchestrator, clock, recorder) = setup(InputMode::DateRange);

    orchestrator.on_input(Field::Symbol, "AAPL");
    settle(&mut orchestrator, &clock);
    orchestrator.on_input(Field::PeriodFrom, "2023-06-01");
    orchestrator.on_input(Field::PeriodTo, "2023-01-01");

    assert_eq!(
        recorder.requests(),
        vec![request("AAPL", PeriodCode::OneMonth)]
    );
    let selection = orchestrator.selection();
    assert_eq!(
        selection.period_to,
        Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_future_start_collapses_to_one_month() {
    let (mut orchestrator, clock, recorder) = setup(InputMode::DateRange);

    orchestrator.on_input(Field::Symbol, "MSFT");
    settle(&mut orchestrator, &clock);
    orchestrator.on_input(Field::PeriodFrom, "2025-01-01");
    orchestrator.on_input(Field::PeriodTo, "2026-01-01");

    assert_eq!(
        recorder.requests(),
        vec![request("MSFT", PeriodCode::OneMonth)]
    );
}

#[test]
fn test_typing_then_widening_range() {
    let (mut orchestrator, clock, recorder) = setup(InputMode::DateRange);

    orchestrator.on_input(Field::PeriodFrom, "2020-01-01");
    orchestrator.on_input(Field::PeriodTo, "2020-02-01");

    for partial in ["G", "GO", "GOO", "GOOG"] {
        orchestrator.on_input(Field::Symbol, partial);
        clock.advance(Duration::from_millis(120));
        orchestrator.poll_timers();
    }
    settle(&mut orchestrator, &clock);

    orchestrator.on_input(Field::PeriodTo, "2021-06-01");
    orchestrator.on_input(Field::PeriodFrom, "2015-01-01");

    assert_eq!(
        recorder.requests(),
        vec![
            request("GOOG", PeriodCode::OneMonth),
            request("GOOG", PeriodCode::TwoYears),
            request("GOOG", PeriodCode::Max),
        ]
    );
}

#[test]
fn test_period_mode_passes_codes_through() {
    let (mut orchestrator, clock, recorder) = setup(InputMode::Period);

    orchestrator.on_input(Field::Symbol, "TSLA");
    orchestrator.on_input(Field::Period, "max");
    settle(&mut orchestrator, &clock);
    orchestrator.on_input(Field::Period, "max");
    orchestrator.on_input(Field::Period, "ytd");

    assert_eq!(
        recorder.requests(),
        vec![
            request("TSLA", PeriodCode::Max),
            request("TSLA", PeriodCode::YearToDate),
        ]
    );
}

#[test]
fn test_dispose_before_debounce_fires() {
    let (mut orchestrator, clock, recorder) = setup(InputMode::Period);

    orchestrator.on_input(Field::Period, "1m");
    orchestrator.on_input(Field::Symbol, "AAPL");
    orchestrator.dispose();

    clock.advance(Duration::from_secs(1));
    orchestrator.poll_timers();

    assert!(recorder.requests().is_empty());
}

#[test]
fn test_every_admitted_change_is_requested() {
    let (mut orchestrator, clock, recorder) = setup(InputMode::DateRange);

    orchestrator.on_input(Field::Symbol, "AAPL");
    orchestrator.on_input(Field::PeriodFrom, "2023-01-01");
    orchestrator.on_input(Field::PeriodTo, "2023-01-15");
    settle(&mut orchestrator, &clock);

    orchestrator.on_input(Field::PeriodTo, "2023-01-20");
    orchestrator.on_input(Field::Symbol, "");
    settle(&mut orchestrator, &clock);
    orchestrator.on_input(Field::Symbol, "AAPL");
    settle(&mut orchestrator, &clock);

    assert_eq!(
        recorder.requests(),
        vec![request("AAPL", PeriodCode::OneMonth); 3]
    );
}
