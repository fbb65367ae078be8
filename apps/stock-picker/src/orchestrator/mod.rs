//! Query Orchestrator
//!
//! Turns raw, independently-changing form inputs into a minimal sequence of
//! valid [`QuoteRequest`]s.
//!
//! # Pipeline
//!
//! ```text
//! symbol ──► trim ──► debounce(300ms) ──► distinct ──┐
//! periodFrom ─────────────────────────► distinct ──┤
//! periodTo ───────────────────────────► distinct ──┼──► latest join ──► validate ──► bucket ──► distinct ──► sink
//! period ─────────────────────────────► distinct ──┘     (per mode)      (range mode only)       (optional)
//! ```
//!
//! In date-range mode the join tracks symbol, `periodFrom` and `periodTo`;
//! in period mode it tracks symbol and `period`. Nothing is emitted until
//! every tracked input has a value and the symbol is non-empty and path-safe.
//!
//! The orchestrator owns no timers. The driver calls
//! [`QueryOrchestrator::poll_timers`] once [`QueryOrchestrator::next_deadline`]
//! has passed.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use quote_domain::{PeriodCode, QuoteRequest, Symbol};

use crate::domain::{Field, FieldChange, QuerySelection, bucket_range, validate_range};
use crate::stream::{Clock, Debounce, Distinct, Latest, QuoteSink};

/// Default quiet window for symbol input.
pub const DEFAULT_SYMBOL_DEBOUNCE: Duration = Duration::from_millis(300);

/// How the period is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// A `periodFrom..periodTo` range bucketed to a period.
    #[default]
    DateRange,
    /// A period code selected directly.
    Period,
}

impl InputMode {
    /// Mode name as used in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DateRange => "range",
            Self::Period => "period",
        }
    }

    const fn tracks(self, field: Field) -> bool {
        match field {
            Field::Symbol => true,
            Field::PeriodFrom | Field::PeriodTo => matches!(self, Self::DateRange),
            Field::Period => matches!(self, Self::Period),
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "range" | "date-range" | "daterange" => Ok(Self::DateRange),
            "period" => Ok(Self::Period),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Unknown input mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown input mode: {0:?}")]
pub struct ParseModeError(pub String);

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Which inputs are tracked.
    pub mode: InputMode,
    /// Quiet window for symbol input.
    pub symbol_debounce: Duration,
    /// Collapse consecutive identical requests. Off by default, so every
    /// admitted input change reaches the sink.
    pub dedupe_requests: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            mode: InputMode::default(),
            symbol_debounce: DEFAULT_SYMBOL_DEBOUNCE,
            dedupe_requests: false,
        }
    }
}

/// Stabilizes form input into quote requests.
pub struct QueryOrchestrator<C: Clock, S: QuoteSink> {
    settings: OrchestratorSettings,
    clock: C,
    sink: Option<S>,

    symbol_debounce: Debounce<String>,
    symbol_distinct: Distinct<String>,
    from_distinct: Distinct<DateTime<Utc>>,
    to_distinct: Distinct<DateTime<Utc>>,
    period_distinct: Distinct<PeriodCode>,

    symbol: Latest<String>,
    period_from: Latest<DateTime<Utc>>,
    period_to: Latest<DateTime<Utc>>,
    period: Latest<PeriodCode>,

    last_emitted: Option<QuoteRequest>,
}

impl<C: Clock, S: QuoteSink> QueryOrchestrator<C, S> {
    /// Create an orchestrator delivering to `sink`.
    pub fn new(settings: OrchestratorSettings, clock: C, sink: S) -> Self {
        Self {
            symbol_debounce: Debounce::new(settings.symbol_debounce),
            settings,
            clock,
            sink: Some(sink),
            symbol_distinct: Distinct::new(),
            from_distinct: Distinct::new(),
            to_distinct: Distinct::new(),
            period_distinct: Distinct::new(),
            symbol: Latest::new(),
            period_from: Latest::new(),
            period_to: Latest::new(),
            period: Latest::new(),
            last_emitted: None,
        }
    }

    /// Active input mode.
    pub const fn mode(&self) -> InputMode {
        self.settings.mode
    }

    /// Feed a raw `(field, value)` change.
    ///
    /// Values that cannot be parsed are logged and ignored.
    pub fn on_input(&mut self, field: Field, raw: &str) {
        match FieldChange::parse(field, raw) {
            Ok(change) => self.on_change(change),
            Err(e) => tracing::warn!(field = %field, error = %e, "Ignoring unparsable input"),
        }
    }

    /// Feed a typed change.
    pub fn on_change(&mut self, change: FieldChange) {
        if self.is_disposed() {
            return;
        }

        let field = change.field();
        if !self.settings.mode.tracks(field) {
            tracing::debug!(
                field = %field,
                mode = %self.settings.mode,
                "Ignoring input for inactive mode"
            );
            return;
        }

        match change {
            FieldChange::Symbol(raw) => {
                let now = self.clock.now();
                self.symbol_debounce.push(raw.trim().to_string(), now);
            }
            FieldChange::PeriodFrom(from) => {
                if let Some(from) = self.from_distinct.admit(from) {
                    self.period_from.set(from);
                    self.combine();
                }
            }
            FieldChange::PeriodTo(to) => {
                if let Some(to) = self.to_distinct.admit(to) {
                    self.period_to.set(to);
                    self.combine();
                }
            }
            FieldChange::Period(period) => {
                if let Some(period) = self.period_distinct.admit(period) {
                    self.period.set(period);
                    self.combine();
                }
            }
        }
    }

    /// Release the debounced symbol if its window has passed.
    pub fn poll_timers(&mut self) {
        if self.is_disposed() {
            return;
        }

        let now = self.clock.now();
        if let Some(symbol) = self.symbol_debounce.poll(now)
            && let Some(symbol) = self.symbol_distinct.admit(symbol)
        {
            self.symbol.set(symbol);
            self.combine();
        }
    }

    /// When [`Self::poll_timers`] next has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.is_disposed() {
            return None;
        }
        self.symbol_debounce.deadline()
    }

    /// Current held selection, including any range correction.
    pub fn selection(&self) -> QuerySelection {
        QuerySelection {
            symbol: self.symbol.cloned().unwrap_or_default(),
            period_from: self.period_from.cloned(),
            period_to: self.period_to.cloned(),
            period: self.period.cloned(),
        }
    }

    /// Release the sink and cancel pending timers. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.sink.take().is_some() {
            self.symbol_debounce.cancel();
            tracing::debug!("Orchestrator disposed");
        }
    }

    /// Whether [`Self::dispose`] has run.
    pub const fn is_disposed(&self) -> bool {
        self.sink.is_none()
    }

    fn combine(&mut self) {
        let Some(symbol) = self.symbol.cloned() else {
            return;
        };
        if symbol.is_empty() {
            return;
        }

        let period = match self.settings.mode {
            InputMode::DateRange => {
                let (Some(&from), Some(&to)) = (self.period_from.get(), self.period_to.get())
                else {
                    return;
                };
                self.bucket(from, to)
            }
            InputMode::Period => {
                let Some(&period) = self.period.get() else {
                    return;
                };
                period
            }
        };

        let symbol = match Symbol::parse(&symbol) {
            Ok(symbol) => symbol,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Not requesting unsafe symbol");
                return;
            }
        };

        let request = QuoteRequest::new(symbol, period);

        if self.settings.dedupe_requests && self.last_emitted.as_ref() == Some(&request) {
            tracing::trace!(request = %request, "Request unchanged");
            return;
        }

        if let Some(sink) = self.sink.as_mut() {
            tracing::debug!(request = %request, "Emitting quote request");
            self.last_emitted = Some(request.clone());
            sink.emit(request);
        }
    }

    fn bucket(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> PeriodCode {
        let check = validate_range(from, to, self.clock.wall());

        if check.corrected {
            tracing::debug!(
                from = %check.from,
                to = %to,
                from_valid = check.from_valid,
                to_valid = check.to_valid,
                "Correcting date range"
            );
            self.period_to.set(check.to);
            self.to_distinct.reseed(check.to);
        }

        bucket_range(check.from, check.to)
    }
}

impl<C: Clock, S: QuoteSink> Drop for QueryOrchestrator<C, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<C: Clock, S: QuoteSink> fmt::Debug for QueryOrchestrator<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOrchestrator")
            .field("settings", &self.settings)
            .field("selection", &self.selection())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::TimeZone;

    use super::*;
    use crate::stream::ManualClock;

    type Emitted = Rc<RefCell<Vec<QuoteRequest>>>;

    fn clock() -> ManualClock {
        ManualClock::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
    }

    fn orchestrator(
        mode: InputMode,
        clock: &ManualClock,
    ) -> (QueryOrchestrator<ManualClock, impl FnMut(QuoteRequest)>, Emitted) {
        let settings = OrchestratorSettings {
            mode,
            ..OrchestratorSettings::default()
        };
        orchestrator_with(settings, clock)
    }

    fn orchestrator_with(
        settings: OrchestratorSettings,
        clock: &ManualClock,
    ) -> (QueryOrchestrator<ManualClock, impl FnMut(QuoteRequest)>, Emitted) {
        let emitted: Emitted = Rc::default();
        let sink = {
            let emitted = Rc::clone(&emitted);
            move |request: QuoteRequest| emitted.borrow_mut().push(request)
        };
        (QueryOrchestrator::new(settings, clock.clone(), sink), emitted)
    }

    fn type_symbol<S: QuoteSink>(
        orchestrator: &mut QueryOrchestrator<ManualClock, S>,
        clock: &ManualClock,
        symbol: &str,
    ) {
        orchestrator.on_input(Field::Symbol, symbol);
        clock.advance(DEFAULT_SYMBOL_DEBOUNCE);
        orchestrator.poll_timers();
    }

    fn request(symbol: &str, period: PeriodCode) -> QuoteRequest {
        QuoteRequest::new(Symbol::parse(symbol).unwrap(), period)
    }

    #[test]
    fn waits_for_every_tracked_input() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::DateRange, &clock);

        type_symbol(&mut orch, &clock, "AAPL");
        orch.on_input(Field::PeriodFrom, "2023-01-01");
        assert!(emitted.borrow().is_empty());

        orch.on_input(Field::PeriodTo, "2023-01-15");
        assert_eq!(*emitted.borrow(), vec![request("AAPL", PeriodCode::OneMonth)]);
    }

    #[test]
    fn symbol_is_trimmed() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::Period, &clock);

        orch.on_input(Field::Period, "1y");
        type_symbol(&mut orch, &clock, "  MSFT ");

        assert_eq!(*emitted.borrow(), vec![request("MSFT", PeriodCode::OneYear)]);
        assert_eq!(orch.selection().symbol, "MSFT");
    }

    #[test]
    fn keystroke_burst_emits_once() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::Period, &clock);
        orch.on_input(Field::Period, "6m");

        for partial in ["A", "AA", "AAP", "AAPL"] {
            orch.on_input(Field::Symbol, partial);
            clock.advance(Duration::from_millis(100));
            orch.poll_timers();
        }
        assert!(emitted.borrow().is_empty());

        clock.advance(Duration::from_millis(200));
        orch.poll_timers();

        assert_eq!(*emitted.borrow(), vec![request("AAPL", PeriodCode::SixMonths)]);
    }

    #[test]
    fn empty_symbol_never_emits() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::Period, &clock);

        orch.on_input(Field::Period, "1m");
        type_symbol(&mut orch, &clock, "   ");
        orch.on_input(Field::Period, "3m");

        assert!(emitted.borrow().is_empty());
    }

    #[test]
    fn unsafe_symbol_never_emits() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::Period, &clock);

        orch.on_input(Field::Period, "1m");
        type_symbol(&mut orch, &clock, "../etc");

        assert!(emitted.borrow().is_empty());
    }

    #[test]
    fn repeated_period_is_not_a_change() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::Period, &clock);

        type_symbol(&mut orch, &clock, "AAPL");
        orch.on_input(Field::Period, "5y");
        orch.on_input(Field::Period, "5y");

        assert_eq!(emitted.borrow().len(), 1);
    }

    #[test]
    fn each_change_uses_latest_values() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::Period, &clock);

        type_symbol(&mut orch, &clock, "AAPL");
        orch.on_input(Field::Period, "1m");
        orch.on_input(Field::Period, "ytd");
        type_symbol(&mut orch, &clock, "GOOG");

        assert_eq!(
            *emitted.borrow(),
            vec![
                request("AAPL", PeriodCode::OneMonth),
                request("AAPL", PeriodCode::YearToDate),
                request("GOOG", PeriodCode::YearToDate),
            ]
        );
    }

    #[test]
    fn inverted_range_is_corrected_in_held_state() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::DateRange, &clock);

        type_symbol(&mut orch, &clock, "AAPL");
        orch.on_input(Field::PeriodFrom, "2023-06-01");
        orch.on_input(Field::PeriodTo, "2023-01-01");

        assert_eq!(*emitted.borrow(), vec![request("AAPL", PeriodCode::OneMonth)]);

        let selection = orch.selection();
        assert_eq!(selection.period_to, selection.period_from);

        // Re-entering the corrected value is not a change.
        orch.on_input(Field::PeriodTo, "2023-06-01");
        assert_eq!(emitted.borrow().len(), 1);
    }

    #[test]
    fn same_bucket_collapses_when_deduping() {
        let clock = clock();
        let settings = OrchestratorSettings {
            dedupe_requests: true,
            ..OrchestratorSettings::default()
        };
        let (mut orch, emitted) = orchestrator_with(settings, &clock);

        type_symbol(&mut orch, &clock, "AAPL");
        orch.on_input(Field::PeriodFrom, "2023-01-01");
        orch.on_input(Field::PeriodTo, "2023-01-15");
        orch.on_input(Field::PeriodTo, "2023-01-20");
        orch.on_input(Field::PeriodTo, "2023-12-01");

        assert_eq!(
            *emitted.borrow(),
            vec![
                request("AAPL", PeriodCode::OneMonth),
                request("AAPL", PeriodCode::OneYear),
            ]
        );
    }

    #[test]
    fn join_emits_every_change_by_default() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::DateRange, &clock);

        type_symbol(&mut orch, &clock, "AAPL");
        orch.on_input(Field::PeriodFrom, "2023-01-01");
        orch.on_input(Field::PeriodTo, "2023-01-15");
        orch.on_input(Field::PeriodTo, "2023-01-20");

        assert_eq!(
            *emitted.borrow(),
            vec![
                request("AAPL", PeriodCode::OneMonth),
                request("AAPL", PeriodCode::OneMonth),
            ]
        );
    }

    #[test]
    fn retyping_cleared_symbol_requests_again() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::DateRange, &clock);

        type_symbol(&mut orch, &clock, "AAPL");
        orch.on_input(Field::PeriodFrom, "2023-01-01");
        orch.on_input(Field::PeriodTo, "2023-01-15");
        orch.on_input(Field::PeriodTo, "2023-01-20");
        type_symbol(&mut orch, &clock, "");
        type_symbol(&mut orch, &clock, "AAPL");

        assert_eq!(emitted.borrow().len(), 3);
        assert!(
            emitted
                .borrow()
                .iter()
                .all(|r| *r == request("AAPL", PeriodCode::OneMonth))
        );
    }

    #[test]
    fn inactive_mode_fields_are_ignored() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::Period, &clock);

        type_symbol(&mut orch, &clock, "AAPL");
        orch.on_input(Field::PeriodFrom, "2023-01-01");
        orch.on_input(Field::PeriodTo, "2023-01-15");

        assert!(emitted.borrow().is_empty());
        assert_eq!(orch.selection().period_from, None);
    }

    #[test]
    fn unparsable_values_are_ignored() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::DateRange, &clock);

        type_symbol(&mut orch, &clock, "AAPL");
        orch.on_input(Field::PeriodFrom, "2023-01-01");
        orch.on_input(Field::PeriodTo, "not a date");

        assert!(emitted.borrow().is_empty());
        assert_eq!(orch.selection().period_to, None);
    }

    #[test]
    fn dispose_cancels_pending_symbol() {
        let clock = clock();
        let (mut orch, emitted) = orchestrator(InputMode::Period, &clock);

        orch.on_input(Field::Period, "1m");
        orch.on_input(Field::Symbol, "AAPL");
        assert!(orch.next_deadline().is_some());

        orch.dispose();
        orch.dispose();
        clock.advance(DEFAULT_SYMBOL_DEBOUNCE);
        orch.poll_timers();
        orch.on_input(Field::Period, "3m");

        assert!(orch.is_disposed());
        assert_eq!(orch.next_deadline(), None);
        assert!(emitted.borrow().is_empty());
    }

    #[test]
    fn drop_releases_sink() {
        let clock = clock();
        let (orch, emitted) = orchestrator(InputMode::Period, &clock);
        assert_eq!(Rc::strong_count(&emitted), 2);

        drop(orch);

        assert_eq!(Rc::strong_count(&emitted), 1);
    }

    #[test]
    fn input_mode_parses() {
        assert_eq!("range".parse::<InputMode>().unwrap(), InputMode::DateRange);
        assert_eq!(" Period ".parse::<InputMode>().unwrap(), InputMode::Period);
        assert_eq!(
            "weekly".parse::<InputMode>(),
            Err(ParseModeError("weekly".to_string()))
        );
    }
}
