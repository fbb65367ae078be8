//! Stream Stabilization Primitives
//!
//! Small synchronous state machines used to clean up a noisy input stream:
//!
//! - [`Debounce`]: release a value once it has been stable for a window
//! - [`Distinct`]: drop consecutive duplicates
//! - [`Latest`]: slot of a latest-value-wins join
//! - [`Clock`]: time source ([`SystemClock`], [`ManualClock`])
//! - [`QuoteSink`]: receiver of emitted requests
//!
//! None of them spawn tasks or own timers; the owner drives them with the
//! current time.

mod clock;
mod debounce;
mod distinct;
mod latest;

use quote_domain::QuoteRequest;

pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::Debounce;
pub use distinct::Distinct;
pub use latest::Latest;

/// Receiver of emitted quote requests.
pub trait QuoteSink {
    /// Deliver one request.
    fn emit(&mut self, request: QuoteRequest);
}

impl<F: FnMut(QuoteRequest)> QuoteSink for F {
    fn emit(&mut self, request: QuoteRequest) {
        self(request);
    }
}
