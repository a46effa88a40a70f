//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `simplefact.request` with the
//!   `method` and `path` fields, plus per-attempt debug events when the client's
//!   `debug` flag is set.
//! - Enable `metrics` to increment the `simplefact_request_total` counter for every
//!   attempt/success/retry/failure, labeled by `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each request attempt.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RequestOutcome {
	/// Entry to the request pipeline.
	Attempt,
	/// Successful completion.
	Success,
	/// Backoff retry scheduled.
	Retry,
	/// One-shot re-authentication retry triggered by a 401.
	AuthRetry,
	/// Failure propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Retry => "retry",
			RequestOutcome::AuthRetry => "auth_retry",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
