// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::RequestOutcome;

/// Records a request outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("simplefact_request_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Thread-safe counters for token refresh attempts.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of refresh attempts (including coalesced callers).
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that resolved with a token.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that resolved with an error.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_request_outcome_noop_without_metrics() {
		record_request_outcome(RequestOutcome::Failure);
	}

	#[test]
	fn refresh_metrics_count_independently() {
		let metrics = RefreshMetrics::default();

		metrics.record_attempt();
		metrics.record_attempt();
		metrics.record_success();
		metrics.record_failure();

		assert_eq!(metrics.attempts(), 2);
		assert_eq!(metrics.successes(), 1);
		assert_eq!(metrics.failures(), 1);
	}
}
