//! Retry policy for transient request failures.
//!
//! Backoff is linear (`base_delay * attempt`), 1-indexed, with no jitter. The
//! policy only decides; the orchestrator owns the sleep and the re-dispatch.

// self
use crate::_prelude::*;

/// Decides, given a normalized error and an attempt count, whether to retry and how
/// long to wait first.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
	/// Maximum number of transport dispatches per logical call.
	pub max_attempts: u32,
	/// Base delay; attempt `n` waits `base_delay * n` before re-dispatching.
	pub base_delay: Duration,
}
impl RetryPolicy {
	/// Creates a policy with the given attempt budget and base delay.
	pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
		Self { max_attempts, base_delay }
	}

	/// True for failures worth re-dispatching: transport errors with no response,
	/// or responses with status `>=500`, `408`, or `429`.
	pub fn is_retryable(&self, error: &Error) -> bool {
		match error.http_status {
			None => error.code == ErrorCode::NetworkError,
			Some(status) => status >= 500 || status == 408 || status == 429,
		}
	}

	/// True when `error` is retryable and the 1-indexed `attempt` leaves budget.
	pub fn should_retry(&self, error: &Error, attempt: u32) -> bool {
		self.is_retryable(error) && attempt < self.max_attempts
	}

	/// Linear backoff before the attempt following `attempt` (1-indexed).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		self.base_delay * i32::try_from(attempt.max(1)).unwrap_or(i32::MAX)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn policy() -> RetryPolicy {
		RetryPolicy::new(3, Duration::milliseconds(100))
	}

	fn status_error(status: u16) -> Error {
		use crate::error::RawFailure;

		Error::normalize(RawFailure::Response { status, body: None }, "Request failed")
	}

	#[test]
	fn network_and_transient_statuses_are_retryable() {
		let policy = policy();
		let network = Error::normalize(
			crate::error::RawFailure::Transport(crate::http::TransportFailure::Io(
				std::io::Error::other("reset"),
			)),
			"Request failed",
		);

		assert!(policy.is_retryable(&network));
		assert!(policy.is_retryable(&status_error(500)));
		assert!(policy.is_retryable(&status_error(503)));
		assert!(policy.is_retryable(&status_error(408)));
		assert!(policy.is_retryable(&status_error(429)));
	}

	#[test]
	fn client_errors_are_terminal() {
		let policy = policy();

		assert!(!policy.is_retryable(&status_error(400)));
		assert!(!policy.is_retryable(&status_error(401)));
		assert!(!policy.is_retryable(&status_error(404)));
	}

	#[test]
	fn should_retry_respects_the_attempt_budget() {
		let policy = policy();
		let error = status_error(503);

		assert!(policy.should_retry(&error, 1));
		assert!(policy.should_retry(&error, 2));
		assert!(!policy.should_retry(&error, 3));
	}

	#[test]
	fn backoff_grows_linearly() {
		let policy = policy();

		assert_eq!(policy.delay_for(1), Duration::milliseconds(100));
		assert_eq!(policy.delay_for(2), Duration::milliseconds(200));
		assert_eq!(policy.delay_for(3), Duration::milliseconds(300));
	}
}
