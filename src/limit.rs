//! Rolling hourly request budget shared by every in-flight call.
//!
//! The window resets lazily: each check compares the current instant against
//! `window_start + 1h` and, once passed, zeroes the counter and advances the start
//! to *now* rather than the next boundary. Windows therefore drift off wall-clock
//! alignment but never accumulate skew. All methods are synchronous and contain no
//! suspension points, so check-then-act sequences stay atomic under interleaved
//! async callers.

// self
use crate::_prelude::*;

const WINDOW: Duration = Duration::HOUR;

/// Tracks the hourly request budget for one client instance.
///
/// `check_and_reserve` gates a request before dispatch; `record_completion`
/// accounts for a dispatch that actually reached the network (retries of the same
/// logical call count separately). Server-supplied `x-ratelimit-*` hints override
/// the local bookkeeping because the remote view is authoritative.
#[derive(Debug)]
pub struct RateLimiter {
	window: Mutex<RateWindow>,
}
#[derive(Debug)]
struct RateWindow {
	window_start: OffsetDateTime,
	requests_in_window: u32,
	limit: u32,
}
impl RateWindow {
	fn roll(&mut self, now: OffsetDateTime) {
		if now >= self.window_start + WINDOW {
			self.requests_in_window = 0;
			self.window_start = now;
		}
	}

	fn reset_time(&self) -> OffsetDateTime {
		self.window_start + WINDOW
	}
}
impl RateLimiter {
	/// Creates a limiter with the given hourly budget, starting a window now.
	pub fn new(limit: u32) -> Self {
		Self::starting_at(limit, OffsetDateTime::now_utc())
	}

	/// Creates a limiter whose first window starts at the provided instant.
	pub fn starting_at(limit: u32, now: OffsetDateTime) -> Self {
		Self { window: Mutex::new(RateWindow { window_start: now, requests_in_window: 0, limit }) }
	}

	/// Gates the next request against the current window.
	///
	/// Raises [`ErrorCode::RateLimitExceeded`] with `details.limit` and
	/// `details.resetTime` once the budget is spent; otherwise the slot is
	/// reserved and the caller may dispatch.
	pub fn check_and_reserve(&self) -> Result<()> {
		self.check_and_reserve_at(OffsetDateTime::now_utc())
	}

	/// [`check_and_reserve`](Self::check_and_reserve) against an explicit instant.
	pub fn check_and_reserve_at(&self, now: OffsetDateTime) -> Result<()> {
		let mut window = self.window.lock();

		window.roll(now);

		if window.requests_in_window >= window.limit {
			return Err(Error::rate_limited(window.limit, window.reset_time()));
		}

		Ok(())
	}

	/// Accounts for one dispatch that reached the network, whatever its outcome.
	pub fn record_completion(&self) {
		self.window.lock().requests_in_window += 1;
	}

	/// Returns a point-in-time view of the current window. Pure read; safe to call
	/// concurrently with reservations.
	pub fn snapshot(&self) -> RateLimitSnapshot {
		self.snapshot_at(OffsetDateTime::now_utc())
	}

	/// [`snapshot`](Self::snapshot) against an explicit instant.
	pub fn snapshot_at(&self, now: OffsetDateTime) -> RateLimitSnapshot {
		let mut window = self.window.lock();

		window.roll(now);

		RateLimitSnapshot {
			limit: window.limit,
			remaining: window.limit.saturating_sub(window.requests_in_window),
			reset_time: window.reset_time(),
			requests_this_hour: window.requests_in_window,
		}
	}

	/// Applies `x-ratelimit-*` hints from a response; remote values win.
	pub fn apply_server_hints(
		&self,
		limit: Option<u32>,
		remaining: Option<u32>,
		reset_epoch_secs: Option<i64>,
	) {
		let mut window = self.window.lock();

		if let Some(limit) = limit {
			window.limit = limit;
		}
		if let Some(remaining) = remaining {
			window.requests_in_window = window.limit.saturating_sub(remaining);
		}
		if let Some(epoch) = reset_epoch_secs
			&& let Ok(reset) = OffsetDateTime::from_unix_timestamp(epoch)
		{
			window.window_start = reset - WINDOW;
		}
	}
}

/// Derived read-only view of the current rate window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RateLimitSnapshot {
	/// Hourly request budget.
	pub limit: u32,
	/// Requests left in the current window.
	pub remaining: u32,
	/// Instant the current window expires.
	#[serde(with = "time::serde::rfc3339")]
	pub reset_time: OffsetDateTime,
	/// Dispatches recorded in the current window.
	pub requests_this_hour: u32,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ErrorCode;

	fn epoch() -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("Failed to build test instant.")
	}

	#[test]
	fn reserve_fails_once_budget_is_spent() {
		let now = epoch();
		let limiter = RateLimiter::starting_at(3, now);

		for _ in 0..3 {
			limiter.check_and_reserve_at(now).expect("Budget should not be exhausted yet.");
			limiter.record_completion();
		}

		let err = limiter
			.check_and_reserve_at(now)
			.expect_err("Fourth reservation should exceed the budget.");

		assert_eq!(err.code, ErrorCode::RateLimitExceeded);
		assert_eq!(err.http_status, Some(429));

		let details = err.details.expect("Rate limit error should carry details.");

		assert_eq!(details["limit"], 3);
		assert!(details["resetTime"].as_str().is_some_and(|reset| !reset.is_empty()));
	}

	#[test]
	fn window_resets_after_an_hour() {
		let start = epoch();
		let limiter = RateLimiter::starting_at(1, start);

		limiter.check_and_reserve_at(start).expect("First reservation should pass.");
		limiter.record_completion();
		limiter
			.check_and_reserve_at(start + Duration::minutes(59))
			.expect_err("Budget should still be exhausted inside the window.");

		let later = start + Duration::seconds(3601);

		limiter.check_and_reserve_at(later).expect("Window should reset after one hour.");

		let snapshot = limiter.snapshot_at(later);

		assert_eq!(snapshot.requests_this_hour, 0);
		assert_eq!(snapshot.remaining, 1);
		// The fresh window starts at the observation instant, not the old boundary.
		assert_eq!(snapshot.reset_time, later + Duration::HOUR);
	}

	#[test]
	fn snapshot_reflects_reservations_and_limit() {
		let now = epoch();
		let limiter = RateLimiter::starting_at(10, now);

		limiter.record_completion();
		limiter.record_completion();

		let snapshot = limiter.snapshot_at(now);

		assert_eq!(snapshot.limit, 10);
		assert_eq!(snapshot.remaining, 8);
		assert_eq!(snapshot.requests_this_hour, 2);
		assert_eq!(snapshot.reset_time, now + Duration::HOUR);
	}

	#[test]
	fn server_hints_override_local_bookkeeping() {
		let now = epoch();
		let limiter = RateLimiter::starting_at(10, now);

		limiter.record_completion();
		limiter.apply_server_hints(Some(100), Some(40), Some((now + Duration::minutes(30)).unix_timestamp()));

		let snapshot = limiter.snapshot_at(now);

		assert_eq!(snapshot.limit, 100);
		assert_eq!(snapshot.remaining, 40);
		assert_eq!(snapshot.requests_this_hour, 60);
		assert_eq!(snapshot.reset_time, now + Duration::minutes(30));
	}
}
