//! Scripted [`HttpTransport`] for deterministic tests.
//!
//! [`MockTransport`] replays a queue of canned outcomes and records every request
//! it saw, including the instant of dispatch, so tests can assert on retry counts,
//! backoff spacing, and header contents without a network. It is shipped (rather
//! than hidden behind `cfg(test)`) so downstream crates can exercise their own
//! service wrappers against the same request contract.

// std
use std::collections::VecDeque;
// self
use crate::{
	_prelude::*,
	http::{HttpTransport, Method, TransportFailure, TransportFuture, TransportRequest, TransportResponse},
};

/// One request observed by the mock, with its dispatch instant.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL that was requested.
	pub url: Url,
	/// Headers as handed to the transport.
	pub headers: BTreeMap<String, String>,
	/// JSON body, when one was attached.
	pub body: Option<Json>,
	/// Instant the mock received the request.
	pub at: OffsetDateTime,
}

/// Scripted transport replaying queued outcomes in order.
///
/// Each dispatch yields to the scheduler once before resolving so that
/// interleavings (for example several callers racing toward the single-flight
/// refresh guard) actually occur under a cooperative test executor. An exhausted
/// script resolves as a transport failure rather than panicking.
#[derive(Debug, Default)]
pub struct MockTransport {
	script: Mutex<VecDeque<Result<TransportResponse, TransportFailure>>>,
	log: Mutex<Vec<RecordedRequest>>,
}
impl MockTransport {
	/// Queues a JSON response with the given status.
	pub fn push_json(&self, status: u16, body: Json) {
		self.push_response(TransportResponse {
			status,
			headers: [("content-type".to_string(), "application/json".to_string())].into(),
			body: body.to_string().into_bytes(),
		});
	}

	/// Queues a raw response.
	pub fn push_response(&self, response: TransportResponse) {
		self.script.lock().push_back(Ok(response));
	}

	/// Queues a transport failure.
	pub fn push_failure(&self, failure: TransportFailure) {
		self.script.lock().push_back(Err(failure));
	}

	/// Queues a generic network failure.
	pub fn push_network_failure(&self) {
		self.push_failure(TransportFailure::Io(std::io::Error::other("connection refused")));
	}

	/// Returns every request observed so far.
	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.log.lock().clone()
	}

	/// Returns the number of requests observed so far.
	pub fn hits(&self) -> usize {
		self.log.lock().len()
	}
}
impl HttpTransport for MockTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		self.log.lock().push(RecordedRequest {
			method: request.method,
			url: request.url,
			headers: request.headers,
			body: request.body,
			at: OffsetDateTime::now_utc(),
		});

		let next = self.script.lock().pop_front();

		Box::pin(async move {
			tokio::task::yield_now().await;

			next.unwrap_or_else(|| {
				Err(TransportFailure::Io(std::io::Error::other("MockTransport script exhausted.")))
			})
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn mock_replays_outcomes_in_order_and_records_requests() {
		let transport = MockTransport::default();

		transport.push_json(200, serde_json::json!({ "success": true }));
		transport.push_network_failure();

		let request = TransportRequest {
			method: Method::Get,
			url: Url::parse("https://api.example.com/api/health")
				.expect("Failed to parse test URL."),
			headers: BTreeMap::new(),
			body: None,
			timeout: None,
		};
		let first = transport.send(request.clone()).await.expect("First outcome should be Ok.");

		assert_eq!(first.status, 200);
		transport.send(request.clone()).await.expect_err("Second outcome should be a failure.");
		transport.send(request).await.expect_err("Exhausted script should fail, not panic.");
		assert_eq!(transport.hits(), 3);
		assert_eq!(transport.requests()[0].method, Method::Get);
	}
}
