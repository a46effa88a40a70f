//! Transport primitives for the request pipeline.
//!
//! The module exposes [`HttpTransport`], the crate's only dependency on an HTTP
//! stack. The orchestrator hands every dispatch to an implementation and treats any
//! response carrying a status as `Ok`—only failures where no response was received
//! at all surface as [`TransportFailure`], which the normalizer maps to
//! [`ErrorCode::NetworkError`](crate::error::ErrorCode::NetworkError). A
//! reqwest-backed implementation ships behind the `reqwest` feature; tests and
//! downstream crates can substitute [`MockTransport`](crate::testing::MockTransport)
//! or their own implementation.

// self
use crate::_prelude::*;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportFailure>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing API requests.
///
/// Implementations must be `Send + Sync` so a single client instance can serve
/// interleaved calls; the returned future must be `Send` so callers can box it
/// across executor hops. Timeouts are enforced by the transport and reported as
/// [`TransportFailure::Timeout`], which the retry policy treats as transient.
pub trait HttpTransport
where
	Self: Send + Sync,
{
	/// Dispatches the request, resolving with the response or a transport failure.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// HTTP methods supported by the API surface.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
	/// GET.
	Get,
	/// POST.
	Post,
	/// PUT.
	Put,
	/// DELETE.
	Delete,
	/// PATCH.
	Patch,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Delete => "DELETE",
			Self::Patch => "PATCH",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A fully-built outbound request handed to the transport.
///
/// Ephemeral: the orchestrator rebuilds one per dispatch so a refreshed bearer
/// token is always picked up on auth retries.
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Header map; keys are sent as provided.
	pub headers: BTreeMap<String, String>,
	/// JSON body, when the call carries one.
	pub body: Option<Json>,
	/// Per-request timeout; `None` defers to the transport's default.
	pub timeout: Option<Duration>,
}

/// A response received from the transport, regardless of status.
#[derive(Clone, Debug, Default)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lowercase keys.
	pub headers: BTreeMap<String, String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Returns true for 2xx statuses.
	pub const fn is_success(&self) -> bool {
		self.status >= 200 && self.status < 300
	}

	/// Returns the header value for a lowercase name, if present.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).map(String::as_str)
	}

	/// Parses the body as JSON, if it is valid JSON at all.
	pub fn json(&self) -> Option<Json> {
		serde_json::from_slice(&self.body).ok()
	}
}

/// Transport-level failures (no HTTP response was received).
#[derive(Debug, ThisError)]
pub enum TransportFailure {
	/// Underlying HTTP client reported a network failure (DNS, TCP, TLS).
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its timeout before a response arrived.
	#[error("Request timed out before a response was received.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportFailure {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Per-request timeouts from the pipeline override the inner client's default.
/// Redirects follow reqwest's default policy; the API serves results directly.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Delete => reqwest::Method::DELETE,
				Method::Patch => reqwest::Method::PATCH,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = &request.body {
				builder = builder.json(body);
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout.try_into().unwrap_or_default());
			}

			let response = builder.send().await.map_err(|e| {
				if e.is_timeout() {
					TransportFailure::timeout(e)
				} else {
					TransportFailure::network(e)
				}
			})?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
				})
				.collect();
			let body = response.bytes().await.map_err(TransportFailure::network)?.to_vec();

			Ok(TransportResponse { status, headers, body })
		})
	}
}
