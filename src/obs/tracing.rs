// self
use crate::{_prelude::*, http::Method};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder covering one logical request through the pipeline.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the request method + path.
	pub fn new(method: Method, path: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("simplefact.request", method = method.as_str(), path);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, path);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a per-attempt debug event when the client's `debug` flag is set.
pub fn debug_attempt(debug: bool, method: Method, url: &Url, attempt: u32) {
	#[cfg(feature = "tracing")]
	{
		if debug {
			tracing::debug!(method = method.as_str(), url = %url, attempt, "dispatching request");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (debug, method, url, attempt);
	}
}

/// Emits a response debug event when the client's `debug` flag is set.
pub fn debug_response(debug: bool, status: u16, attempt: u32) {
	#[cfg(feature = "tracing")]
	{
		if debug {
			tracing::debug!(status, attempt, "received response");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (debug, status, attempt);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_passes_the_future_through() {
		let span = RequestSpan::new(Method::Get, "/api/health");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
