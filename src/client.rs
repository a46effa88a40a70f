//! The main client: request orchestration over a pluggable transport.
//!
//! [`SimpleFactClient::execute`] is the single entry point used by every resource
//! service. Each logical call walks a fixed pipeline (rate-limit gate, proactive
//! token refresh, header assembly, dispatch), then either succeeds, takes the
//! one-shot 401 re-authentication path, retries under the linear backoff policy,
//! or surfaces exactly one normalized [`Error`]. The step order is not
//! configurable and there is no interceptor registration surface.

// self
use crate::{
	_prelude::*,
	api::{ApiResponse, HealthCheck, HealthStatus},
	error::RawFailure,
	http::{HttpTransport, Method, TransportRequest, TransportResponse},
	limit::{RateLimitSnapshot, RateLimiter},
	obs::{self, RefreshMetrics, RequestOutcome, RequestSpan},
	retry::RetryPolicy,
	services::{
		budgets::BudgetsService, clients::ClientsService, invoices::InvoicesService,
		payments::PaymentsService, portal::PortalService, verification::VerificationService,
	},
	token::TokenManager,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

const USER_AGENT: &str = concat!("simplefact-rs/", env!("CARGO_PKG_VERSION"));

/// Construction-time configuration for [`SimpleFactClient`].
#[derive(Clone, Debug)]
pub struct Config {
	/// Prefix for all request paths.
	pub base_url: Url,
	/// Initial bearer token, when one was issued out of band.
	pub api_token: Option<String>,
	/// Account email used for token refresh.
	pub email: Option<String>,
	/// Account password used for token refresh.
	pub password: Option<String>,
	/// Per-request transport timeout.
	pub timeout: Duration,
	/// Hourly request budget enforced locally.
	pub rate_limit_per_hour: u32,
	/// Maximum transport dispatches per logical call.
	pub retry_attempts: u32,
	/// Base delay for the linear backoff.
	pub retry_delay: Duration,
	/// Enables proactive and 401-triggered token refresh.
	pub auto_refresh_token: bool,
	/// Enables per-attempt debug events (requires the `tracing` feature).
	pub debug: bool,
	/// Static headers merged into every request.
	pub headers: BTreeMap<String, String>,
}
impl Config {
	/// Creates a configuration with the crate defaults for the given API base.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			api_token: None,
			email: None,
			password: None,
			timeout: Duration::seconds(30),
			rate_limit_per_hour: 1_000,
			retry_attempts: 3,
			retry_delay: Duration::seconds(1),
			auto_refresh_token: true,
			debug: false,
			headers: BTreeMap::new(),
		}
	}

	/// Sets the initial bearer token.
	pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
		self.api_token = Some(token.into());

		self
	}

	/// Alias for [`with_api_token`](Self::with_api_token).
	pub fn with_api_key(self, key: impl Into<String>) -> Self {
		self.with_api_token(key)
	}

	/// Sets the refresh credentials.
	pub fn with_credentials(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
		self.email = Some(email.into());
		self.password = Some(password.into());

		self
	}

	/// Overrides the per-request transport timeout (defaults to 30 seconds).
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the hourly request budget (defaults to 1000).
	pub fn with_rate_limit_per_hour(mut self, limit: u32) -> Self {
		self.rate_limit_per_hour = limit;

		self
	}

	/// Overrides the retry budget and base delay (defaults to 3 attempts, 1 second).
	pub fn with_retry(mut self, attempts: u32, base_delay: Duration) -> Self {
		self.retry_attempts = attempts;
		self.retry_delay = base_delay;

		self
	}

	/// Enables or disables automatic token refresh (defaults to enabled).
	pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
		self.auto_refresh_token = enabled;

		self
	}

	/// Enables or disables per-attempt debug events (defaults to disabled).
	pub fn with_debug(mut self, enabled: bool) -> Self {
		self.debug = enabled;

		self
	}

	/// Adds a static header sent with every request.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}
}

/// Per-call overrides accepted by [`SimpleFactClient::execute`].
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// Extra headers; these win over static and config headers on conflict.
	pub headers: BTreeMap<String, String>,
	/// Overrides the configured transport timeout for this call.
	pub timeout: Option<Duration>,
	/// Context string used in error messages (for example "Failed to get budget 5").
	pub context: Option<String>,
	/// Suppresses the `Authorization` header (public endpoints).
	pub anonymous: bool,
}
impl RequestOptions {
	/// Creates empty per-call options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a header for this call only.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Overrides the transport timeout for this call.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets the context string used in error messages for this call.
	pub fn with_context(mut self, context: impl Into<String>) -> Self {
		self.context = Some(context.into());

		self
	}

	/// Suppresses the `Authorization` header for this call.
	pub fn anonymous(mut self) -> Self {
		self.anonymous = true;

		self
	}
}

/// Typed client for the SimpleFACT invoicing API.
///
/// Cheap to clone; all clones share the same rate window, token state, and
/// transport. Resource services are constructed on demand from a clone, so no
/// ambient global registry is involved.
#[derive(Clone)]
pub struct SimpleFactClient {
	inner: Arc<ClientInner>,
}
struct ClientInner {
	config: Config,
	transport: Arc<dyn HttpTransport>,
	limiter: RateLimiter,
	tokens: TokenManager,
	retry: RetryPolicy,
}
impl SimpleFactClient {
	/// Creates a client backed by the crate's default reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn new(config: Config) -> Result<Self> {
		Self::with_transport(config, Arc::new(ReqwestTransport::default()))
	}

	/// Creates a client that dispatches through the caller-provided transport.
	pub fn with_transport(config: Config, transport: Arc<dyn HttpTransport>) -> Result<Self> {
		let tokens = TokenManager::new(
			&config.base_url,
			config.api_token.clone(),
			config.email.clone(),
			config.password.clone(),
			config.timeout,
		)?;
		let limiter = RateLimiter::new(config.rate_limit_per_hour);
		let retry = RetryPolicy::new(config.retry_attempts.max(1), config.retry_delay);

		Ok(Self { inner: Arc::new(ClientInner { config, transport, limiter, tokens, retry }) })
	}

	/// Resolves a request path against the configured base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url> {
		self.inner.config.base_url.join(path).map_err(|e| {
			Error::new(ErrorCode::InvalidInput, format!("Invalid request path `{path}`: {e}."))
		})
	}

	/// Executes a request and decodes the response envelope.
	///
	/// This is the single entry point used by every resource service; see the
	/// module docs for the pipeline the call walks through.
	pub async fn execute<T>(
		&self,
		method: Method,
		path: &str,
		body: Option<Json>,
		options: Option<RequestOptions>,
	) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		let url = self.endpoint(path)?;

		self.execute_at(method, url, body, options).await
	}

	/// [`execute`](Self::execute) against an already-resolved URL (list endpoints
	/// append their query parameters before calling this).
	pub async fn execute_at<T>(
		&self,
		method: Method,
		url: Url,
		body: Option<Json>,
		options: Option<RequestOptions>,
	) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		let options = options.unwrap_or_default();
		let context = self.context_for(&options, method, &url);
		let response = self.run(method, url, body, &options, &context).await?;

		if response.body.is_empty() {
			// Some write endpoints reply 204 with no body.
			return Ok(ApiResponse { success: response.is_success(), ..Default::default() });
		}

		let deserializer = &mut serde_json::Deserializer::from_slice(&response.body);

		serde_path_to_error::deserialize(deserializer)
			.map_err(|source| Error::decode(source, response.status, &context))
	}

	/// Executes a request and returns the raw response body (PDF/XML downloads).
	pub async fn download(&self, path: &str, options: Option<RequestOptions>) -> Result<Vec<u8>> {
		let url = self.endpoint(path)?;

		self.download_at(url, options).await
	}

	/// [`download`](Self::download) against an already-resolved URL.
	pub async fn download_at(&self, url: Url, options: Option<RequestOptions>) -> Result<Vec<u8>> {
		let options = options.unwrap_or_default();
		let context = self.context_for(&options, Method::Get, &url);
		let response = self.run(Method::Get, url, None, &options, &context).await?;

		Ok(response.body)
	}

	/// GET sugar over [`execute`](Self::execute).
	pub async fn get<T>(&self, path: &str, options: Option<RequestOptions>) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		self.execute(Method::Get, path, None, options).await
	}

	/// POST sugar over [`execute`](Self::execute).
	pub async fn post<T>(
		&self,
		path: &str,
		body: Json,
		options: Option<RequestOptions>,
	) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		self.execute(Method::Post, path, Some(body), options).await
	}

	/// PUT sugar over [`execute`](Self::execute).
	pub async fn put<T>(
		&self,
		path: &str,
		body: Json,
		options: Option<RequestOptions>,
	) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		self.execute(Method::Put, path, Some(body), options).await
	}

	/// DELETE sugar over [`execute`](Self::execute).
	pub async fn delete<T>(
		&self,
		path: &str,
		options: Option<RequestOptions>,
	) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		self.execute(Method::Delete, path, None, options).await
	}

	/// PATCH sugar over [`execute`](Self::execute).
	pub async fn patch<T>(
		&self,
		path: &str,
		body: Json,
		options: Option<RequestOptions>,
	) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		self.execute(Method::Patch, path, Some(body), options).await
	}

	/// Returns a point-in-time view of the local rate window.
	pub fn rate_limit_info(&self) -> RateLimitSnapshot {
		self.inner.limiter.snapshot()
	}

	/// Probes `/api/health`. Never fails: an unreachable or erroring API reports
	/// as unhealthy.
	pub async fn health_check(&self) -> HealthCheck {
		let timestamp = || {
			OffsetDateTime::now_utc()
				.format(&time::format_description::well_known::Rfc3339)
				.unwrap_or_default()
		};

		match self.get::<HealthCheck>("/api/health", None).await {
			Ok(response) => response.data.unwrap_or_else(|| HealthCheck {
				status: HealthStatus::Healthy,
				timestamp: timestamp(),
				services: None,
			}),
			Err(_) => HealthCheck {
				status: HealthStatus::Unhealthy,
				timestamp: timestamp(),
				services: None,
			},
		}
	}

	/// Manually triggers a token refresh (single-flight with any concurrent one).
	pub async fn refresh_token(&self) -> Result<()> {
		self.inner.tokens.refresh(self.inner.transport.as_ref()).await
	}

	/// Replaces the bearer token with an externally-issued one.
	pub fn set_api_token(&self, token: impl Into<String>) {
		self.inner.tokens.set_token(token);
	}

	/// Returns the current bearer token, if any.
	pub fn api_token(&self) -> Option<String> {
		self.inner.tokens.token()
	}

	/// Clears the bearer token and its expiry.
	pub fn clear_auth(&self) {
		self.inner.tokens.clear();
	}

	/// Shared counters for token refresh attempts and outcomes.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.inner.tokens.metrics()
	}

	/// Client management endpoints.
	pub fn clients(&self) -> ClientsService {
		ClientsService::new(self.clone())
	}

	/// Budget endpoints.
	pub fn budgets(&self) -> BudgetsService {
		BudgetsService::new(self.clone())
	}

	/// Invoice endpoints.
	pub fn invoices(&self) -> InvoicesService {
		InvoicesService::new(self.clone())
	}

	/// Payment endpoints.
	pub fn payments(&self) -> PaymentsService {
		PaymentsService::new(self.clone())
	}

	/// Invoice verification endpoints.
	pub fn verification(&self) -> VerificationService {
		VerificationService::new(self.clone())
	}

	/// Client-portal endpoints.
	pub fn portal(&self) -> PortalService {
		PortalService::new(self.clone())
	}

	fn context_for(&self, options: &RequestOptions, method: Method, url: &Url) -> String {
		options
			.context
			.clone()
			.unwrap_or_else(|| format!("Request {method} {} failed", url.path()))
	}

	async fn run(
		&self,
		method: Method,
		url: Url,
		body: Option<Json>,
		options: &RequestOptions,
		context: &str,
	) -> Result<TransportResponse> {
		let span = RequestSpan::new(method, url.path());

		span.instrument(self.run_inner(method, url, body, options, context)).await
	}

	// One logical call: INIT -> RATE_CHECK -> (TOKEN_REFRESH?) -> DISPATCH ->
	// {SUCCESS | AUTH_RETRY(once) | BACKOFF_RETRY(bounded) | FAILED}.
	async fn run_inner(
		&self,
		method: Method,
		url: Url,
		body: Option<Json>,
		options: &RequestOptions,
		context: &str,
	) -> Result<TransportResponse> {
		let inner = &self.inner;

		obs::record_request_outcome(RequestOutcome::Attempt);
		// Local gate; exhaustion is terminal and never consumes retry budget.
		inner.limiter.check_and_reserve()?;

		if inner.config.auto_refresh_token && inner.tokens.should_refresh() {
			inner.tokens.refresh(inner.transport.as_ref()).await?;
		}

		let mut attempt = 1_u32;
		let mut auth_retried = false;

		loop {
			// Rebuilt per dispatch so a refreshed token is picked up.
			let request = self.build_request(method, url.clone(), body.clone(), options);

			obs::debug_attempt(inner.config.debug, method, &url, attempt);

			let outcome = inner.transport.send(request).await;

			// The dispatch reached the network whatever the outcome.
			inner.limiter.record_completion();

			let error = match outcome {
				Ok(response) if response.is_success() => {
					obs::debug_response(inner.config.debug, response.status, attempt);
					self.sync_rate_hints(&response);
					obs::record_request_outcome(RequestOutcome::Success);

					return Ok(response);
				},
				Ok(response) => {
					obs::debug_response(inner.config.debug, response.status, attempt);

					if response.status == 401 && inner.config.auto_refresh_token && !auth_retried {
						// A stale token is not a transient fault; one forced
						// refresh and one re-dispatch, outside the retry budget.
						auth_retried = true;

						obs::record_request_outcome(RequestOutcome::AuthRetry);
						inner.tokens.refresh(inner.transport.as_ref()).await?;
						inner.limiter.check_and_reserve()?;

						continue;
					}

					Error::normalize(
						RawFailure::Response { status: response.status, body: response.json() },
						context,
					)
				},
				Err(failure) => Error::normalize(RawFailure::Transport(failure), context),
			};

			if inner.retry.should_retry(&error, attempt) {
				obs::record_request_outcome(RequestOutcome::Retry);
				tokio::time::sleep(inner.retry.delay_for(attempt).try_into().unwrap_or_default())
					.await;

				attempt += 1;

				continue;
			}

			obs::record_request_outcome(RequestOutcome::Failure);

			return Err(error);
		}
	}

	fn build_request(
		&self,
		method: Method,
		url: Url,
		body: Option<Json>,
		options: &RequestOptions,
	) -> TransportRequest {
		let inner = &self.inner;
		let mut headers: BTreeMap<String, String> = [
			("accept".to_string(), "application/json".to_string()),
			("content-type".to_string(), "application/json".to_string()),
			("user-agent".to_string(), USER_AGENT.to_string()),
		]
		.into();

		if !options.anonymous
			&& let Some(authorization) = inner.tokens.auth_header()
		{
			headers.insert("authorization".to_string(), authorization);
		}
		// Later inserts win: config statics override the built-ins, per-call
		// headers override everything.
		for (name, value) in &inner.config.headers {
			headers.insert(name.to_lowercase(), value.clone());
		}
		for (name, value) in &options.headers {
			headers.insert(name.to_lowercase(), value.clone());
		}

		TransportRequest {
			method,
			url,
			headers,
			body,
			timeout: Some(options.timeout.unwrap_or(inner.config.timeout)),
		}
	}

	fn sync_rate_hints(&self, response: &TransportResponse) {
		let parse_u32 = |name: &str| response.header(name).and_then(|value| value.parse().ok());
		let limit = parse_u32("x-ratelimit-limit");
		let remaining = parse_u32("x-ratelimit-remaining");
		let reset = response.header("x-ratelimit-reset").and_then(|value| value.parse().ok());

		if limit.is_some() || remaining.is_some() || reset.is_some() {
			self.inner.limiter.apply_server_hints(limit, remaining, reset);
		}
	}
}
impl Debug for SimpleFactClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SimpleFactClient")
			.field("base_url", &self.inner.config.base_url.as_str())
			.field("auto_refresh_token", &self.inner.config.auto_refresh_token)
			.field("rate_limit_per_hour", &self.inner.config.rate_limit_per_hour)
			.field("tokens", &self.inner.tokens)
			.finish()
	}
}
