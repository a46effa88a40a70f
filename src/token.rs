//! Bearer-token custody and single-flight refresh orchestration.
//!
//! The manager owns the credentials and the current token/expiry pair. Refresh is
//! the one place in the pipeline where true coordination is required: the exchange
//! suspends on the network while multiple logical calls may demand a fresh token
//! concurrently. An [`AsyncMutex`] guard plus a generation counter coalesce those
//! callers—whoever wins the guard performs the exchange, and every caller that
//! queued behind it adopts the recorded outcome (token or error) without issuing a
//! second network call.

// self
use crate::{
	_prelude::*,
	api::TokenGrant,
	error::RawFailure,
	http::{HttpTransport, Method, TransportRequest},
	obs::RefreshMetrics,
};

const REFRESH_LEAD: Duration = Duration::minutes(5);
const TOKEN_PATH: &str = "/api/auth/api-token";
const REFRESH_CONTEXT: &str = "Failed to refresh API token";

/// Holds the bearer token, decides proactive refresh timing, and exposes the
/// single-flight refresh operation.
pub struct TokenManager {
	email: Option<String>,
	password: Option<String>,
	token_url: Url,
	timeout: Duration,
	state: RwLock<TokenState>,
	refresh_guard: AsyncMutex<()>,
	metrics: Arc<RefreshMetrics>,
}
#[derive(Debug, Default)]
struct TokenState {
	token: Option<String>,
	expires_at: Option<OffsetDateTime>,
	// Bumped once per completed exchange; lets queued callers detect that the
	// refresh they were waiting for already finished.
	generation: u64,
	last_outcome: Option<Result<()>>,
}
impl TokenManager {
	/// Creates a manager for the given API base URL and optional credentials.
	pub fn new(
		base_url: &Url,
		token: Option<String>,
		email: Option<String>,
		password: Option<String>,
		timeout: Duration,
	) -> Result<Self> {
		let token_url = base_url.join(TOKEN_PATH).map_err(|e| {
			Error::new(
				ErrorCode::InvalidInput,
				format!("Base URL cannot address the token endpoint: {e}."),
			)
		})?;

		Ok(Self {
			email,
			password,
			token_url,
			timeout,
			state: RwLock::new(TokenState { token, ..Default::default() }),
			refresh_guard: AsyncMutex::new(()),
			metrics: Arc::default(),
		})
	}

	/// Returns the `Authorization` header value, if a token is held.
	pub fn auth_header(&self) -> Option<String> {
		self.state.read().token.as_ref().map(|token| format!("Bearer {token}"))
	}

	/// Returns the current bearer token, if any.
	pub fn token(&self) -> Option<String> {
		self.state.read().token.clone()
	}

	/// True when refresh credentials are configured.
	pub fn has_credentials(&self) -> bool {
		self.email.is_some() && self.password.is_some()
	}

	/// Shared counters for refresh attempts and outcomes.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}

	/// True when a token with a known expiry is inside the 5-minute lead window.
	pub fn should_refresh(&self) -> bool {
		self.should_refresh_at(OffsetDateTime::now_utc())
	}

	/// [`should_refresh`](Self::should_refresh) against an explicit instant.
	pub fn should_refresh_at(&self, now: OffsetDateTime) -> bool {
		let state = self.state.read();

		match (&state.token, state.expires_at) {
			(Some(_), Some(expires_at)) => now >= expires_at - REFRESH_LEAD,
			_ => false,
		}
	}

	/// Replaces the bearer token with an externally-issued one.
	///
	/// The expiry is cleared since nothing is known about the new token's
	/// lifetime; proactive refresh stays dormant until the next exchange reports
	/// one.
	pub fn set_token(&self, token: impl Into<String>) {
		let mut state = self.state.write();

		state.token = Some(token.into());
		state.expires_at = None;
	}

	/// Drops the token and expiry. No network effect.
	pub fn clear(&self) {
		let mut state = self.state.write();

		state.token = None;
		state.expires_at = None;
	}

	/// Exchanges the configured credentials for a fresh token, single-flight.
	///
	/// Callers that queue behind an in-flight exchange adopt its recorded outcome
	/// without a second network call. On failure the stored token and expiry are
	/// left untouched, so a stale-but-working token remains usable until cleared.
	pub async fn refresh(&self, transport: &dyn HttpTransport) -> Result<()> {
		self.metrics.record_attempt();

		let (Some(email), Some(password)) = (&self.email, &self.password) else {
			self.metrics.record_failure();

			return Err(Error::new(
				ErrorCode::Unauthorized,
				"Email and password are required for token refresh.",
			)
			.with_status(401));
		};
		let observed = self.state.read().generation;
		let _singleflight = self.refresh_guard.lock().await;

		{
			let state = self.state.read();

			if state.generation != observed {
				// The refresh this caller queued for already completed; share it.
				let outcome = state.last_outcome.clone().unwrap_or(Ok(()));

				match &outcome {
					Ok(()) => self.metrics.record_success(),
					Err(_) => self.metrics.record_failure(),
				}

				return outcome;
			}
		}

		let outcome = self.exchange(transport, email, password).await;
		let mut state = self.state.write();

		state.generation += 1;

		match outcome {
			Ok((token, expires_in)) => {
				if let Some(expires_in) = expires_in {
					state.expires_at = Some(OffsetDateTime::now_utc() + Duration::seconds(expires_in));
				}

				state.token = Some(token);
				state.last_outcome = Some(Ok(()));

				self.metrics.record_success();

				Ok(())
			},
			Err(error) => {
				state.last_outcome = Some(Err(error.clone()));

				self.metrics.record_failure();

				Err(error)
			},
		}
	}

	async fn exchange(
		&self,
		transport: &dyn HttpTransport,
		email: &str,
		password: &str,
	) -> Result<(String, Option<i64>)> {
		let request = TransportRequest {
			method: Method::Post,
			url: self.token_url.clone(),
			headers: [
				("accept".to_string(), "application/json".to_string()),
				("content-type".to_string(), "application/json".to_string()),
			]
			.into(),
			body: Some(serde_json::json!({ "email": email, "password": password })),
			timeout: Some(self.timeout),
		};
		let response = transport
			.send(request)
			.await
			.map_err(|failure| Error::normalize(RawFailure::Transport(failure), REFRESH_CONTEXT))?;

		if !response.is_success() {
			return Err(Error::normalize(
				RawFailure::Response { status: response.status, body: response.json() },
				REFRESH_CONTEXT,
			));
		}

		let deserializer = &mut serde_json::Deserializer::from_slice(&response.body);
		let grant: TokenGrant = serde_path_to_error::deserialize(deserializer)
			.map_err(|source| Error::decode(source, response.status, REFRESH_CONTEXT))?;

		match grant.token {
			Some(token) => Ok((token, grant.expires_in)),
			None => Err(Error::new(ErrorCode::InvalidToken, "Token endpoint returned no token.")
				.with_status(response.status)),
		}
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.read();

		f.debug_struct("TokenManager")
			.field("token_set", &state.token.is_some())
			.field("expires_at", &state.expires_at)
			.field("credentials_set", &self.has_credentials())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::testing::MockTransport;

	fn base_url() -> Url {
		Url::parse("https://api.example.com").expect("Failed to parse test base URL.")
	}

	fn manager(token: Option<&str>, credentials: bool) -> TokenManager {
		let (email, password) = if credentials {
			(Some("dev@example.com".to_string()), Some("secret".to_string()))
		} else {
			(None, None)
		};

		TokenManager::new(
			&base_url(),
			token.map(str::to_string),
			email,
			password,
			Duration::seconds(30),
		)
		.expect("Failed to build test token manager.")
	}

	#[test]
	fn auth_header_formats_bearer_token() {
		assert_eq!(manager(Some("tok"), false).auth_header(), Some("Bearer tok".into()));
		assert_eq!(manager(None, false).auth_header(), None);
	}

	#[test]
	fn should_refresh_requires_token_and_known_expiry() {
		let now = OffsetDateTime::now_utc();
		let tokens = manager(Some("tok"), true);

		// No expiry known yet.
		assert!(!tokens.should_refresh_at(now));

		tokens.state.write().expires_at = Some(now + Duration::minutes(10));

		assert!(!tokens.should_refresh_at(now));
		assert!(tokens.should_refresh_at(now + Duration::minutes(6)));
		assert!(tokens.should_refresh_at(now + Duration::minutes(15)));
	}

	#[test]
	fn set_token_clears_expiry() {
		let tokens = manager(Some("tok"), true);

		tokens.state.write().expires_at = Some(OffsetDateTime::now_utc());
		tokens.set_token("fresh");

		assert_eq!(tokens.token(), Some("fresh".into()));
		assert!(tokens.state.read().expires_at.is_none());
	}

	#[tokio::test]
	async fn refresh_without_credentials_is_unauthorized() {
		let transport = MockTransport::default();
		let err = manager(None, false)
			.refresh(&transport)
			.await
			.expect_err("Refresh should fail without credentials.");

		assert_eq!(err.code, ErrorCode::Unauthorized);
		assert_eq!(transport.hits(), 0);
	}

	#[tokio::test]
	async fn refresh_stores_token_and_expiry() {
		let transport = MockTransport::default();

		transport.push_json(200, serde_json::json!({ "token": "fresh", "expires_in": 3600 }));

		let tokens = manager(None, true);

		tokens.refresh(&transport).await.expect("Refresh should succeed.");

		assert_eq!(tokens.token(), Some("fresh".into()));
		assert!(tokens.state.read().expires_at.is_some());
		assert_eq!(transport.hits(), 1);
		assert_eq!(tokens.metrics().successes(), 1);
	}

	#[tokio::test]
	async fn failed_refresh_keeps_stale_token() {
		let transport = MockTransport::default();

		transport.push_json(500, serde_json::json!({ "success": false, "error": "boom" }));

		let tokens = manager(Some("stale"), true);
		let err = tokens.refresh(&transport).await.expect_err("Refresh should surface the 500.");

		assert_eq!(err.code, ErrorCode::ServerError);
		assert_eq!(tokens.token(), Some("stale".into()));
		assert_eq!(tokens.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn concurrent_refreshes_share_one_exchange() {
		let transport = MockTransport::default();

		transport.push_json(200, serde_json::json!({ "token": "only-once", "expires_in": 3600 }));

		let tokens = manager(None, true);
		// Joined in one task so the four calls interleave deterministically; the
		// mock transport suspends once per dispatch, letting the others queue on
		// the single-flight guard.
		let (a, b, c, d) = tokio::join!(
			tokens.refresh(&transport),
			tokens.refresh(&transport),
			tokens.refresh(&transport),
			tokens.refresh(&transport),
		);

		for outcome in [a, b, c, d] {
			outcome.expect("Coalesced refresh should succeed for every caller.");
		}

		assert_eq!(transport.hits(), 1);
		assert_eq!(tokens.token(), Some("only-once".into()));
	}
}
