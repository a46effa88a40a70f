// std
use std::sync::Arc;
// crates.io
use serde_json::{Value as Json, json};
use time::Duration;
// self
use simplefact::{
	api::HealthStatus,
	client::{Config, RequestOptions, SimpleFactClient},
	error::ErrorCode,
	http::TransportResponse,
	services::{budgets::BudgetDraft, clients::ClientDraft, payments::PaymentDraft},
	testing::MockTransport,
	url::Url,
};

fn config() -> Config {
	Config::new(Url::parse("https://api.example.com").expect("Failed to parse test base URL."))
}

fn client_with(config: Config) -> (SimpleFactClient, Arc<MockTransport>) {
	let transport = Arc::new(MockTransport::default());
	let client = SimpleFactClient::with_transport(config, transport.clone())
		.expect("Failed to build test client.");

	(client, transport)
}

fn envelope(data: Json) -> Json {
	json!({ "success": true, "data": data })
}

#[tokio::test]
async fn successful_call_decodes_the_envelope_and_sends_default_headers() {
	let (client, transport) = client_with(config().with_api_token("tok"));

	transport.push_json(
		200,
		envelope(json!({ "id": 5, "client_id": 2, "budget_number": "B-2026-005", "items": [] })),
	);

	let budget = client.budgets().get(5).await.expect("Budget fetch should succeed.");

	assert_eq!(budget.id, 5);
	assert_eq!(budget.client_id, 2);
	assert_eq!(budget.budget_number.as_deref(), Some("B-2026-005"));

	let requests = transport.requests();

	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].url.path(), "/api/v1/budgets/5");
	assert_eq!(requests[0].headers.get("authorization").map(String::as_str), Some("Bearer tok"));
	assert_eq!(requests[0].headers.get("accept").map(String::as_str), Some("application/json"));
	assert!(
		requests[0]
			.headers
			.get("user-agent")
			.is_some_and(|agent| agent.starts_with("simplefact-rs/"))
	);
}

#[tokio::test]
async fn server_errors_are_retried_up_to_the_attempt_budget() {
	let (client, transport) =
		client_with(config().with_retry(3, Duration::milliseconds(10)));

	for _ in 0..3 {
		transport.push_json(503, json!({ "success": false, "error": "upstream down" }));
	}

	let err = client
		.get::<Json>("/api/v1/clients", None)
		.await
		.expect_err("Exhausted retries should surface the last failure.");

	assert_eq!(err.code, ErrorCode::ServerError);
	assert_eq!(err.http_status, Some(503));
	assert_eq!(transport.hits(), 3);
}

#[tokio::test]
async fn backoff_between_retries_grows_linearly() {
	let (client, transport) = client_with(config().with_retry(3, Duration::milliseconds(50)));

	transport.push_json(503, json!({ "success": false }));
	transport.push_json(503, json!({ "success": false }));
	transport.push_json(200, envelope(json!({})));

	client
		.get::<Json>("/api/v1/clients", None)
		.await
		.expect("Third dispatch should succeed after two retries.");

	let requests = transport.requests();

	assert_eq!(requests.len(), 3);
	// First retry waits ~50ms, second ~100ms. Lower bounds only; the executor
	// may add slack but never shortens a sleep.
	assert!(requests[1].at - requests[0].at >= Duration::milliseconds(45));
	assert!(requests[2].at - requests[1].at >= Duration::milliseconds(90));
}

#[tokio::test]
async fn network_failures_are_retried_then_succeed() {
	let (client, transport) = client_with(config().with_retry(2, Duration::milliseconds(50)));

	transport.push_network_failure();
	transport.push_json(200, envelope(json!({})));

	client
		.get::<Json>("/api/v1/invoices", None)
		.await
		.expect("Second dispatch should succeed after a network failure.");

	let requests = transport.requests();

	assert_eq!(requests.len(), 2);
	assert!(requests[1].at - requests[0].at >= Duration::milliseconds(45));
}

#[tokio::test]
async fn stale_token_triggers_one_refresh_and_redispatch() {
	let (client, transport) = client_with(
		config()
			.with_api_token("stale")
			.with_credentials("dev@example.com", "secret")
			.with_retry(1, Duration::milliseconds(10)),
	);

	transport.push_json(401, json!({ "success": false, "error": "token expired" }));
	transport.push_json(200, json!({ "token": "fresh", "expires_in": 3600 }));
	transport.push_json(200, envelope(json!({})));

	client
		.get::<Json>("/api/v1/clients", None)
		.await
		.expect("Re-dispatch with the fresh token should succeed.");

	let requests = transport.requests();

	assert_eq!(requests.len(), 3);
	assert_eq!(requests[1].url.path(), "/api/auth/api-token");
	assert_eq!(requests[2].headers.get("authorization").map(String::as_str), Some("Bearer fresh"));
	assert_eq!(client.api_token(), Some("fresh".into()));
}

#[tokio::test]
async fn second_401_after_reauthentication_is_terminal() {
	let (client, transport) = client_with(
		config().with_api_token("stale").with_credentials("dev@example.com", "secret"),
	);

	transport.push_json(401, json!({ "success": false }));
	transport.push_json(200, json!({ "token": "fresh", "expires_in": 3600 }));
	transport.push_json(401, json!({ "success": false }));

	let err = client
		.get::<Json>("/api/v1/clients", None)
		.await
		.expect_err("A 401 after re-authentication should not loop.");

	assert_eq!(err.code, ErrorCode::Unauthorized);
	assert_eq!(transport.hits(), 3);
}

#[tokio::test]
async fn unauthorized_without_credentials_is_terminal() {
	let (client, transport) = client_with(config().with_api_token("revoked"));

	transport.push_json(401, json!({ "success": false }));

	let err = client
		.get::<Json>("/api/v1/clients", None)
		.await
		.expect_err("No credentials means no re-authentication path.");

	assert_eq!(err.code, ErrorCode::Unauthorized);
	assert_eq!(transport.hits(), 1);
}

#[tokio::test]
async fn proactive_refresh_runs_before_dispatch_inside_the_lead_window() {
	let (client, transport) =
		client_with(config().with_credentials("dev@example.com", "secret"));

	// First grant expires in 60s, inside the 5-minute lead window.
	transport.push_json(200, json!({ "token": "short-lived", "expires_in": 60 }));
	client.refresh_token().await.expect("Initial refresh should succeed.");

	transport.push_json(200, json!({ "token": "renewed", "expires_in": 3600 }));
	transport.push_json(200, envelope(json!({})));
	client
		.get::<Json>("/api/v1/clients", None)
		.await
		.expect("Call with proactive refresh should succeed.");

	let requests = transport.requests();

	assert_eq!(requests.len(), 3);
	assert_eq!(requests[1].url.path(), "/api/auth/api-token");
	assert_eq!(requests[2].headers.get("authorization").map(String::as_str), Some("Bearer renewed"));
}

#[tokio::test]
async fn exhausted_rate_budget_fails_before_dispatch() {
	let (client, transport) = client_with(config().with_rate_limit_per_hour(1));

	transport.push_json(200, envelope(json!({})));
	client.get::<Json>("/api/v1/clients", None).await.expect("First call should fit the budget.");

	let err = client
		.get::<Json>("/api/v1/clients", None)
		.await
		.expect_err("Second call should hit the local gate.");

	assert_eq!(err.code, ErrorCode::RateLimitExceeded);
	assert_eq!(err.http_status, Some(429));
	assert!(err.details.is_some_and(|details| details["limit"] == 1));
	// The gated call never reached the transport.
	assert_eq!(transport.hits(), 1);
}

#[tokio::test]
async fn rate_limit_headers_override_local_bookkeeping() {
	let (client, transport) = client_with(config());
	let reset = (time::OffsetDateTime::now_utc() + Duration::minutes(30)).unix_timestamp();

	transport.push_response(TransportResponse {
		status: 200,
		headers: [
			("content-type".to_string(), "application/json".to_string()),
			("x-ratelimit-limit".to_string(), "100".to_string()),
			("x-ratelimit-remaining".to_string(), "5".to_string()),
			("x-ratelimit-reset".to_string(), reset.to_string()),
		]
		.into(),
		body: envelope(json!({})).to_string().into_bytes(),
	});
	client.get::<Json>("/api/v1/clients", None).await.expect("Call should succeed.");

	let info = client.rate_limit_info();

	assert_eq!(info.limit, 100);
	assert_eq!(info.remaining, 5);
	assert_eq!(info.reset_time.unix_timestamp(), reset);
}

#[tokio::test]
async fn per_call_headers_win_over_config_headers_and_builtins() {
	let (client, transport) = client_with(
		config().with_header("Accept", "application/xml").with_header("X-Tenant", "config"),
	);

	transport.push_json(200, envelope(json!({})));
	client
		.get::<Json>(
			"/api/v1/clients",
			Some(RequestOptions::new().with_header("X-Tenant", "call")),
		)
		.await
		.expect("Call should succeed.");

	let headers = &transport.requests()[0].headers;

	assert_eq!(headers.get("accept").map(String::as_str), Some("application/xml"));
	assert_eq!(headers.get("x-tenant").map(String::as_str), Some("call"));
	assert_eq!(headers.get("content-type").map(String::as_str), Some("application/json"));
}

#[tokio::test]
async fn verification_requests_carry_no_authorization_header() {
	let (client, transport) = client_with(config().with_api_token("tok"));

	transport.push_json(
		200,
		envelope(json!({
			"id": 1,
			"invoice_id": 7,
			"verification_code": "VRF-001",
			"qr_code_url": "https://simplefact.example/qr/abc123",
			"public_url": "https://simplefact.example/verify/abc123",
		})),
	);

	let verification = client
		.verification()
		.verify_basic("abc123")
		.await
		.expect("Verification should succeed.");

	assert_eq!(verification.invoice_id, 7);

	let requests = transport.requests();

	assert_eq!(requests[0].url.path(), "/api/v1/verify/abc123");
	assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn empty_bodies_map_to_a_bare_success_envelope() {
	let (client, transport) = client_with(config().with_api_token("tok"));

	transport.push_response(TransportResponse { status: 204, ..Default::default() });

	let response =
		client.delete::<Json>("/api/v1/clients/9", None).await.expect("Delete should succeed.");

	assert!(response.success);
	assert!(response.data.is_none());
}

#[tokio::test]
async fn pdf_download_returns_the_raw_body() {
	let (client, transport) = client_with(config().with_api_token("tok"));

	transport.push_response(TransportResponse {
		status: 200,
		headers: [("content-type".to_string(), "application/pdf".to_string())].into(),
		body: b"%PDF-1.7 fake".to_vec(),
	});

	let bytes = client.invoices().download_pdf(3).await.expect("Download should succeed.");

	assert_eq!(bytes, b"%PDF-1.7 fake");
	assert_eq!(transport.requests()[0].url.path(), "/api/v1/invoices/3/pdf");
}

#[tokio::test]
async fn service_validation_rejects_bad_drafts_before_dispatch() {
	let (client, transport) = client_with(config().with_api_token("tok"));

	let err = client
		.payments()
		.register(&PaymentDraft { invoice_id: 1, amount: 0.0, ..Default::default() })
		.await
		.expect_err("Zero amount should be rejected locally.");

	assert_eq!(err.code, ErrorCode::InvalidAmount);

	let err = client
		.clients()
		.create(&ClientDraft { name: " ".into(), email: "a@b.example".into(), ..Default::default() })
		.await
		.expect_err("Blank name should be rejected locally.");

	assert_eq!(err.code, ErrorCode::MissingField);

	let err = client
		.budgets()
		.create(&BudgetDraft { client_id: 3, ..Default::default() })
		.await
		.expect_err("A budget without items should be rejected locally.");

	assert_eq!(err.code, ErrorCode::NoItems);
	assert_eq!(transport.hits(), 0);
}

#[tokio::test]
async fn generic_404s_are_remapped_to_the_resource_code() {
	let (client, transport) = client_with(config().with_api_token("tok"));

	transport.push_json(404, json!({ "success": false, "error": "Not found" }));

	let err = client.invoices().get(7).await.expect_err("Missing invoice should fail.");

	assert_eq!(err.code, ErrorCode::InvoiceNotFound);
	assert_eq!(err.http_status, Some(404));
	assert_eq!(transport.hits(), 1);
}

#[tokio::test]
async fn health_check_reports_the_backend_payload() {
	let (client, transport) = client_with(config());

	transport.push_json(
		200,
		envelope(json!({
			"status": "healthy",
			"timestamp": "2026-08-27T10:00:00Z",
			"services": { "api": true, "database": true, "auth": true },
		})),
	);

	let health = client.health_check().await;

	assert_eq!(health.status, HealthStatus::Healthy);
	assert!(health.services.is_some_and(|services| services.database));
}

#[tokio::test]
async fn health_check_never_fails_when_the_api_is_unreachable() {
	let (client, transport) =
		client_with(config().with_retry(1, Duration::milliseconds(10)));

	transport.push_network_failure();

	let health = client.health_check().await;

	assert_eq!(health.status, HealthStatus::Unhealthy);
	assert!(!health.timestamp.is_empty());
}
