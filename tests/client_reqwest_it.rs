#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::Duration;
// self
use simplefact::{
	api::{HealthStatus, ListParams},
	client::{Config, SimpleFactClient},
	error::ErrorCode,
	services::clients::ClientDraft,
	url::Url,
};

fn client_for(server: &MockServer) -> SimpleFactClient {
	let base_url =
		Url::parse(&server.base_url()).expect("Mock server URL should parse successfully.");

	SimpleFactClient::new(
		Config::new(base_url)
			.with_api_token("test-token")
			.with_retry(1, Duration::milliseconds(10)),
	)
	.expect("Failed to build reqwest-backed test client.")
}

#[tokio::test]
async fn budget_fetch_round_trips_over_http() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v1/budgets/5")
				.header("authorization", "Bearer test-token");
			then.status(200).header("content-type", "application/json").body(
				r#"{"success":true,"data":{"id":5,"client_id":2,"budget_number":"B-2026-005","status":"pending","total":1210.0,"items":[]}}"#,
			);
		})
		.await;
	let client = client_for(&server);
	let budget = client.budgets().get(5).await.expect("Budget fetch should succeed over HTTP.");

	mock.assert_async().await;

	assert_eq!(budget.id, 5);
	assert_eq!(budget.status.as_deref(), Some("pending"));
	assert_eq!(budget.total, Some(1210.0));
}

#[tokio::test]
async fn list_filters_are_sent_as_query_parameters() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v1/invoices")
				.query_param("page", "2")
				.query_param("status", "paid");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"success":true,"data":[],"meta":{"page":2,"per_page":20,"total":0,"total_pages":0,"has_next":false,"has_prev":true}}"#);
		})
		.await;
	let client = client_for(&server);
	let response = client
		.invoices()
		.list(&ListParams::new().with_page(2).with_status("paid"))
		.await
		.expect("Invoice listing should succeed.");

	mock.assert_async().await;

	assert!(response.success);
	assert!(response.meta.is_some_and(|meta| meta.page == 2));
}

#[tokio::test]
async fn client_creation_posts_the_draft_as_json() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v1/clients")
				.json_body(json!({ "name": "Acme SL", "email": "billing@acme.example" }));
			then.status(201).header("content-type", "application/json").body(
				r#"{"success":true,"data":{"id":11,"name":"Acme SL","email":"billing@acme.example"}}"#,
			);
		})
		.await;
	let client = client_for(&server);
	let created = client
		.clients()
		.create(&ClientDraft {
			name: "Acme SL".into(),
			email: "billing@acme.example".into(),
			..Default::default()
		})
		.await
		.expect("Client creation should succeed.");

	mock.assert_async().await;

	assert_eq!(created.id, 11);
}

#[tokio::test]
async fn token_exchange_posts_credentials_and_stores_the_grant() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/api-token")
				.json_body(json!({ "email": "dev@example.com", "password": "secret" }));
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"token":"issued-token","expires_in":3600}"#);
		})
		.await;
	let base_url =
		Url::parse(&server.base_url()).expect("Mock server URL should parse successfully.");
	let client =
		SimpleFactClient::new(Config::new(base_url).with_credentials("dev@example.com", "secret"))
			.expect("Failed to build reqwest-backed test client.");

	client.refresh_token().await.expect("Token exchange should succeed.");
	mock.assert_async().await;

	assert_eq!(client.api_token(), Some("issued-token".into()));
}

#[tokio::test]
async fn backend_error_codes_surface_in_the_normalized_error() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/budgets/9/convert");
			then.status(400).header("content-type", "application/json").body(
				r#"{"success":false,"error":"Budget has already been invoiced.","code":"BUDGET_ALREADY_INVOICED"}"#,
			);
		})
		.await;
	let client = client_for(&server);
	let err = client
		.budgets()
		.convert_to_invoice(9)
		.await
		.expect_err("Conversion of an invoiced budget should fail.");

	assert_eq!(err.code, ErrorCode::BudgetAlreadyInvoiced);
	assert_eq!(err.http_status, Some(400));
	assert_eq!(err.message, "Budget has already been invoiced.");
}

#[tokio::test]
async fn health_check_reads_the_probe_endpoint() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/health");
			then.status(200).header("content-type", "application/json").body(
				r#"{"success":true,"data":{"status":"healthy","timestamp":"2026-08-27T10:00:00Z"}}"#,
			);
		})
		.await;
	let client = client_for(&server);
	let health = client.health_check().await;

	assert_eq!(health.status, HealthStatus::Healthy);
	assert_eq!(health.timestamp, "2026-08-27T10:00:00Z");
}
