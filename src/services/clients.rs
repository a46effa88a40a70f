//! Client (customer) management endpoints.

// self
use crate::{
	_prelude::*,
	api::{ApiResponse, ListParams},
	client::{RequestOptions, SimpleFactClient},
	http::Method,
	services,
};

/// A client record as returned by the API.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ClientRecord {
	/// Unique identifier.
	pub id: u64,
	/// Display name.
	pub name: String,
	/// Billing email.
	pub email: String,
	/// Street address.
	#[serde(default)]
	pub address: Option<String>,
	/// City.
	#[serde(default)]
	pub city: Option<String>,
	/// Country.
	#[serde(default)]
	pub country: Option<String>,
	/// Tax identifier, passed through verbatim.
	#[serde(default)]
	pub tax_id: Option<String>,
	/// Contact phone.
	#[serde(default)]
	pub phone: Option<String>,
	/// Lifecycle status (`active`, `inactive`, `suspended`).
	#[serde(default)]
	pub status: Option<String>,
	/// Creation timestamp.
	#[serde(default)]
	pub created_at: Option<String>,
	/// Last-update timestamp.
	#[serde(default)]
	pub updated_at: Option<String>,
}

/// Fields accepted when creating a client.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ClientDraft {
	/// Display name (required).
	pub name: String,
	/// Billing email (required).
	pub email: String,
	/// Street address.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
	/// City.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub city: Option<String>,
	/// Country.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub country: Option<String>,
	/// Tax identifier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tax_id: Option<String>,
	/// Contact phone.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
}

/// Web-portal access toggle for a client.
#[derive(Clone, Debug, Serialize)]
pub struct WebAccessDraft {
	/// Whether portal access is enabled.
	pub enabled: bool,
	/// Initial portal password, when enabling.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,
}

/// Client management endpoints.
#[derive(Clone, Debug)]
pub struct ClientsService {
	client: SimpleFactClient,
}
impl ClientsService {
	pub(crate) fn new(client: SimpleFactClient) -> Self {
		Self { client }
	}

	/// Lists clients with optional filters.
	pub async fn list(&self, params: &ListParams) -> Result<ApiResponse<Vec<ClientRecord>>> {
		let mut url = self.client.endpoint("/api/v1/clients")?;

		params.append_to(&mut url);

		self.client
			.execute_at(
				Method::Get,
				url,
				None,
				Some(RequestOptions::new().with_context("Failed to list clients")),
			)
			.await
	}

	/// Fetches one client by identifier.
	pub async fn get(&self, id: u64) -> Result<ClientRecord> {
		let context = format!("Failed to get client {id}");
		let response: ApiResponse<ClientRecord> = self
			.client
			.get(
				&format!("/api/v1/clients/{id}"),
				Some(RequestOptions::new().with_context(context.clone())),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::ClientNotFound))?;

		services::require_data(response, &context)
	}

	/// Creates a client. Name and email must be present.
	pub async fn create(&self, draft: &ClientDraft) -> Result<ClientRecord> {
		let context = "Failed to create client";

		if draft.name.trim().is_empty() {
			return Err(Error::missing_field("name", context));
		}
		if draft.email.trim().is_empty() {
			return Err(Error::missing_field("email", context));
		}

		let body = services::encode(draft, context)?;
		let response: ApiResponse<ClientRecord> = self
			.client
			.post("/api/v1/clients", body, Some(RequestOptions::new().with_context(context)))
			.await?;

		services::require_data(response, context)
	}

	/// Applies a partial update to a client.
	pub async fn update(&self, id: u64, updates: Json) -> Result<ClientRecord> {
		let context = format!("Failed to update client {id}");
		let response: ApiResponse<ClientRecord> = self
			.client
			.put(
				&format!("/api/v1/clients/{id}"),
				updates,
				Some(RequestOptions::new().with_context(context.clone())),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::ClientNotFound))?;

		services::require_data(response, &context)
	}

	/// Deletes a client.
	pub async fn delete(&self, id: u64) -> Result<()> {
		let context = format!("Failed to delete client {id}");

		self.client
			.delete::<Json>(
				&format!("/api/v1/clients/{id}"),
				Some(RequestOptions::new().with_context(context)),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::ClientNotFound))?;

		Ok(())
	}

	/// Enables or disables web-portal access for a client.
	pub async fn set_web_access(&self, id: u64, draft: &WebAccessDraft) -> Result<ClientRecord> {
		let context = format!("Failed to set web access for client {id}");
		let body = services::encode(draft, &context)?;
		let response: ApiResponse<ClientRecord> = self
			.client
			.post(
				&format!("/api/v1/clients/{id}/web-access"),
				body,
				Some(RequestOptions::new().with_context(context.clone())),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::ClientNotFound))?;

		services::require_data(response, &context)
	}
}
