//! Client-portal endpoints, scoped to the authenticated client.
//!
//! Unlike the management services these operate on the caller's own account:
//! the backend derives the client from the bearer token, so no identifier is
//! passed.

// self
use crate::{
	_prelude::*,
	api::{ApiResponse, ListParams},
	client::{RequestOptions, SimpleFactClient},
	http::Method,
	services::{self, budgets::Budget, clients::ClientRecord, invoices::Invoice},
};

/// Password-change payload for the portal account.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PasswordChange {
	/// Current password.
	pub current_password: String,
	/// New password.
	pub new_password: String,
	/// Confirmation of the new password; must match `new_password`.
	pub confirm_password: String,
}

/// Client-portal endpoints.
#[derive(Clone, Debug)]
pub struct PortalService {
	client: SimpleFactClient,
}
impl PortalService {
	pub(crate) fn new(client: SimpleFactClient) -> Self {
		Self { client }
	}

	/// Fetches the profile of the authenticated client.
	pub async fn profile(&self) -> Result<ClientRecord> {
		let context = "Failed to get client profile";
		let response: ApiResponse<ClientRecord> = self
			.client
			.get("/api/v1/client/profile", Some(RequestOptions::new().with_context(context)))
			.await?;

		// An empty 2xx envelope means the token maps to no portal account.
		response.data.ok_or_else(|| {
			Error::new(ErrorCode::ClientNotFound, "Client profile not found or access denied.")
				.with_status(404)
		})
	}

	/// Applies a partial update to the authenticated client's profile.
	pub async fn update_profile(&self, updates: Json) -> Result<()> {
		let context = "Failed to update client profile";

		self.client
			.put::<Json>(
				"/api/v1/client/profile",
				updates,
				Some(RequestOptions::new().with_context(context)),
			)
			.await?;

		Ok(())
	}

	/// Changes the portal password of the authenticated client.
	pub async fn change_password(&self, change: &PasswordChange) -> Result<()> {
		let context = "Failed to change password";

		if change.current_password.is_empty() {
			return Err(Error::missing_field("current_password", context));
		}
		if change.new_password.is_empty() {
			return Err(Error::missing_field("new_password", context));
		}
		if change.new_password != change.confirm_password {
			return Err(Error::new(
				ErrorCode::InvalidItem,
				format!("{context}: new password and confirmation do not match."),
			));
		}

		let body = services::encode(change, context)?;

		self.client
			.post::<Json>(
				"/api/v1/client/change-password",
				body,
				Some(RequestOptions::new().with_context(context)),
			)
			.await?;

		Ok(())
	}

	/// Lists the invoices issued to the authenticated client.
	pub async fn invoices(&self, params: &ListParams) -> Result<ApiResponse<Vec<Invoice>>> {
		let mut url = self.client.endpoint("/api/v1/client/invoices")?;

		params.append_to(&mut url);

		self.client
			.execute_at(
				Method::Get,
				url,
				None,
				Some(RequestOptions::new().with_context("Failed to list portal invoices")),
			)
			.await
	}

	/// Lists the budgets issued to the authenticated client.
	pub async fn budgets(&self, params: &ListParams) -> Result<ApiResponse<Vec<Budget>>> {
		let mut url = self.client.endpoint("/api/v1/client/budgets")?;

		params.append_to(&mut url);

		self.client
			.execute_at(
				Method::Get,
				url,
				None,
				Some(RequestOptions::new().with_context("Failed to list portal budgets")),
			)
			.await
	}

	/// Downloads a portal document as PDF.
	pub async fn download_document(&self, document_id: u64, kind: &str) -> Result<Vec<u8>> {
		let context = format!("Failed to download document {document_id}");
		let mut url =
			self.client.endpoint(&format!("/api/v1/client/documents/{document_id}/pdf"))?;

		url.query_pairs_mut().append_pair("type", kind);

		self.client
			.download_at(url, Some(RequestOptions::new().with_context(context)))
			.await
	}
}
