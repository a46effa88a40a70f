//! Invoice endpoints.

// self
use crate::{
	_prelude::*,
	api::{ApiResponse, ListParams},
	client::{RequestOptions, SimpleFactClient},
	http::Method,
	services::{self, budgets::LineItem},
};

/// An invoice record as returned by the API.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Invoice {
	/// Unique identifier.
	pub id: u64,
	/// Human-facing invoice number.
	#[serde(default)]
	pub invoice_number: Option<String>,
	/// Owning client identifier.
	pub client_id: u64,
	/// Budget this invoice was converted from, when applicable.
	#[serde(default)]
	pub budget_id: Option<u64>,
	/// Issue date (`YYYY-MM-DD`).
	#[serde(default)]
	pub issue_date: Option<String>,
	/// Due date (`YYYY-MM-DD`).
	#[serde(default)]
	pub due_date: Option<String>,
	/// Lifecycle status (`draft`, `sent`, `viewed`, `paid`, `overdue`, `cancelled`).
	#[serde(default)]
	pub status: Option<String>,
	/// Gross total.
	#[serde(default)]
	pub total: Option<f64>,
	/// Amount already paid.
	#[serde(default)]
	pub paid_amount: Option<f64>,
	/// Amount still owed.
	#[serde(default)]
	pub remaining_amount: Option<f64>,
	/// Line items.
	#[serde(default)]
	pub items: Vec<LineItem>,
	/// Free-form notes.
	#[serde(default)]
	pub notes: Option<String>,
}

/// Fields accepted when creating an invoice.
#[derive(Clone, Debug, Default, Serialize)]
pub struct InvoiceDraft {
	/// Owning client identifier (required).
	pub client_id: u64,
	/// Issue date (`YYYY-MM-DD`).
	pub issue_date: String,
	/// Due date (`YYYY-MM-DD`).
	pub due_date: String,
	/// Line items (at least one required).
	pub items: Vec<LineItem>,
	/// Free-form notes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Payment terms shown on the document.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payment_terms: Option<String>,
}

/// Invoice endpoints.
#[derive(Clone, Debug)]
pub struct InvoicesService {
	client: SimpleFactClient,
}
impl InvoicesService {
	pub(crate) fn new(client: SimpleFactClient) -> Self {
		Self { client }
	}

	/// Lists invoices with optional filters.
	pub async fn list(&self, params: &ListParams) -> Result<ApiResponse<Vec<Invoice>>> {
		let mut url = self.client.endpoint("/api/v1/invoices")?;

		params.append_to(&mut url);

		self.client
			.execute_at(
				Method::Get,
				url,
				None,
				Some(RequestOptions::new().with_context("Failed to list invoices")),
			)
			.await
	}

	/// Fetches one invoice by identifier.
	pub async fn get(&self, id: u64) -> Result<Invoice> {
		let context = format!("Failed to get invoice {id}");
		let response: ApiResponse<Invoice> = self
			.client
			.get(
				&format!("/api/v1/invoices/{id}"),
				Some(RequestOptions::new().with_context(context.clone())),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::InvoiceNotFound))?;

		services::require_data(response, &context)
	}

	/// Creates an invoice. Requires a client identifier and at least one item.
	pub async fn create(&self, draft: &InvoiceDraft) -> Result<Invoice> {
		let context = "Failed to create invoice";

		if draft.client_id == 0 {
			return Err(Error::missing_field("client_id", context));
		}
		if draft.items.is_empty() {
			return Err(Error::new(
				ErrorCode::NoItems,
				format!("{context}: an invoice requires at least one line item."),
			));
		}

		let body = services::encode(draft, context)?;
		let response: ApiResponse<Invoice> = self
			.client
			.post("/api/v1/invoices", body, Some(RequestOptions::new().with_context(context)))
			.await?;

		services::require_data(response, context)
	}

	/// Applies a partial update to an invoice.
	pub async fn update(&self, id: u64, updates: Json) -> Result<Invoice> {
		let context = format!("Failed to update invoice {id}");
		let response: ApiResponse<Invoice> = self
			.client
			.put(
				&format!("/api/v1/invoices/{id}"),
				updates,
				Some(RequestOptions::new().with_context(context.clone())),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::InvoiceNotFound))?;

		services::require_data(response, &context)
	}

	/// Transitions an invoice to a new lifecycle status.
	pub async fn update_status(&self, id: u64, status: &str) -> Result<Invoice> {
		let context = format!("Failed to update status of invoice {id}");
		let response: ApiResponse<Invoice> = self
			.client
			.put(
				&format!("/api/v1/invoices/{id}/status"),
				serde_json::json!({ "status": status }),
				Some(RequestOptions::new().with_context(context.clone())),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::InvoiceNotFound))?;

		services::require_data(response, &context)
	}

	/// Downloads the rendered PDF for an invoice.
	pub async fn download_pdf(&self, id: u64) -> Result<Vec<u8>> {
		let context = format!("Failed to download PDF for invoice {id}");

		self.client
			.download(
				&format!("/api/v1/invoices/{id}/pdf"),
				Some(RequestOptions::new().with_context(context)),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::InvoiceNotFound))
	}

	/// Downloads the Facturae XML for an invoice.
	pub async fn download_xml(&self, id: u64) -> Result<Vec<u8>> {
		let context = format!("Failed to download XML for invoice {id}");

		self.client
			.download(
				&format!("/api/v1/invoices/{id}/xml"),
				Some(RequestOptions::new().with_context(context)),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::InvoiceNotFound))
	}

	/// Deletes an invoice.
	pub async fn delete(&self, id: u64) -> Result<()> {
		let context = format!("Failed to delete invoice {id}");

		self.client
			.delete::<Json>(
				&format!("/api/v1/invoices/{id}"),
				Some(RequestOptions::new().with_context(context)),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::InvoiceNotFound))?;

		Ok(())
	}
}
