//! Budget (quote) endpoints.

// self
use crate::{
	_prelude::*,
	api::{ApiResponse, ListParams},
	client::{RequestOptions, SimpleFactClient},
	http::Method,
	services,
};

/// A budget record as returned by the API.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Budget {
	/// Unique identifier.
	pub id: u64,
	/// Human-facing budget number.
	#[serde(default)]
	pub budget_number: Option<String>,
	/// Owning client identifier.
	pub client_id: u64,
	/// Issue date (`YYYY-MM-DD`).
	#[serde(default)]
	pub issue_date: Option<String>,
	/// Expiry date (`YYYY-MM-DD`).
	#[serde(default)]
	pub expiry_date: Option<String>,
	/// Lifecycle status (`pending`, `approved`, `rejected`, `expired`, `invoiced`).
	#[serde(default)]
	pub status: Option<String>,
	/// Gross total.
	#[serde(default)]
	pub total: Option<f64>,
	/// Line items.
	#[serde(default)]
	pub items: Vec<LineItem>,
	/// Free-form notes.
	#[serde(default)]
	pub notes: Option<String>,
}

/// One line on a budget or invoice.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LineItem {
	/// Item identifier, when persisted.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<u64>,
	/// Description.
	pub description: String,
	/// Quantity.
	pub quantity: f64,
	/// Unit price before tax.
	pub unit_price: f64,
	/// Tax rate percentage.
	pub tax_rate: f64,
}

/// Fields accepted when creating a budget.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BudgetDraft {
	/// Owning client identifier (required).
	pub client_id: u64,
	/// Issue date (`YYYY-MM-DD`).
	pub issue_date: String,
	/// Expiry date (`YYYY-MM-DD`).
	pub expiry_date: String,
	/// Line items (at least one required).
	pub items: Vec<LineItem>,
	/// Free-form notes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

/// Result of converting a budget into an invoice.
#[derive(Clone, Debug, Deserialize)]
pub struct BudgetConversion {
	/// Identifier of the created invoice.
	pub invoice_id: u64,
	/// Human-facing number of the created invoice.
	pub invoice_number: String,
}

/// Budget endpoints.
#[derive(Clone, Debug)]
pub struct BudgetsService {
	client: SimpleFactClient,
}
impl BudgetsService {
	pub(crate) fn new(client: SimpleFactClient) -> Self {
		Self { client }
	}

	/// Lists budgets with optional filters.
	pub async fn list(&self, params: &ListParams) -> Result<ApiResponse<Vec<Budget>>> {
		let mut url = self.client.endpoint("/api/v1/budgets")?;

		params.append_to(&mut url);

		self.client
			.execute_at(
				Method::Get,
				url,
				None,
				Some(RequestOptions::new().with_context("Failed to list budgets")),
			)
			.await
	}

	/// Fetches one budget by identifier.
	pub async fn get(&self, id: u64) -> Result<Budget> {
		let context = format!("Failed to get budget {id}");
		let response: ApiResponse<Budget> = self
			.client
			.get(
				&format!("/api/v1/budgets/{id}"),
				Some(RequestOptions::new().with_context(context.clone())),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::BudgetNotFound))?;

		services::require_data(response, &context)
	}

	/// Creates a budget. Requires a client identifier and at least one item.
	pub async fn create(&self, draft: &BudgetDraft) -> Result<Budget> {
		let context = "Failed to create budget";

		if draft.client_id == 0 {
			return Err(Error::missing_field("client_id", context));
		}
		if draft.items.is_empty() {
			return Err(Error::new(
				ErrorCode::NoItems,
				format!("{context}: a budget requires at least one line item."),
			));
		}

		let body = services::encode(draft, context)?;
		let response: ApiResponse<Budget> = self
			.client
			.post("/api/v1/budgets", body, Some(RequestOptions::new().with_context(context)))
			.await?;

		services::require_data(response, context)
	}

	/// Applies a partial update to a budget.
	pub async fn update(&self, id: u64, updates: Json) -> Result<Budget> {
		let context = format!("Failed to update budget {id}");
		let response: ApiResponse<Budget> = self
			.client
			.put(
				&format!("/api/v1/budgets/{id}"),
				updates,
				Some(RequestOptions::new().with_context(context.clone())),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::BudgetNotFound))?;

		services::require_data(response, &context)
	}

	/// Marks a budget as approved.
	pub async fn approve(&self, id: u64) -> Result<Budget> {
		self.update(id, serde_json::json!({ "status": "approved" })).await
	}

	/// Marks a budget as rejected.
	pub async fn reject(&self, id: u64) -> Result<Budget> {
		self.update(id, serde_json::json!({ "status": "rejected" })).await
	}

	/// Deletes a budget.
	pub async fn delete(&self, id: u64) -> Result<()> {
		let context = format!("Failed to delete budget {id}");

		self.client
			.delete::<Json>(
				&format!("/api/v1/budgets/{id}"),
				Some(RequestOptions::new().with_context(context)),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::BudgetNotFound))?;

		Ok(())
	}

	/// Converts a budget into an invoice.
	///
	/// Business failures (`BUDGET_ALREADY_INVOICED`, `NO_ITEMS`) pass through from
	/// the backend body untouched.
	pub async fn convert_to_invoice(&self, id: u64) -> Result<BudgetConversion> {
		let context = format!("Failed to convert budget {id} to invoice");
		let response: ApiResponse<BudgetConversion> = self
			.client
			.post(
				&format!("/api/v1/budgets/{id}/convert"),
				Json::Null,
				Some(RequestOptions::new().with_context(context.clone())),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::BudgetNotFound))?;

		services::require_data(response, &context)
	}
}
