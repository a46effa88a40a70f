//! Payment endpoints, scoped under their owning invoice.

// self
use crate::{
	_prelude::*,
	api::ApiResponse,
	client::{RequestOptions, SimpleFactClient},
	http::Method,
	services,
};

/// A payment record as returned by the API.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Payment {
	/// Unique identifier.
	pub id: u64,
	/// Invoice the payment applies to.
	pub invoice_id: u64,
	/// Paid amount.
	pub amount: f64,
	/// Payment date (`YYYY-MM-DD`).
	#[serde(default)]
	pub payment_date: Option<String>,
	/// Payment method (`bank_transfer`, `cash`, `credit_card`, `check`, `other`).
	#[serde(default)]
	pub payment_method: Option<String>,
	/// External reference (transfer id, check number).
	#[serde(default)]
	pub reference: Option<String>,
	/// Settlement status (`pending`, `completed`, `failed`).
	#[serde(default)]
	pub status: Option<String>,
}

/// Fields accepted when registering a payment.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PaymentDraft {
	/// Invoice the payment applies to (required).
	pub invoice_id: u64,
	/// Paid amount (must be positive).
	pub amount: f64,
	/// Payment date (`YYYY-MM-DD`).
	pub payment_date: String,
	/// Payment method.
	pub payment_method: String,
	/// External reference.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reference: Option<String>,
}

/// Payment endpoints.
#[derive(Clone, Debug)]
pub struct PaymentsService {
	client: SimpleFactClient,
}
impl PaymentsService {
	pub(crate) fn new(client: SimpleFactClient) -> Self {
		Self { client }
	}

	/// Lists the payments registered against an invoice.
	pub async fn list_by_invoice(&self, invoice_id: u64) -> Result<Vec<Payment>> {
		let context = format!("Failed to list payments for invoice {invoice_id}");
		let response: ApiResponse<Vec<Payment>> = self
			.client
			.get(
				&format!("/api/v1/invoices/{invoice_id}/payments"),
				Some(RequestOptions::new().with_context(context.clone())),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::InvoiceNotFound))?;

		services::require_data(response, &context)
	}

	/// Registers a payment against its invoice.
	///
	/// `PAYMENT_EXCEEDS_REMAINING` passes through from the backend body untouched.
	pub async fn register(&self, draft: &PaymentDraft) -> Result<Payment> {
		let context = "Failed to register payment";

		if draft.invoice_id == 0 {
			return Err(Error::missing_field("invoice_id", context));
		}
		if draft.amount <= 0.0 {
			return Err(Error::new(
				ErrorCode::InvalidAmount,
				format!("{context}: payment amount must be positive."),
			));
		}

		let body = services::encode(draft, context)?;
		let response: ApiResponse<Payment> = self
			.client
			.post(
				&format!("/api/v1/invoices/{}/payments", draft.invoice_id),
				body,
				Some(RequestOptions::new().with_context(context)),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::InvoiceNotFound))?;

		services::require_data(response, context)
	}

	/// Applies a partial update to a payment. The update payload must carry at
	/// least one field.
	pub async fn update(&self, invoice_id: u64, payment_id: u64, updates: Json) -> Result<()> {
		let context = format!("Failed to update payment {payment_id}");

		if !updates.as_object().is_some_and(|fields| !fields.is_empty()) {
			return Err(Error::missing_field("updates", &context));
		}

		let mut body = updates;

		body["payment_id"] = Json::from(payment_id);

		self.client
			.put::<Json>(
				&format!("/api/v1/invoices/{invoice_id}/payments"),
				body,
				Some(RequestOptions::new().with_context(context)),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::PaymentNotFound))?;

		Ok(())
	}

	/// Deletes a payment from an invoice.
	pub async fn delete(&self, invoice_id: u64, payment_id: u64) -> Result<()> {
		let context = format!("Failed to delete payment {payment_id} of invoice {invoice_id}");
		let mut url = self.client.endpoint(&format!("/api/v1/invoices/{invoice_id}/payments"))?;

		url.query_pairs_mut().append_pair("payment_id", &payment_id.to_string());

		self.client
			.execute_at::<Json>(
				Method::Delete,
				url,
				None,
				Some(RequestOptions::new().with_context(context)),
			)
			.await
			.map_err(|e| e.remap_not_found(ErrorCode::PaymentNotFound))?;

		Ok(())
	}
}
