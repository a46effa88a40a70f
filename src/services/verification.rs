//! Public invoice verification endpoints.
//!
//! These endpoints are reachable without credentials. Requests go out with the
//! `Authorization` header suppressed so a third party can verify a document
//! hash printed on an invoice.

// self
use crate::{
	_prelude::*,
	api::ApiResponse,
	client::{RequestOptions, SimpleFactClient},
	services::invoices::Invoice,
};

/// Verification record attached to a published invoice.
#[derive(Clone, Debug, Deserialize)]
pub struct InvoiceVerification {
	/// Unique identifier of the verification record.
	pub id: u64,
	/// Invoice the record belongs to.
	pub invoice_id: u64,
	/// Full invoice payload, returned by detailed verification.
	#[serde(default)]
	pub invoice: Option<Invoice>,
	/// Verification code printed on the document.
	pub verification_code: String,
	/// URL encoded in the document's QR code.
	pub qr_code_url: String,
	/// Public verification page URL.
	pub public_url: String,
	/// Instant the document was last verified, when it has been.
	#[serde(default)]
	pub verified_at: Option<String>,
	/// Creation timestamp of the record.
	#[serde(default)]
	pub created_at: Option<String>,
}

/// Public verification endpoints.
#[derive(Clone, Debug)]
pub struct VerificationService {
	client: SimpleFactClient,
}
impl VerificationService {
	pub(crate) fn new(client: SimpleFactClient) -> Self {
		Self { client }
	}

	/// Checks whether a document hash corresponds to a known invoice.
	pub async fn verify_basic(&self, hash: &str) -> Result<InvoiceVerification> {
		let context = "Failed to verify invoice";

		if hash.trim().is_empty() {
			return Err(Error::missing_field("hash", context));
		}

		let response: ApiResponse<InvoiceVerification> = self
			.client
			.get(
				&format!("/api/v1/verify/{hash}"),
				Some(RequestOptions::new().with_context(context).anonymous()),
			)
			.await?;

		require_verification(response)
	}

	/// Verifies a hash against a specific invoice, returning the full record on match.
	pub async fn verify_detailed(&self, hash: &str, invoice_id: u64) -> Result<InvoiceVerification> {
		let context = "Failed to verify invoice with validation";

		if hash.trim().is_empty() {
			return Err(Error::missing_field("hash", context));
		}

		let response: ApiResponse<InvoiceVerification> = self
			.client
			.post(
				&format!("/api/v1/verify/{hash}"),
				serde_json::json!({ "invoice_id": invoice_id }),
				Some(RequestOptions::new().with_context(context).anonymous()),
			)
			.await?;

		require_verification(response)
	}
}

// A 2xx envelope with no data means the hash matched nothing.
fn require_verification(response: ApiResponse<InvoiceVerification>) -> Result<InvoiceVerification> {
	response.data.ok_or_else(|| {
		Error::new(ErrorCode::InvoiceNotFound, "Invoice not found or verification failed.")
			.with_status(404)
	})
}
