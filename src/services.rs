//! Resource services: thin pass-through wrappers over the request pipeline.
//!
//! Each service builds a `/api/v1/...` URL, validates field presence where the API
//! would otherwise reject the call outright, delegates to
//! [`SimpleFactClient::execute`](crate::client::SimpleFactClient::execute), and
//! reshapes the envelope into its domain type. Services remap the pipeline's
//! generic 404 bucket into their resource-specific `*_NOT_FOUND` code without
//! losing status or details; deeper field validation (tax-ID formats, length
//! limits) is left to the backend.

pub mod budgets;
pub mod clients;
pub mod invoices;
pub mod payments;
pub mod portal;
pub mod verification;

// self
use crate::{_prelude::*, api::ApiResponse};

/// Unwraps the `data` payload of an envelope, failing when the backend omitted it.
pub(crate) fn require_data<T>(response: ApiResponse<T>, context: &str) -> Result<T> {
	response
		.data
		.ok_or_else(|| Error::new(ErrorCode::ApiError, format!("{context}: response carried no data.")))
}

/// Serializes a request draft into a JSON body.
pub(crate) fn encode<T>(value: &T, context: &str) -> Result<Json>
where
	T: Serialize,
{
	serde_json::to_value(value).map_err(|e| {
		Error::new(ErrorCode::InvalidInput, format!("{context}: request body could not be encoded."))
			.with_cause(e)
	})
}
