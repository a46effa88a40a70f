//! Wire-format types shared by the request pipeline and the resource services.

// self
use crate::_prelude::*;

/// Envelope wrapping every JSON response from the API.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>", serialize = "T: Serialize"))]
pub struct ApiResponse<T = Json> {
	/// Whether the backend reports the operation as successful.
	#[serde(default)]
	pub success: bool,
	/// Payload for successful operations.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	/// Backend-supplied error message, when the operation failed.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Backend-supplied error code string, when the operation failed.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	/// Pagination metadata for list endpoints.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub meta: Option<PaginationMeta>,
	/// Additional diagnostic payload.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<Json>,
}
// Not derived; a derive would demand `T: Default` while empty envelopes are
// built for payload types that have no meaningful default.
impl<T> Default for ApiResponse<T> {
	fn default() -> Self {
		Self { success: false, data: None, error: None, code: None, meta: None, details: None }
	}
}

/// Pagination metadata attached to list responses.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct PaginationMeta {
	/// Current page, 1-indexed.
	pub page: u32,
	/// Page size.
	pub per_page: u32,
	/// Total records across all pages.
	pub total: u64,
	/// Total number of pages.
	pub total_pages: u32,
	/// Whether a next page exists.
	pub has_next: bool,
	/// Whether a previous page exists.
	pub has_prev: bool,
}

/// Sort direction accepted by list endpoints.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	/// Ascending.
	Asc,
	/// Descending.
	Desc,
}
impl SortDirection {
	/// Returns the query-string token for this direction.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Asc => "asc",
			Self::Desc => "desc",
		}
	}
}

/// Common filters accepted by the list endpoints.
#[derive(Clone, Debug, Default)]
pub struct ListParams {
	/// Page to fetch, 1-indexed.
	pub page: Option<u32>,
	/// Page size.
	pub per_page: Option<u32>,
	/// Free-text search term.
	pub search: Option<String>,
	/// Status filter, passed through verbatim.
	pub status: Option<String>,
	/// Inclusive lower bound on the document date (`YYYY-MM-DD`).
	pub start_date: Option<String>,
	/// Inclusive upper bound on the document date (`YYYY-MM-DD`).
	pub end_date: Option<String>,
	/// Field to sort by.
	pub sort_by: Option<String>,
	/// Sort direction.
	pub sort_direction: Option<SortDirection>,
}
impl ListParams {
	/// Creates an empty filter set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the page to fetch.
	pub fn with_page(mut self, page: u32) -> Self {
		self.page = Some(page);

		self
	}

	/// Sets the page size.
	pub fn with_per_page(mut self, per_page: u32) -> Self {
		self.per_page = Some(per_page);

		self
	}

	/// Sets the free-text search term.
	pub fn with_search(mut self, search: impl Into<String>) -> Self {
		self.search = Some(search.into());

		self
	}

	/// Sets the status filter.
	pub fn with_status(mut self, status: impl Into<String>) -> Self {
		self.status = Some(status.into());

		self
	}

	/// Sets the inclusive document-date range.
	pub fn with_date_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
		self.start_date = Some(start.into());
		self.end_date = Some(end.into());

		self
	}

	/// Sets the sort field and direction.
	pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
		self.sort_by = Some(field.into());
		self.sort_direction = Some(direction);

		self
	}

	/// Appends the filters as query parameters on `url`.
	pub fn append_to(&self, url: &mut Url) {
		if self.is_empty() {
			return;
		}

		let mut pairs = url.query_pairs_mut();

		if let Some(page) = self.page {
			pairs.append_pair("page", &page.to_string());
		}
		if let Some(per_page) = self.per_page {
			pairs.append_pair("per_page", &per_page.to_string());
		}
		if let Some(search) = &self.search {
			pairs.append_pair("search", search);
		}
		if let Some(status) = &self.status {
			pairs.append_pair("status", status);
		}
		if let Some(start_date) = &self.start_date {
			pairs.append_pair("start_date", start_date);
		}
		if let Some(end_date) = &self.end_date {
			pairs.append_pair("end_date", end_date);
		}
		if let Some(sort_by) = &self.sort_by {
			pairs.append_pair("sort_by", sort_by);
		}
		if let Some(direction) = self.sort_direction {
			pairs.append_pair("sort_direction", direction.as_str());
		}
	}

	fn is_empty(&self) -> bool {
		self.page.is_none()
			&& self.per_page.is_none()
			&& self.search.is_none()
			&& self.status.is_none()
			&& self.start_date.is_none()
			&& self.end_date.is_none()
			&& self.sort_by.is_none()
			&& self.sort_direction.is_none()
	}
}

/// Result of the unauthenticated health probe.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HealthCheck {
	/// Overall status reported by the API, or inferred on probe failure.
	pub status: HealthStatus,
	/// RFC 3339 timestamp of the observation.
	pub timestamp: String,
	/// Per-subsystem health, when the backend reports it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub services: Option<ServiceHealth>,
}

/// Overall health label.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	/// API reachable and reporting healthy.
	Healthy,
	/// API unreachable or reporting degraded.
	Unhealthy,
}

/// Per-subsystem health flags.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct ServiceHealth {
	/// REST API availability.
	pub api: bool,
	/// Backing database availability.
	pub database: bool,
	/// Authentication subsystem availability.
	pub auth: bool,
}

/// Body returned by the token-exchange endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenGrant {
	/// Issued bearer token.
	pub token: Option<String>,
	/// Token lifetime in seconds, when the backend reports one.
	pub expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn list_params_render_as_query_pairs() {
		let mut url = Url::parse("https://api.example.com/api/v1/invoices")
			.expect("Failed to parse test URL.");

		ListParams::new()
			.with_page(2)
			.with_per_page(50)
			.with_search("acme")
			.with_sort("date", SortDirection::Desc)
			.append_to(&mut url);

		assert_eq!(url.query(), Some("page=2&per_page=50&search=acme&sort_by=date&sort_direction=desc"));
	}

	#[test]
	fn empty_list_params_leave_the_url_unchanged() {
		let mut url =
			Url::parse("https://api.example.com/api/v1/clients").expect("Failed to parse test URL.");

		ListParams::new().append_to(&mut url);

		assert_eq!(url.query(), None);
	}

	#[test]
	fn api_response_tolerates_missing_fields() {
		let response: ApiResponse<Json> =
			serde_json::from_str(r#"{"data":{"id":1}}"#).expect("Failed to decode test envelope.");

		assert!(!response.success);
		assert_eq!(response.data, Some(serde_json::json!({ "id": 1 })));
		assert!(response.meta.is_none());
	}
}
