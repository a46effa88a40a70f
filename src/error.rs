//! Client-wide error taxonomy and the failure normalizer shared by every request path.
//!
//! Every failure that leaves this crate is exactly one [`Error`] carrying a stable
//! [`ErrorCode`]. The normalizer in [`Error::normalize`] is the only place raw
//! transport or HTTP failures become [`Error`] values; resource services may remap
//! the generic not-found bucket afterwards via [`Error::remap_not_found`] without
//! losing status or diagnostic payloads.

// self
use crate::{_prelude::*, http::TransportFailure};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Stable machine-readable error codes mirroring the SimpleFACT API taxonomy.
///
/// The enum is flat; callers branch on a single code instead of walking an error
/// hierarchy. Codes serialize in SCREAMING_SNAKE_CASE, matching the wire strings
/// the backend emits in response bodies.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Request lacked valid authentication.
	Unauthorized,
	/// Bearer token was rejected or malformed.
	InvalidToken,
	/// Bearer token has expired.
	TokenExpired,
	/// Request payload failed backend validation.
	ValidationError,
	/// A field value is malformed.
	InvalidInput,
	/// A line item is malformed.
	InvalidItem,
	/// A monetary amount is out of range.
	InvalidAmount,
	/// The referenced client identifier is malformed.
	InvalidClientId,
	/// Client not found; also the generic 404 fallback (see [`Error::remap_not_found`]).
	ClientNotFound,
	/// Invoice not found.
	InvoiceNotFound,
	/// Budget not found.
	BudgetNotFound,
	/// Payment not found.
	PaymentNotFound,
	/// Budget has already been converted to an invoice.
	BudgetAlreadyInvoiced,
	/// Payment amount exceeds the invoice's remaining balance.
	PaymentExceedsRemaining,
	/// Document has no line items.
	NoItems,
	/// Hourly request budget exhausted, locally or upstream.
	RateLimitExceeded,
	/// Backend failure (5xx or otherwise unclassified).
	ServerError,
	/// Transport failure; no HTTP response was received.
	NetworkError,
	/// Response arrived but could not be interpreted.
	ApiError,
	/// Generic resource-not-found reported by the backend body.
	NotFoundError,
	/// A required field is missing from the request.
	MissingField,
	/// Authenticated principal lacks permission for the operation.
	InsufficientPermissions,
}
impl ErrorCode {
	/// Returns the wire-format label for this code.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Unauthorized => "UNAUTHORIZED",
			Self::InvalidToken => "INVALID_TOKEN",
			Self::TokenExpired => "TOKEN_EXPIRED",
			Self::ValidationError => "VALIDATION_ERROR",
			Self::InvalidInput => "INVALID_INPUT",
			Self::InvalidItem => "INVALID_ITEM",
			Self::InvalidAmount => "INVALID_AMOUNT",
			Self::InvalidClientId => "INVALID_CLIENT_ID",
			Self::ClientNotFound => "CLIENT_NOT_FOUND",
			Self::InvoiceNotFound => "INVOICE_NOT_FOUND",
			Self::BudgetNotFound => "BUDGET_NOT_FOUND",
			Self::PaymentNotFound => "PAYMENT_NOT_FOUND",
			Self::BudgetAlreadyInvoiced => "BUDGET_ALREADY_INVOICED",
			Self::PaymentExceedsRemaining => "PAYMENT_EXCEEDS_REMAINING",
			Self::NoItems => "NO_ITEMS",
			Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
			Self::ServerError => "SERVER_ERROR",
			Self::NetworkError => "NETWORK_ERROR",
			Self::ApiError => "API_ERROR",
			Self::NotFoundError => "NOT_FOUND_ERROR",
			Self::MissingField => "MISSING_FIELD",
			Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
		}
	}

	/// Maps an HTTP status to the default code used when the body carries no better hint.
	pub const fn for_status(status: u16) -> Self {
		match status {
			400 => Self::ValidationError,
			401 => Self::Unauthorized,
			// Generic not-found bucket; services remap to the resource-specific code.
			404 => Self::ClientNotFound,
			429 => Self::RateLimitExceeded,
			_ => Self::ServerError,
		}
	}

	fn from_wire(label: &str) -> Option<Self> {
		serde_json::from_value(Json::String(label.into())).ok()
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical client error exposed by every public API.
///
/// Values are cheap to clone so a single refresh outcome can be shared across all
/// callers coalesced behind the single-flight guard.
#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct Error {
	/// Human-readable message including the attempted operation's context.
	pub message: String,
	/// Stable taxonomy code for programmatic branching.
	pub code: ErrorCode,
	/// HTTP status of the failing response, when one was received.
	pub http_status: Option<u16>,
	/// Backend-supplied diagnostic payload, unmodified.
	pub details: Option<Json>,
	/// Underlying failure, when the error wraps a transport or decode problem.
	pub cause: Option<Arc<dyn StdError + Send + Sync>>,
}
impl Error {
	pub(crate) fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self { message: message.into(), code, http_status: None, details: None, cause: None }
	}

	pub(crate) fn with_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	pub(crate) fn with_details(mut self, details: Json) -> Self {
		self.details = Some(details);

		self
	}

	pub(crate) fn with_cause(mut self, cause: impl 'static + Send + Sync + StdError) -> Self {
		self.cause = Some(Arc::new(cause));

		self
	}

	/// Normalizes any raw failure into exactly one [`Error`].
	///
	/// Total function: already-normalized errors pass through unchanged, transport
	/// failures map to [`ErrorCode::NetworkError`], and HTTP responses map through
	/// [`ErrorCode::for_status`] with body-supplied `error`/`code` fields taking
	/// precedence. `context` becomes the message when the body offers none.
	pub fn normalize(raw: RawFailure, context: &str) -> Self {
		match raw {
			RawFailure::Normalized(error) => error,
			RawFailure::Transport(failure) => Self::new(
				ErrorCode::NetworkError,
				format!("{context}: {failure}"),
			)
			.with_cause(failure),
			RawFailure::Response { status, body } => {
				let mut code = ErrorCode::for_status(status);
				let mut message = context.to_string();

				if let Some(body) = &body {
					if let Some(wire) = body.get("code").and_then(Json::as_str)
						&& let Some(parsed) = ErrorCode::from_wire(wire)
					{
						code = parsed;
					}
					if let Some(text) = body.get("error").and_then(Json::as_str) {
						message = text.to_string();
					}
				}

				let error = Self::new(code, message).with_status(status);

				match body {
					Some(body) => error.with_details(body),
					None => error,
				}
			},
		}
	}

	/// Builds the error raised when a response body cannot be decoded.
	pub(crate) fn decode(
		source: serde_path_to_error::Error<serde_json::Error>,
		status: u16,
		context: &str,
	) -> Self {
		Self::new(ErrorCode::ApiError, format!("{context}: response body could not be decoded."))
			.with_status(status)
			.with_cause(source)
	}

	/// Builds the error raised when the local hourly budget is exhausted.
	pub(crate) fn rate_limited(limit: u32, reset_time: OffsetDateTime) -> Self {
		let reset = reset_time
			.format(&time::format_description::well_known::Rfc3339)
			.unwrap_or_default();

		Self::new(
			ErrorCode::RateLimitExceeded,
			"Rate limit exceeded. Please wait before making more requests.",
		)
		.with_status(429)
		.with_details(serde_json::json!({ "limit": limit, "resetTime": reset }))
	}

	/// Builds the error raised when a required request field is absent.
	pub(crate) fn missing_field(field: &str, context: &str) -> Self {
		Self::new(ErrorCode::MissingField, format!("{context}: missing required field `{field}`."))
	}

	/// Rewrites the generic 404 bucket into a resource-specific code.
	///
	/// Status and details are preserved; codes other than the generic
	/// [`ErrorCode::ClientNotFound`]/[`ErrorCode::NotFoundError`] pass through
	/// untouched so backend-disambiguated failures keep their meaning.
	pub fn remap_not_found(mut self, code: ErrorCode) -> Self {
		if matches!(self.code, ErrorCode::ClientNotFound | ErrorCode::NotFoundError) {
			self.code = code;
		}

		self
	}
}

/// Raw failure shapes accepted by [`Error::normalize`].
#[derive(Debug)]
pub enum RawFailure {
	/// A failure that already went through normalization.
	Normalized(Error),
	/// Transport failure; no HTTP response was received.
	Transport(TransportFailure),
	/// HTTP response received with a non-success status.
	Response {
		/// Status code of the response.
		status: u16,
		/// Parsed response body, when the payload was valid JSON.
		body: Option<Json>,
	},
}
