//! Error envelope parsing and response classification.
//!
//! The backend answers failures with `{ "code": ..., "msg" | "message": ... }`. Only the status
//! plus the code decide what the client does next; the message is what the user sees.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, http::ApiResponse};

/// Server error codes the client reacts to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
	/// `REFRESH_TOKEN_EXPIRED`: the refresh credential is gone; the session cannot recover.
	RefreshTokenExpired,
	/// `TOKEN_EXPIRED` or `_TOKEN_EXPIRED`: the bearer token expired; one refresh may recover.
	TokenExpired,
	/// Any other code, kept verbatim.
	Other(String),
}
impl ErrorCode {
	/// Classifies a raw code string.
	pub fn parse(code: &str) -> Self {
		match code {
			"REFRESH_TOKEN_EXPIRED" => Self::RefreshTokenExpired,
			"TOKEN_EXPIRED" | "_TOKEN_EXPIRED" => Self::TokenExpired,
			other => Self::Other(other.to_owned()),
		}
	}
}

/// Parsed error body; every field is optional because bodies are not guaranteed JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorEnvelope {
	/// Raw `code` field.
	pub code: Option<String>,
	/// `msg`, falling back to `message`; empty strings count as absent.
	pub message: Option<String>,
}
impl ErrorEnvelope {
	/// Parses an error body leniently.
	pub fn from_body(body: &[u8]) -> Self {
		let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
			return Self::default();
		};
		let text = |key: &str| {
			fields.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty()).map(str::to_owned)
		};

		Self { code: text("code"), message: text("msg").or_else(|| text("message")) }
	}

	/// Classified error code, if the body carried one.
	pub fn error_code(&self) -> Option<ErrorCode> {
		self.code.as_deref().map(ErrorCode::parse)
	}
}

/// What the client does with a failed response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
	/// Clear the token, reset to the entry point, fail with `SessionExpired`.
	EndSession,
	/// Refresh once and resubmit the request.
	RefreshAndRetry,
	/// Alert the server message and fail with `RequestFailed`.
	Surface,
}

/// Error response captured from the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseFailure {
	/// HTTP status code.
	pub status: u16,
	/// Parsed error body.
	pub envelope: ErrorEnvelope,
}
impl ResponseFailure {
	/// Captures the status and envelope of `response`.
	pub fn from_response(response: &ApiResponse) -> Self {
		Self { status: response.status, envelope: ErrorEnvelope::from_body(&response.body) }
	}

	/// Returns `true` for `401 REFRESH_TOKEN_EXPIRED`.
	pub fn is_session_expired(&self) -> bool {
		self.status == 401 && self.envelope.error_code() == Some(ErrorCode::RefreshTokenExpired)
	}

	/// Decides how to handle the failure; `retryable` is `false` once the request was retried or
	/// when it targets a credential endpoint.
	pub fn disposition(&self, retryable: bool) -> Disposition {
		if self.is_session_expired() {
			return Disposition::EndSession;
		}
		if retryable
			&& self.status == 401
			&& self.envelope.error_code() == Some(ErrorCode::TokenExpired)
		{
			return Disposition::RefreshAndRetry;
		}

		Disposition::Surface
	}

	pub(crate) fn into_request_failed(self) -> Error {
		Error::RequestFailed {
			status: self.status,
			code: self.envelope.code,
			message: self.envelope.message,
		}
	}

	pub(crate) fn describe(&self) -> String {
		match (&self.envelope.code, &self.envelope.message) {
			(_, Some(message)) => format!("HTTP {}: {message}", self.status),
			(Some(code), None) => format!("HTTP {} ({code})", self.status),
			(None, None) => format!("HTTP {}", self.status),
		}
	}
}
