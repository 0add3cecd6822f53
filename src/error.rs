//! Client-level error types shared across requests, refreshes, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Successful response body did not match the expected shape.
	#[error("Response body from HTTP {status} could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},

	/// The refresh endpoint did not yield a usable token.
	#[error("Token refresh failed: {reason}.")]
	RefreshFailed {
		/// Client- or server-supplied reason string.
		reason: String,
	},
	/// The refresh credential expired server-side; the session was ended locally.
	#[error("Session expired: {message}.")]
	SessionExpired {
		/// Server-supplied message, or a default when the server sent none.
		message: String,
	},
	/// The server answered with an error status that was not recovered locally.
	#[error("Request failed with HTTP {status}: {}.", .message.as_deref().unwrap_or("no message"))]
	RequestFailed {
		/// HTTP status code.
		status: u16,
		/// Server-provided error code from the error envelope.
		code: Option<String>,
		/// Server-provided message from the error envelope.
		message: Option<String>,
	},
	/// The login endpoint answered without a token.
	#[error("Login did not return a token.")]
	MissingLoginToken,
	/// The caller aborted the request before it completed.
	#[error("Request was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns `true` when the caller aborted the request.
	///
	/// Screens use this to skip their error banners for aborted loads.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}

	/// Returns `true` when the error ended the local session (token cleared, client reset).
	pub fn ends_session(&self) -> bool {
		matches!(self, Self::SessionExpired { .. } | Self::RefreshFailed { .. })
	}

	/// HTTP status attached to the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::RequestFailed { status, .. } | Self::Decode { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL must use `http` or `https`.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Joined endpoint URL cannot be parsed.
	#[error("Endpoint `{path}` does not form a valid URL.")]
	InvalidEndpoint {
		/// Request path that failed to join the base URL.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request timeout must be positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
	/// Expiry monitor interval must be positive.
	#[error("Expiry monitor interval must be positive.")]
	NonPositiveMonitorInterval,
	/// Token persistence key must not be empty.
	#[error("Token storage key must not be empty.")]
	EmptyTokenKey,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure or timed out.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
