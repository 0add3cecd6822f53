//! Client configuration shared by every request.
//!
//! The module exposes a validated [`ClientConfig`] plus its builder so deployments can
//! override the timing constants without touching request logic.

/// Builder API for assembling client configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError, platform::RuntimeTarget};

/// Immutable configuration consumed by [`SessionClient`](crate::SessionClient).
///
/// Deserialized configurations go through [`ClientConfigBuilder`], so omitted fields take their
/// defaults and the same validation as [`ClientConfigBuilder::build`] applies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClientConfigBuilder")]
pub struct ClientConfig {
	/// Backend base URL; request paths are appended to it.
	pub base_url: Url,
	/// Runtime the client is embedded in.
	pub target: RuntimeTarget,
	/// Timeout applied to every outbound request.
	pub request_timeout: Duration,
	/// Remaining lifetime at or below which a token is refreshed before use.
	pub refresh_window: Duration,
	/// Tick interval of the expiry diagnostic monitor.
	pub monitor_interval: Duration,
	/// Key under which the bearer token is persisted.
	pub token_key: String,
	/// Path of the login endpoint.
	pub login_path: String,
	/// Path of the token reissue endpoint.
	pub refresh_path: String,
}
impl ClientConfig {
	/// Default request timeout.
	pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(5);
	/// Default proactive refresh window.
	pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::seconds(30);
	/// Default expiry monitor interval.
	pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::seconds(30);
	/// Default token persistence key.
	pub const DEFAULT_TOKEN_KEY: &str = "token";
	/// Default login path.
	pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
	/// Default token reissue path.
	pub const DEFAULT_REFRESH_PATH: &str = "/auth/reissue-token";

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Joins `path` onto the base URL, keeping any path prefix the base URL carries.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let joined = format!(
			"{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			path.trim_start_matches('/')
		);

		Url::parse(&joined).map_err(|source| ConfigError::InvalidEndpoint { path: path.into(), source })
	}

	/// Returns `true` when `path` addresses the token reissue endpoint.
	pub fn is_refresh_path(&self, path: &str) -> bool {
		normalize_path(path) == normalize_path(&self.refresh_path)
	}

	/// Returns `true` when `path` addresses one of the credential endpoints.
	///
	/// Credential endpoints are never decorated with the stored bearer token and never
	/// refreshed-and-retried. Besides the reissue endpoint this deliberately covers login: a
	/// leftover token means nothing there, and a `401` from login rejects the credentials.
	pub fn is_credential_path(&self, path: &str) -> bool {
		self.is_refresh_path(path) || normalize_path(path) == normalize_path(&self.login_path)
	}

	pub(crate) fn request_timeout_std(&self) -> std::time::Duration {
		std::time::Duration::try_from(self.request_timeout).unwrap_or_default()
	}

	pub(crate) fn monitor_interval_std(&self) -> std::time::Duration {
		std::time::Duration::try_from(self.monitor_interval).unwrap_or_default()
	}
}

fn normalize_path(path: &str) -> &str {
	let path = path.split(['?', '#']).next().unwrap_or_default();

	path.trim_matches('/')
}
