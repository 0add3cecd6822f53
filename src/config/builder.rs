// self
use crate::{_prelude::*, config::ClientConfig, error::ConfigError, platform::RuntimeTarget};

/// Builder for [`ClientConfig`] values.
#[derive(Debug, Deserialize)]
pub struct ClientConfigBuilder {
	/// Backend base URL.
	pub base_url: Url,
	/// Runtime the client is embedded in.
	#[serde(default)]
	pub target: RuntimeTarget,
	/// Timeout applied to every outbound request.
	#[serde(default = "default_request_timeout")]
	pub request_timeout: Duration,
	/// Proactive refresh window.
	#[serde(default = "default_refresh_window")]
	pub refresh_window: Duration,
	/// Expiry monitor interval.
	#[serde(default = "default_monitor_interval")]
	pub monitor_interval: Duration,
	/// Token persistence key.
	#[serde(default = "default_token_key")]
	pub token_key: String,
	/// Login endpoint path.
	#[serde(default = "default_login_path")]
	pub login_path: String,
	/// Token reissue endpoint path.
	#[serde(default = "default_refresh_path")]
	pub refresh_path: String,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults for the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			target: RuntimeTarget::default(),
			request_timeout: ClientConfig::DEFAULT_REQUEST_TIMEOUT,
			refresh_window: ClientConfig::DEFAULT_REFRESH_WINDOW,
			monitor_interval: ClientConfig::DEFAULT_MONITOR_INTERVAL,
			token_key: ClientConfig::DEFAULT_TOKEN_KEY.into(),
			login_path: ClientConfig::DEFAULT_LOGIN_PATH.into(),
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
		}
	}

	/// Sets the runtime target.
	pub fn target(mut self, target: RuntimeTarget) -> Self {
		self.target = target;

		self
	}

	/// Overrides the request timeout (defaults to 5 seconds).
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the proactive refresh window (defaults to 30 seconds).
	///
	/// Negative windows are clamped to zero, which disables proactive refreshes for tokens
	/// that have not yet expired.
	pub fn refresh_window(mut self, window: Duration) -> Self {
		self.refresh_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Overrides the expiry monitor interval (defaults to 30 seconds).
	pub fn monitor_interval(mut self, interval: Duration) -> Self {
		self.monitor_interval = interval;

		self
	}

	/// Overrides the token persistence key (defaults to `"token"`).
	pub fn token_key(mut self, key: impl Into<String>) -> Self {
		self.token_key = key.into();

		self
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the token reissue endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			target: self.target,
			request_timeout: self.request_timeout,
			refresh_window: self.refresh_window,
			monitor_interval: self.monitor_interval,
			token_key: self.token_key,
			login_path: self.login_path,
			refresh_path: self.refresh_path,
		};

		config.validate()?;

		Ok(config)
	}
}

impl TryFrom<ClientConfigBuilder> for ClientConfig {
	type Error = ConfigError;

	fn try_from(builder: ClientConfigBuilder) -> Result<Self, Self::Error> {
		let window = builder.refresh_window;

		builder.refresh_window(window).build()
	}
}

impl ClientConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if !self.request_timeout.is_positive() {
			return Err(ConfigError::NonPositiveTimeout);
		}
		if !self.monitor_interval.is_positive() {
			return Err(ConfigError::NonPositiveMonitorInterval);
		}
		if self.token_key.trim().is_empty() {
			return Err(ConfigError::EmptyTokenKey);
		}

		self.endpoint(&self.login_path)?;
		self.endpoint(&self.refresh_path)?;

		Ok(())
	}
}

fn default_request_timeout() -> Duration {
	ClientConfig::DEFAULT_REQUEST_TIMEOUT
}

fn default_refresh_window() -> Duration {
	ClientConfig::DEFAULT_REFRESH_WINDOW
}

fn default_monitor_interval() -> Duration {
	ClientConfig::DEFAULT_MONITOR_INTERVAL
}

fn default_token_key() -> String {
	ClientConfig::DEFAULT_TOKEN_KEY.into()
}

fn default_login_path() -> String {
	ClientConfig::DEFAULT_LOGIN_PATH.into()
}

fn default_refresh_path() -> String {
	ClientConfig::DEFAULT_REFRESH_PATH.into()
}
