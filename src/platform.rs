//! Runtime capabilities the client delegates to its host (alerts, logged-out reset).
//!
//! A browser-like host and a native host differ only in how they store the token, how they
//! show a message, and whether cookies travel with requests. The client keeps those behind
//! the small traits below and never branches on the runtime itself.

// self
use crate::{_prelude::*, obs};

/// Runtime the client is embedded in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeTarget {
	/// Browser-like host: cookies (the refresh credential) travel with requests.
	Browser,
	#[default]
	/// Native host: no ambient cookie jar.
	Native,
}
impl RuntimeTarget {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RuntimeTarget::Browser => "browser",
			RuntimeTarget::Native => "native",
		}
	}

	/// Whether credentialed cookies are sent with requests.
	pub const fn with_credentials(self) -> bool {
		matches!(self, RuntimeTarget::Browser)
	}
}
impl Display for RuntimeTarget {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Why the client dropped back to its logged-out entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResetReason {
	/// The server reported the refresh credential as expired.
	SessionExpired,
	/// The refresh endpoint failed or returned no token.
	RefreshFailed,
}
impl ResetReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ResetReason::SessionExpired => "session_expired",
			ResetReason::RefreshFailed => "refresh_failed",
		}
	}
}
impl Display for ResetReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Shows a server-provided message to the user.
pub trait AlertPresenter
where
	Self: Send + Sync,
{
	/// Presents `message`; called at most once per failed request.
	fn present(&self, message: &str);
}

/// Returns the host UI to its unauthenticated entry point.
pub trait SessionResetHandler
where
	Self: Send + Sync,
{
	/// Called after the stored token has been removed.
	fn reset_to_entry(&self, reason: ResetReason);
}

/// Alert presenter that routes messages into the client's log stream.
///
/// Hosts without a UI (daemons, tests, CLIs) use this as their alert surface.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAlertPresenter {
	target: RuntimeTarget,
}
impl LogAlertPresenter {
	/// Creates a presenter labeled with the runtime target.
	pub fn new(target: RuntimeTarget) -> Self {
		Self { target }
	}
}
impl AlertPresenter for LogAlertPresenter {
	fn present(&self, message: &str) {
		obs::alert_presented(self.target, message);
	}
}

/// Reset handler for hosts without navigation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopResetHandler;
impl SessionResetHandler for NoopResetHandler {
	fn reset_to_entry(&self, reason: ResetReason) {
		obs::session_reset(reason);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn only_browser_targets_send_credentials() {
		assert!(RuntimeTarget::Browser.with_credentials());
		assert!(!RuntimeTarget::Native.with_credentials());
		assert_eq!(RuntimeTarget::default(), RuntimeTarget::Native);
	}

	#[test]
	fn runtime_target_serializes_in_snake_case() {
		let payload = serde_json::to_string(&RuntimeTarget::Browser)
			.expect("RuntimeTarget should serialize to JSON.");

		assert_eq!(payload, "\"browser\"");
	}

	#[test]
	fn default_capabilities_do_not_panic() {
		LogAlertPresenter::new(RuntimeTarget::Browser).present("세션이 만료되었습니다");
		NoopResetHandler.reset_to_entry(ResetReason::RefreshFailed);
	}
}
