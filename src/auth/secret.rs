//! Redacting bearer token wrapper.

// self
use crate::{_prelude::*, auth::claims};

/// Bearer token that keeps its secret out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken(String);
impl BearerToken {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Absolute expiry read from the token payload, if the payload carries one.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		claims::expires_at(&self.0)
	}

	/// Time left until expiry at `now`; negative once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Option<Duration> {
		self.expires_at().map(|expiry| expiry - now)
	}

	/// Returns `true` when the token expires within `window` of `now`.
	///
	/// Tokens without a readable expiry never need a proactive refresh.
	pub fn expires_within(&self, window: Duration, now: OffsetDateTime) -> bool {
		self.remaining_at(now).is_some_and(|remaining| remaining <= window)
	}

	/// Formats the `Authorization` header value.
	pub(crate) fn header_value(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for BearerToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for BearerToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("BearerToken").field(&"<redacted>").finish()
	}
}
impl Display for BearerToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
