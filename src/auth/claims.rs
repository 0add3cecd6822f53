//! Payload decoding for three-part signed bearer tokens.
//!
//! Decoding is lenient: any malformed segment, base64 error, or non-object payload yields
//! `None` instead of an error, so callers simply treat the token as having no known expiry.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Decoded token payload.
pub type Claims = Map<String, Value>;

/// Decodes the payload segment of `token`.
///
/// Returns `None` unless the token has exactly three `.`-separated segments and the middle one
/// is url-safe base64 encoding a JSON object.
pub fn decode_payload(token: &str) -> Option<Claims> {
	let mut segments = token.split('.');
	let (Some(_), Some(payload), Some(_), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return None;
	};
	let bytes = STANDARD.decode(to_standard_alphabet(payload)).ok()?;

	match serde_json::from_slice(&bytes).ok()? {
		Value::Object(claims) => Some(claims),
		_ => None,
	}
}

/// Reads the absolute expiry from the token's numeric `exp` claim (Unix seconds).
///
/// The instant keeps millisecond precision; fractional `exp` values are honored.
pub fn expires_at(token: &str) -> Option<OffsetDateTime> {
	let exp = decode_payload(token)?.get("exp")?.as_f64()?;

	if !exp.is_finite() {
		return None;
	}

	let millis = (exp * 1_000.).trunc() as i128;

	OffsetDateTime::from_unix_timestamp_nanos(millis.checked_mul(1_000_000)?).ok()
}

fn to_standard_alphabet(segment: &str) -> String {
	let mut buf: String = segment
		.chars()
		.map(|c| match c {
			'-' => '+',
			'_' => '/',
			other => other,
		})
		.collect();

	while buf.len() % 4 != 0 {
		buf.push('=');
	}

	buf
}

#[cfg(test)]
mod tests {
	// crates.io
	use base64::engine::general_purpose::URL_SAFE_NO_PAD;
	// self
	use super::*;

	fn token_with_payload(payload: &str) -> String {
		format!("eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl", URL_SAFE_NO_PAD.encode(payload))
	}

	#[test]
	fn decodes_exp_into_millisecond_instant() {
		let token = token_with_payload(r#"{"sub":"emp-42","exp":1700000000}"#);
		let expiry = expires_at(&token).expect("Token fixture should carry an expiry.");

		assert_eq!(expiry.unix_timestamp(), 1_700_000_000);

		let token = token_with_payload(r#"{"exp":1700000000.25}"#);
		let expiry = expires_at(&token).expect("Fractional expiry should decode.");

		assert_eq!(expiry.unix_timestamp_nanos(), 1_700_000_000_250_000_000);
	}

	#[test]
	fn url_safe_characters_are_translated() {
		// `??>>` lands on both `_` and `-` in the url-safe alphabet.
		let payload = r#"{"exp":1700000000,"note":"??>>"}"#;
		let token = token_with_payload(payload);

		assert!(token.contains('_') && token.contains('-'));
		assert_eq!(
			decode_payload(&token).and_then(|claims| claims.get("note").cloned()),
			Some(Value::String("??>>".into()))
		);
	}

	#[test]
	fn malformed_tokens_have_no_payload() {
		assert!(decode_payload("").is_none());
		assert!(decode_payload("only-one-segment").is_none());
		assert!(decode_payload("two.segments").is_none());
		assert!(decode_payload("a.b.c.d").is_none());
		assert!(decode_payload("head.!!!not-base64!!!.sig").is_none());
		assert!(decode_payload(&format!("h.{}.s", URL_SAFE_NO_PAD.encode("not json"))).is_none());
		assert!(decode_payload(&format!("h.{}.s", URL_SAFE_NO_PAD.encode("[1,2]"))).is_none());
	}

	#[test]
	fn missing_or_non_numeric_exp_yields_no_expiry() {
		assert!(expires_at(&token_with_payload(r#"{"sub":"emp-42"}"#)).is_none());
		assert!(expires_at(&token_with_payload(r#"{"exp":"1700000000"}"#)).is_none());
		assert!(expires_at(&token_with_payload(r#"{"exp":null}"#)).is_none());
	}
}
