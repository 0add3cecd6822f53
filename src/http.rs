//! Transport primitives for API calls.
//!
//! The module exposes [`HttpTransport`] alongside the request/response values the client
//! passes through it, so downstream crates can plug in a custom HTTP stack (or a scripted fake
//! in tests) without touching the refresh logic. A transport reports every HTTP response,
//! including error statuses, as `Ok`; only network failures and timeouts are `Err`.

// self
use crate::{_prelude::*, error::ConfigError};
#[cfg(feature = "reqwest")] use crate::platform::RuntimeTarget;
use crate::error::TransportError;

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing prepared API requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can back a shared client,
/// and must honor [`PreparedRequest::timeout`].
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and returns the raw response.
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_>;
}

/// HTTP methods used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Caller-facing request against the configured backend.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the base URL (may carry a query string).
	pub path: String,
	/// Extra query pairs appended to the URL.
	pub query: Vec<(String, String)>,
	/// JSON body, if any.
	pub body: Option<serde_json::Value>,
	retried: bool,
}
impl ApiRequest {
	/// Creates a request with no body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), body: None, retried: false }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_value(body)?);

		Ok(self)
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Display) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Whether the request already went through one refresh-and-retry cycle.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}
}

/// Fully resolved request handed to an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including query pairs.
	pub url: Url,
	/// Header pairs; names are lowercase.
	pub headers: Vec<(String, String)>,
	/// Serialized JSON body.
	pub body: Option<Vec<u8>>,
	/// Per-request timeout.
	pub timeout: std::time::Duration,
}
impl PreparedRequest {
	/// Returns the first header value matching `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Raw response captured by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response from its parts.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for 2xx/3xx statuses.
	pub fn is_success(&self) -> bool {
		self.status < 400
	}

	/// Decodes the body as JSON; an empty body decodes as `null`.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body: &[u8] =
			if self.body.iter().all(u8::is_ascii_whitespace) { b"null" } else { &self.body };
		let mut deserializer = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: self.status })
	}

	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Reqwest-backed [`HttpTransport`].
///
/// Redirects are left at reqwest's defaults; the cookie jar is enabled only for browser-like
/// targets, since the refresh credential rides on a cookie there.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a transport configured for `target`.
	pub fn for_target(target: RuntimeTarget) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().cookie_store(target.with_credentials()).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = self.0.request(method, request.url).timeout(request.timeout);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, body })
		})
	}
}

pub(crate) fn json_headers() -> Vec<(String, String)> {
	vec![
		("content-type".into(), "application/json".into()),
		("accept".into(), "application/json".into()),
	]
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_bodies_decode_as_null() {
		let response = ApiResponse::new(204, Vec::new());
		let maybe: Option<u32> = response.json().expect("Empty bodies should decode as None.");

		response.json::<()>().expect("Empty bodies should decode into unit.");
		assert_eq!(maybe, None);
	}

	#[test]
	fn decode_errors_carry_the_failing_path() {
		#[derive(Debug, Deserialize)]
		struct Leave {
			#[allow(dead_code)]
			days: u32,
		}

		let response = ApiResponse::new(200, r#"{"days":"three"}"#);
		let err = response.json::<Leave>().expect_err("String days should fail to decode.");

		match err {
			Error::Decode { source, status } => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "days");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn request_builders_collect_query_and_body() {
		let request = ApiRequest::get("/leaves")
			.with_query("year", 2026)
			.with_query("status", "PENDING");

		assert_eq!(request.method, Method::Get);
		assert_eq!(request.query.len(), 2);
		assert!(!request.is_retried());

		let request = ApiRequest::post("/overtimes")
			.with_json(&serde_json::json!({ "hours": 2 }))
			.expect("JSON body should serialize.");

		assert_eq!(request.body, Some(serde_json::json!({ "hours": 2 })));
	}

	#[test]
	fn header_lookup_is_case_insensitive() {
		let request = PreparedRequest {
			method: Method::Get,
			url: Url::parse("https://leave.example.com/leaves").expect("URL fixture should parse."),
			headers: vec![("authorization".into(), "Bearer abc".into())],
			body: None,
			timeout: std::time::Duration::from_secs(5),
		};

		assert_eq!(request.header("Authorization"), Some("Bearer abc"));
		assert_eq!(request.header("content-type"), None);
	}
}
