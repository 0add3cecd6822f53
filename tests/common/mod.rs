//! Shared fixtures for the integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::HashMap,
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::Arc,
};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::MockServer;
use leave_session::{
	ClientConfig, SessionClient,
	error::TransportError,
	http::{ApiResponse, HttpTransport, PreparedRequest, ReqwestTransport, TransportFuture},
	platform::{AlertPresenter, ResetReason, RuntimeTarget, SessionResetHandler},
	store::{MemoryStore, TokenStore},
	url::Url,
};
use parking_lot::Mutex;
use time::OffsetDateTime;

pub const REISSUE_PATH: &str = "/auth/reissue-token";

/// Alert presenter that remembers every message.
#[derive(Debug, Default)]
pub struct RecordingAlerts(Mutex<Vec<String>>);
impl RecordingAlerts {
	pub fn messages(&self) -> Vec<String> {
		self.0.lock().clone()
	}
}
impl AlertPresenter for RecordingAlerts {
	fn present(&self, message: &str) {
		self.0.lock().push(message.to_owned());
	}
}

/// Reset handler that remembers every reset.
#[derive(Debug, Default)]
pub struct RecordingReset(Mutex<Vec<ResetReason>>);
impl RecordingReset {
	pub fn resets(&self) -> Vec<ResetReason> {
		self.0.lock().clone()
	}
}
impl SessionResetHandler for RecordingReset {
	fn reset_to_entry(&self, reason: ResetReason) {
		self.0.lock().push(reason);
	}
}

/// Everything a test needs to drive and inspect a client.
pub struct Harness<T>
where
	T: ?Sized + HttpTransport,
{
	pub client: SessionClient<T>,
	pub store: Arc<MemoryStore>,
	pub alerts: Arc<RecordingAlerts>,
	pub reset: Arc<RecordingReset>,
}
impl<T> Harness<T>
where
	T: ?Sized + HttpTransport,
{
	pub fn new(config: ClientConfig, transport: Arc<T>) -> Self {
		let store = Arc::new(MemoryStore::default());
		let alerts = Arc::new(RecordingAlerts::default());
		let reset = Arc::new(RecordingReset::default());
		let client = SessionClient::with_transport(
			config,
			store.clone() as Arc<dyn TokenStore>,
			transport,
		)
		.with_alerts(alerts.clone())
		.with_reset_handler(reset.clone());

		Self { client, store, alerts, reset }
	}

	pub async fn seed_token(&self, token: &str) {
		self.store.set("token", token.to_owned()).await.expect("Failed to seed token fixture.");
	}

	pub fn stored_token(&self) -> Option<String> {
		self.store.peek("token")
	}
}

/// Builds a signed-looking token whose `exp` lies `seconds` from now.
pub fn token_expiring_in(label: &str, seconds: i64) -> String {
	let exp = OffsetDateTime::now_utc().unix_timestamp() + seconds;
	let payload = URL_SAFE_NO_PAD.encode(format!("{{\"sub\":\"{label}\",\"exp\":{exp}}}"));

	format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2ln")
}

pub fn config_for(base_url: &str) -> ClientConfig {
	ClientConfig::builder(Url::parse(base_url).expect("Failed to parse base URL fixture."))
		.build()
		.expect("Failed to build client configuration fixture.")
}

/// Reqwest-backed harness pointed at `server`.
pub fn reqwest_harness(server: &MockServer) -> Harness<ReqwestTransport> {
	reqwest_harness_for(server, RuntimeTarget::default())
}

/// Reqwest-backed harness pointed at `server` for the given runtime target.
pub fn reqwest_harness_for(server: &MockServer, target: RuntimeTarget) -> Harness<ReqwestTransport> {
	let config = ClientConfig::builder(
		Url::parse(&server.base_url()).expect("Failed to parse mock server URL."),
	)
	.target(target)
	.build()
	.expect("Failed to build client configuration fixture.");
	let transport = ReqwestTransport::for_target(config.target)
		.expect("Failed to build reqwest transport fixture.");

	Harness::new(config, Arc::new(transport))
}

#[derive(Debug)]
pub struct ScriptedNetworkError;
impl Display for ScriptedNetworkError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Scripted network failure.")
	}
}
impl StdError for ScriptedNetworkError {}

type Responder = dyn Fn(&PreparedRequest) -> Option<ApiResponse> + Send + Sync;

/// In-process transport answering from a closure; `None` simulates a network failure.
pub struct ScriptedTransport {
	responder: Box<Responder>,
	delays: HashMap<String, std::time::Duration>,
	log: Mutex<Vec<PreparedRequest>>,
}
impl ScriptedTransport {
	pub fn new(
		responder: impl Fn(&PreparedRequest) -> Option<ApiResponse> + Send + Sync + 'static,
	) -> Self {
		Self { responder: Box::new(responder), delays: HashMap::new(), log: Mutex::new(Vec::new()) }
	}

	pub fn with_delay(mut self, path: &str, delay: std::time::Duration) -> Self {
		self.delays.insert(path.to_owned(), delay);

		self
	}

	pub fn calls_to(&self, path: &str) -> usize {
		self.log.lock().iter().filter(|request| request.url.path() == path).count()
	}

	pub fn requests(&self) -> Vec<PreparedRequest> {
		self.log.lock().clone()
	}
}
impl HttpTransport for ScriptedTransport {
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			self.log.lock().push(request.clone());

			if let Some(delay) = self.delays.get(request.url.path()) {
				tokio::time::sleep(*delay).await;
			}

			(self.responder)(&request).ok_or_else(|| TransportError::network(ScriptedNetworkError))
		})
	}
}

pub fn json_response(status: u16, body: serde_json::Value) -> ApiResponse {
	ApiResponse::new(status, body.to_string())
}
