//! Authenticated client orchestrating token attachment, refreshes, and retries.
//!
//! [`SessionClient::send`] runs every request through the same pipeline:
//!
//! 1. Read the stored token; if it expires within the refresh window, refresh first.
//! 2. Attach `Authorization: Bearer <token>` (never on the login or reissue endpoints).
//! 3. On `401 REFRESH_TOKEN_EXPIRED`, end the session. On `401 TOKEN_EXPIRED`, refresh once and
//!    resubmit. Anything else is alerted and returned as [`Error::RequestFailed`].
//!
//! Refreshes are single-flight per client: see [`crate::refresh`].

pub mod envelope;

pub use envelope::*;

// self
use crate::{
	_prelude::*,
	auth::BearerToken,
	config::ClientConfig,
	error::ConfigError,
	http::{self, ApiRequest, ApiResponse, HttpTransport, PreparedRequest},
	obs::{self, ExpiryMonitor, OpKind, OpOutcome, OpSpan},
	platform::{
		AlertPresenter, LogAlertPresenter, NoopResetHandler, ResetReason, SessionResetHandler,
	},
	refresh::{RefreshCoordinator, RefreshFailure, RefreshMetrics, Ticket},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestSessionClient = SessionClient<ReqwestTransport>;

const DEFAULT_SESSION_EXPIRED_MESSAGE: &str = "The session has expired. Please sign in again";

#[derive(Deserialize)]
struct LoginResponse {
	token: Option<String>,
}

#[derive(Deserialize)]
struct ReissueResponse {
	access_token: Option<String>,
}

/// Authenticated JSON client for a single backend.
///
/// The client owns its transport, token store, and platform capabilities, plus the refresh
/// coordinator that makes concurrent refreshes single-flight. Construct it once at startup
/// and share clones; clones share the coordinator and the expiry monitor.
pub struct SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Persistent token storage.
	pub store: Arc<dyn TokenStore>,
	/// Surface for server-provided failure messages.
	pub alerts: Arc<dyn AlertPresenter>,
	/// Hook that returns the host to its logged-out entry point.
	pub reset: Arc<dyn SessionResetHandler>,
	/// Validated client configuration.
	pub config: ClientConfig,
	refresh: Arc<RefreshCoordinator>,
	monitor: Arc<ExpiryMonitor>,
}
impl<T> SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	///
	/// Alerts go to the log and resets are no-ops until replaced with
	/// [`with_alerts`](Self::with_alerts) and [`with_reset_handler`](Self::with_reset_handler).
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn TokenStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let monitor = ExpiryMonitor::new(config.monitor_interval_std());

		Self {
			transport: transport.into(),
			store,
			alerts: Arc::new(LogAlertPresenter::new(config.target)),
			reset: Arc::new(NoopResetHandler),
			config,
			refresh: Default::default(),
			monitor: Arc::new(monitor),
		}
	}

	/// Replaces the alert presenter.
	pub fn with_alerts(mut self, alerts: Arc<dyn AlertPresenter>) -> Self {
		self.alerts = alerts;

		self
	}

	/// Replaces the logged-out reset handler.
	pub fn with_reset_handler(mut self, reset: Arc<dyn SessionResetHandler>) -> Self {
		self.reset = reset;

		self
	}

	/// Refresh coordinator shared by this client and its clones.
	pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
		&self.refresh
	}

	/// Refresh counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.refresh.metrics()
	}

	/// Expiry diagnostic monitor.
	pub fn expiry_monitor(&self) -> &ExpiryMonitor {
		&self.monitor
	}

	/// Reads the stored bearer token.
	pub async fn current_token(&self) -> Result<Option<BearerToken>> {
		let stored = self.store.get(&self.config.token_key).await?;

		Ok(stored.filter(|value| !value.is_empty()).map(BearerToken::new))
	}

	/// Exchanges `credentials` at the login endpoint and stores the returned token.
	pub async fn login<B>(&self, credentials: &B) -> Result<BearerToken>
	where
		B: ?Sized + Serialize,
	{
		const KIND: OpKind = OpKind::Login;

		let span = OpSpan::new(KIND, "login");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request =
					ApiRequest::post(self.config.login_path.as_str()).with_json(credentials)?;
				let response = self.send_with_retry(request).await?;
				let token = response
					.json::<Option<LoginResponse>>()?
					.and_then(|body| body.token)
					.filter(|token| !token.is_empty())
					.map(BearerToken::new)
					.ok_or(Error::MissingLoginToken)?;

				self.store_token(&token).await?;

				Ok::<_, Error>(token)
			})
			.await;

		record_outcome(KIND, &result);

		result
	}

	/// Ends the session locally: removes the stored token and stops the expiry monitor.
	pub async fn logout(&self) -> Result<()> {
		self.monitor.stop();
		self.store.remove(&self.config.token_key).await?;

		Ok(())
	}

	/// Forces a token refresh, joining any refresh already in flight.
	pub async fn refresh_token(&self) -> Result<BearerToken> {
		self.refresh_after(None).await
	}

	/// Sends `request` through the full attach/refresh/retry pipeline.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Request;

		let span = OpSpan::new(KIND, "send");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.send_with_retry(request)).await;

		record_outcome(KIND, &result);

		result
	}

	/// Sends `request` unless `cancel` resolves first, in which case the call fails with
	/// [`Error::Cancelled`] without alerting or refreshing.
	pub async fn send_cancellable<F>(&self, request: ApiRequest, cancel: F) -> Result<ApiResponse>
	where
		F: Future<Output = ()>,
	{
		tokio::select! {
			biased;

			_ = cancel => Err(Error::Cancelled),
			result = self.send(request) => result,
		}
	}

	/// `GET`s `path` and decodes the JSON response.
	pub async fn get_json<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send(ApiRequest::get(path)).await?.json()
	}

	/// `POST`s `body` to `path` and decodes the JSON response.
	pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send(ApiRequest::post(path).with_json(body)?).await?.json()
	}

	/// `PUT`s `body` to `path` and decodes the JSON response.
	pub async fn put_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send(ApiRequest::put(path).with_json(body)?).await?.json()
	}

	/// `PATCH`es `path` with `body` and decodes the JSON response.
	pub async fn patch_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send(ApiRequest::patch(path).with_json(body)?).await?.json()
	}

	/// `DELETE`s `path`.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(path)).await
	}

	async fn send_with_retry(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		let credential = self.config.is_credential_path(&request.path);
		let mut token = if credential { None } else { self.authorize().await? };

		loop {
			let response = self.execute(&request, token.as_ref()).await?;

			if response.is_success() {
				return Ok(response);
			}

			let failure = ResponseFailure::from_response(&response);

			match failure.disposition(!credential && !request.is_retried()) {
				Disposition::EndSession => return Err(self.expire_session(failure).await),
				Disposition::RefreshAndRetry => {
					request.mark_retried();
					token = Some(self.refresh_after(token.as_ref()).await?);
				},
				Disposition::Surface => return Err(self.surface(failure)),
			}
		}
	}

	/// Returns the token to attach, refreshing first when it is about to expire.
	async fn authorize(&self) -> Result<Option<BearerToken>> {
		let Some(token) = self.current_token().await? else {
			return Ok(None);
		};

		if token.expires_within(self.config.refresh_window, OffsetDateTime::now_utc()) {
			return self.refresh_after(Some(&token)).await.map(Some);
		}

		Ok(Some(token))
	}

	/// Single-flight entry point; `stale` is the token the caller found unusable.
	///
	/// A waiter whose leader was dropped before settling joins again instead of failing.
	async fn refresh_after(&self, stale: Option<&BearerToken>) -> Result<BearerToken> {
		loop {
			match self.refresh.join() {
				Ticket::Waiter(waiter) =>
					if let Some(outcome) = waiter.outcome().await {
						return outcome.map_err(Error::from);
					},
				Ticket::Leader(guard) => {
					let result = self.lead_refresh(stale).await;

					guard.settle(result.as_ref().cloned().map_err(RefreshFailure::from));

					return result;
				},
			}
		}
	}

	async fn lead_refresh(&self, stale: Option<&BearerToken>) -> Result<BearerToken> {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, "lead_refresh");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				if let Some(current) = self.rotated_since(stale).await? {
					return Ok(current);
				}

				let token = self.reissue().await?;

				self.store_token(&token).await?;

				Ok::<_, Error>(token)
			})
			.await;
		let result = match result {
			Ok(token) => Ok(token),
			Err(err) => {
				let (err, reason) = match err {
					err @ Error::SessionExpired { .. } => (err, ResetReason::SessionExpired),
					err @ Error::RefreshFailed { .. } => (err, ResetReason::RefreshFailed),
					other => (
						Error::RefreshFailed { reason: other.to_string() },
						ResetReason::RefreshFailed,
					),
				};

				self.end_session(reason).await;

				Err(err)
			},
		};

		record_outcome(KIND, &result);

		result
	}

	/// Returns the stored token when another flow already replaced `stale` with a usable one.
	async fn rotated_since(&self, stale: Option<&BearerToken>) -> Result<Option<BearerToken>> {
		let Some(stale) = stale else {
			return Ok(None);
		};
		let current = self.current_token().await?.filter(|current| {
			current != stale
				&& !current.expires_within(self.config.refresh_window, OffsetDateTime::now_utc())
		});

		Ok(current)
	}

	/// Calls the reissue endpoint; the refresh credential travels out-of-band.
	async fn reissue(&self) -> Result<BearerToken> {
		let request = ApiRequest::post(self.config.refresh_path.as_str());
		let response = self
			.execute(&request, None)
			.await
			.map_err(|err| Error::RefreshFailed { reason: err.to_string() })?;

		if !response.is_success() {
			let failure = ResponseFailure::from_response(&response);

			self.present(failure.envelope.message.as_deref());

			return Err(if failure.is_session_expired() {
				Error::SessionExpired { message: session_expired_message(&failure) }
			} else {
				Error::RefreshFailed { reason: failure.describe() }
			});
		}

		response
			.json::<Option<ReissueResponse>>()
			.map_err(|err| Error::RefreshFailed { reason: err.to_string() })?
			.and_then(|body| body.access_token)
			.filter(|token| !token.is_empty())
			.map(BearerToken::new)
			.ok_or_else(|| Error::RefreshFailed {
				reason: "reissue response did not include an access token".into(),
			})
	}

	async fn execute(
		&self,
		request: &ApiRequest,
		token: Option<&BearerToken>,
	) -> Result<ApiResponse> {
		let prepared = self.prepare(request, token)?;

		Ok(self.transport.execute(prepared).await?)
	}

	fn prepare(
		&self,
		request: &ApiRequest,
		token: Option<&BearerToken>,
	) -> Result<PreparedRequest, ConfigError> {
		let mut url = self.config.endpoint(&request.path)?;

		if !request.query.is_empty() {
			url.query_pairs_mut().extend_pairs(request.query.iter());
		}

		let mut headers = http::json_headers();

		if let Some(token) = token {
			headers.push(("authorization".into(), token.header_value()));
		}

		let body = request.body.as_ref().map(serde_json::to_vec).transpose()?;

		Ok(PreparedRequest {
			method: request.method,
			url,
			headers,
			body,
			timeout: self.config.request_timeout_std(),
		})
	}

	async fn store_token(&self, token: &BearerToken) -> Result<()> {
		self.store.set(&self.config.token_key, token.expose().to_owned()).await?;
		self.monitor.watch(token);

		Ok(())
	}

	async fn expire_session(&self, failure: ResponseFailure) -> Error {
		self.present(failure.envelope.message.as_deref());
		self.end_session(ResetReason::SessionExpired).await;

		Error::SessionExpired { message: session_expired_message(&failure) }
	}

	async fn end_session(&self, reason: ResetReason) {
		self.monitor.stop();

		if let Err(err) = self.store.remove(&self.config.token_key).await {
			obs::token_clear_failed(&err);
		}

		self.reset.reset_to_entry(reason);
	}

	fn surface(&self, failure: ResponseFailure) -> Error {
		self.present(failure.envelope.message.as_deref());

		failure.into_request_failed()
	}

	fn present(&self, message: Option<&str>) {
		if let Some(message) = message {
			self.alerts.present(message);
		}
	}
}
#[cfg(feature = "reqwest")]
impl SessionClient<ReqwestTransport> {
	/// Creates a client with its own reqwest transport configured for `config.target`.
	pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
		let transport = ReqwestTransport::for_target(config.target)?;

		Ok(Self::with_transport(config, store, transport))
	}
}
impl<T> Clone for SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			alerts: self.alerts.clone(),
			reset: self.reset.clone(),
			config: self.config.clone(),
			refresh: self.refresh.clone(),
			monitor: self.monitor.clone(),
		}
	}
}
impl<T> Debug for SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("target", &self.config.target)
			.field("refreshing", &self.refresh.is_refreshing())
			.finish()
	}
}

fn record_outcome<V>(kind: OpKind, result: &Result<V>) {
	match result {
		Ok(_) => obs::record_op_outcome(kind, OpOutcome::Success),
		Err(_) => obs::record_op_outcome(kind, OpOutcome::Failure),
	}
}

fn session_expired_message(failure: &ResponseFailure) -> String {
	failure.envelope.message.clone().unwrap_or_else(|| DEFAULT_SESSION_EXPIRED_MESSAGE.into())
}
