// crates.io
use tokio::{runtime::Handle, task::JoinHandle};
// self
use crate::{_prelude::*, auth::BearerToken, obs};

/// Diagnostic timer that logs the remaining lifetime of the stored token.
///
/// Each [`watch`](ExpiryMonitor::watch) replaces the previous timer; the timer ticks
/// immediately, then once per interval, and stops by itself once the token has expired.
/// Nothing in the request path reads it.
#[derive(Debug)]
pub struct ExpiryMonitor {
	interval: std::time::Duration,
	task: Mutex<Option<JoinHandle<()>>>,
}
impl ExpiryMonitor {
	/// Creates an idle monitor ticking every `interval`.
	pub fn new(interval: std::time::Duration) -> Self {
		Self { interval, task: Mutex::new(None) }
	}

	/// Starts watching `token`, replacing any running timer.
	///
	/// Tokens without a readable expiry, or calls made outside a Tokio runtime, only stop the
	/// previous timer.
	pub fn watch(&self, token: &BearerToken) {
		let expires_at = token.expires_at();
		let handle = Handle::try_current().ok();
		let (Some(expires_at), Some(handle), false) = (expires_at, handle, self.interval.is_zero())
		else {
			self.stop();

			return;
		};
		let interval = self.interval;
		let task = handle.spawn(async move {
			let mut ticker = tokio::time::interval(interval);

			loop {
				ticker.tick().await;

				let remaining = expires_at - OffsetDateTime::now_utc();

				if !remaining.is_positive() {
					obs::token_expired();

					break;
				}

				obs::token_remaining(remaining.whole_seconds());
			}
		});

		if let Some(previous) = self.task.lock().replace(task) {
			previous.abort();
		}
	}

	/// Cancels the running timer, if any.
	pub fn stop(&self) {
		if let Some(task) = self.task.lock().take() {
			task.abort();
		}
	}

	/// Returns `true` while a timer is running.
	pub fn is_active(&self) -> bool {
		self.task.lock().as_ref().is_some_and(|task| !task.is_finished())
	}
}
impl Drop for ExpiryMonitor {
	fn drop(&mut self) {
		self.stop();
	}
}
