// self
use crate::{
	_prelude::*,
	obs::OpKind,
	platform::{ResetReason, RuntimeTarget},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("leave_session.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn alert_presented(target: RuntimeTarget, message: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(runtime = target.as_str(), alert = message, "alert presented");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (target, message);
	}
}

pub(crate) fn session_reset(reason: ResetReason) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(reason = reason.as_str(), "session reset to entry point");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = reason;
	}
}

pub(crate) fn refresh_joined(waiters: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(waiters, "joined in-flight token refresh");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = waiters;
	}
}

pub(crate) fn refresh_settled(waiters: usize, success: bool) {
	#[cfg(feature = "tracing")]
	{
		if success {
			tracing::debug!(waiters, "token refresh completed");
		} else {
			tracing::warn!(waiters, "token refresh failed");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (waiters, success);
	}
}

pub(crate) fn refresh_abandoned(waiters: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(waiters, "token refresh abandoned by its leader; waiters will retry");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = waiters;
	}
}

pub(crate) fn token_clear_failed(error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(error = %error, "failed to clear stored token");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

pub(crate) fn token_remaining(seconds: i64) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(seconds, "seconds until token expiry");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = seconds;
	}
}

pub(crate) fn token_expired() {
	#[cfg(feature = "tracing")]
	{
		tracing::info!("token expired");
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn event_helpers_are_callable_without_subscriber() {
		alert_presented(RuntimeTarget::Native, "msg");
		session_reset(ResetReason::SessionExpired);
		refresh_joined(2);
		refresh_settled(2, false);
		refresh_abandoned(1);
		token_remaining(12);
		token_expired();
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OpSpan::new(OpKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
