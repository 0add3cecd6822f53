//! Single-flight coordination for token refreshes.
//!
//! One [`RefreshCoordinator`] lives inside each client. The first caller that needs a new token
//! becomes the leader and performs the reissue call; every caller arriving while that call is in
//! flight is queued and settled with the leader's outcome, so a burst of expiring requests costs
//! exactly one network refresh. The leader holds a [`LeaderGuard`] whose drop clears the
//! in-progress flag even if the leader's future is dropped mid-call; queued callers then see the
//! refresh as abandoned and join again, so one of them leads the next attempt.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::BearerToken, obs};

/// Shared outcome broadcast to queued callers.
pub(crate) type RefreshOutcome = Result<BearerToken, RefreshFailure>;

/// Channel end of a queued caller; dropping it unsent marks the refresh as abandoned.
type WaiterSender = oneshot::Sender<RefreshOutcome>;

/// Cloneable summary of a failed refresh, delivered to queued callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshFailure {
	/// The server reported the refresh credential itself as expired.
	pub session_expired: bool,
	/// Human-readable failure reason.
	pub reason: String,
}
impl From<RefreshFailure> for Error {
	fn from(failure: RefreshFailure) -> Self {
		if failure.session_expired {
			Error::SessionExpired { message: failure.reason }
		} else {
			Error::RefreshFailed { reason: failure.reason }
		}
	}
}
impl From<&Error> for RefreshFailure {
	fn from(err: &Error) -> Self {
		match err {
			Error::SessionExpired { message } =>
				Self { session_expired: true, reason: message.clone() },
			Error::RefreshFailed { reason } => Self { session_expired: false, reason: reason.clone() },
			other => Self { session_expired: false, reason: other.to_string() },
		}
	}
}

#[derive(Debug, Default)]
struct RefreshState {
	in_progress: bool,
	waiters: Vec<WaiterSender>,
}

/// In-progress flag plus the queue of callers waiting on the in-flight refresh.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Returns `true` while a refresh call is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().in_progress
	}

	/// Number of callers currently queued behind the in-flight refresh.
	pub fn pending_waiters(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Refresh counters.
	///
	/// An attempt is counted per claimed leadership, so a leader that reuses a token another
	/// flow already rotated counts as an attempt without a reissue call.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Either claims leadership of a new refresh or queues behind the running one.
	pub(crate) fn join(&self) -> Ticket<'_> {
		let mut state = self.state.lock();

		if state.in_progress {
			let (tx, rx) = oneshot::channel();

			state.waiters.push(tx);
			self.metrics.record_coalesced();
			obs::refresh_joined(state.waiters.len());

			return Ticket::Waiter(Waiter(rx));
		}

		state.in_progress = true;
		self.metrics.record_attempt();

		Ticket::Leader(LeaderGuard { coordinator: self, settled: false })
	}

	fn release(&self) -> Vec<WaiterSender> {
		let mut state = self.state.lock();

		state.in_progress = false;

		std::mem::take(&mut state.waiters)
	}

	fn finish(&self, outcome: RefreshOutcome) {
		let waiters = self.release();

		match &outcome {
			Ok(_) => self.metrics.record_success(),
			Err(_) => self.metrics.record_failure(),
		}

		obs::refresh_settled(waiters.len(), outcome.is_ok());

		for waiter in waiters {
			// A waiter whose caller gave up has dropped its receiver.
			let _ = waiter.send(outcome.clone());
		}
	}
}

/// Role assigned to a caller that needs a fresh token.
pub(crate) enum Ticket<'a> {
	/// The caller must perform the refresh and settle the guard.
	Leader(LeaderGuard<'a>),
	/// The caller awaits the leader's outcome.
	Waiter(Waiter),
}

/// Receiver side of a queued caller.
pub(crate) struct Waiter(oneshot::Receiver<RefreshOutcome>);
impl Waiter {
	/// Resolves with the leader's outcome, or `None` when the leader was dropped before settling.
	pub(crate) async fn outcome(self) -> Option<RefreshOutcome> {
		self.0.await.ok()
	}
}

/// Leadership of the in-flight refresh; settles every waiter at most once.
pub(crate) struct LeaderGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl LeaderGuard<'_> {
	/// Broadcasts `outcome` to every queued caller and clears the in-progress flag.
	pub(crate) fn settle(mut self, outcome: RefreshOutcome) {
		self.settled = true;
		self.coordinator.finish(outcome);
	}
}
impl Drop for LeaderGuard<'_> {
	fn drop(&mut self) {
		if !self.settled {
			let waiters = self.coordinator.release();

			obs::refresh_abandoned(waiters.len());
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn waiters_share_the_leader_outcome() {
		let coordinator = RefreshCoordinator::default();
		let Ticket::Leader(leader) = coordinator.join() else {
			panic!("First caller should lead the refresh.");
		};
		let Ticket::Waiter(first) = coordinator.join() else {
			panic!("Second caller should queue.");
		};
		let Ticket::Waiter(second) = coordinator.join() else {
			panic!("Third caller should queue.");
		};

		assert!(coordinator.is_refreshing());
		assert_eq!(coordinator.pending_waiters(), 2);

		leader.settle(Ok(BearerToken::new("fresh")));

		assert!(!coordinator.is_refreshing());
		assert_eq!(coordinator.pending_waiters(), 0);
		assert_eq!(first.outcome().await, Some(Ok(BearerToken::new("fresh"))));
		assert_eq!(second.outcome().await, Some(Ok(BearerToken::new("fresh"))));
		assert_eq!(coordinator.metrics().attempts(), 1);
		assert_eq!(coordinator.metrics().coalesced(), 2);
		assert_eq!(coordinator.metrics().successes(), 1);
	}

	#[tokio::test]
	async fn dropped_leader_abandons_waiters_and_clears_flag() {
		let coordinator = RefreshCoordinator::default();
		let leader = coordinator.join();
		let Ticket::Waiter(waiter) = coordinator.join() else {
			panic!("Second caller should queue.");
		};

		drop(leader);

		assert!(!coordinator.is_refreshing());

		assert_eq!(waiter.outcome().await, None);
		assert_eq!(coordinator.metrics().failures(), 0);
		assert!(matches!(coordinator.join(), Ticket::Leader(_)));
		assert_eq!(coordinator.metrics().attempts(), 2);
	}

	#[test]
	fn failures_map_back_to_client_errors() {
		let expired: Error =
			RefreshFailure { session_expired: true, reason: "세션이 만료되었습니다".into() }.into();

		assert!(matches!(expired, Error::SessionExpired { ref message } if message == "세션이 만료되었습니다"));

		let failed: Error = RefreshFailure::from(&Error::Cancelled).into();

		assert!(matches!(failed, Error::RefreshFailed { .. }));
	}
}
