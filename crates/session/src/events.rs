//! Session event bus.

use tokio::sync::broadcast;

/// Notifications emitted by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	/// A guard registration was installed for the document at `path`.
	SessionStarted { path: String },
	/// The guard registration was removed.
	SessionEnded,
	/// The remote service reported the session as expired.
	SessionExpired { path: String },
	/// Records were created in a collection.
	Created { paths: Vec<String> },
	/// Documents were deleted.
	Deleted { paths: Vec<String> },
}

/// Broadcast channel for [`SessionEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
	tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity.max(1));
		Self { tx }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.tx.subscribe()
	}

	/// Sends `event` to current subscribers. Having none is not an error.
	pub fn emit(&self, event: SessionEvent) {
		let receivers = self.tx.send(event).unwrap_or(0);
		tracing::trace!(receivers, "events.emit");
	}
}
