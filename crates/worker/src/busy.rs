use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Non-reentrant UI busy flag.
///
/// Unlike [`crate::TaskSerializer`] the lock never queues: a second caller is
/// refused while a [`BusyGuard`] is alive. Release happens when the guard is
/// dropped, so every exit path of the holder releases it.
#[derive(Debug, Clone, Default)]
pub struct BusyLock {
	held: Arc<AtomicBool>,
}

impl BusyLock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Takes the lock, or returns `None` if it is already held.
	pub fn try_lock(&self) -> Option<BusyGuard> {
		self.held
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| {
				tracing::trace!("busy.lock");
				BusyGuard {
					held: Arc::clone(&self.held),
				}
			})
	}

	/// Returns true while some guard is alive.
	pub fn is_locked(&self) -> bool {
		self.held.load(Ordering::Acquire)
	}
}

/// Guard holding a [`BusyLock`].
#[derive(Debug)]
pub struct BusyGuard {
	held: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
	fn drop(&mut self) {
		let was_held = self.held.swap(false, Ordering::AcqRel);
		debug_assert!(was_held, "busy lock released twice");
		tracing::trace!("busy.unlock");
	}
}
