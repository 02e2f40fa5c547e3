use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Issues activation ids and remembers which one is live.
///
/// An activation issues an id, marks it live once fully installed and retires
/// it on teardown. Work scheduled on behalf of an activation checks
/// [`GenerationClock::is_live`] before acting, so leftovers of an earlier
/// activation turn into no-ops. Id 0 is never issued and stands for "none live".
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	inner: Arc<Slots>,
}

#[derive(Debug, Default)]
struct Slots {
	issued: AtomicU64,
	live: AtomicU64,
}

impl GenerationClock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Issues a fresh id. Ids are strictly increasing and never 0.
	pub fn issue(&self) -> u64 {
		self.inner.issued.fetch_add(1, Ordering::AcqRel) + 1
	}

	/// Marks `generation` as the live activation, replacing any other.
	pub fn activate(&self, generation: u64) {
		self.inner.live.store(generation, Ordering::Release);
	}

	/// Clears the live activation if it is still `generation`.
	///
	/// Returns false when another activation already replaced it.
	pub fn retire(&self, generation: u64) -> bool {
		self.inner
			.live
			.compare_exchange(generation, 0, Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
	}

	pub fn is_live(&self, generation: u64) -> bool {
		generation != 0 && self.inner.live.load(Ordering::Acquire) == generation
	}

	/// The live activation, if any.
	pub fn live(&self) -> Option<u64> {
		match self.inner.live.load(Ordering::Acquire) {
			0 => None,
			generation => Some(generation),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn nothing_is_live_until_activated() {
		let clock = GenerationClock::new();
		let first = clock.issue();
		assert_eq!(first, 1);
		assert_eq!(clock.live(), None);
		assert!(!clock.is_live(first));

		clock.activate(first);
		assert!(clock.clone().is_live(first));
		assert!(!clock.is_live(0));
	}

	#[test]
	fn retiring_a_replaced_activation_is_a_no_op() {
		let clock = GenerationClock::new();
		let old = clock.issue();
		clock.activate(old);
		let new = clock.issue();
		clock.activate(new);

		assert!(!clock.retire(old));
		assert_eq!(clock.live(), Some(new));
		assert!(clock.retire(new));
		assert_eq!(clock.live(), None);
	}
}
