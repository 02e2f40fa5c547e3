//! Dirty-state provider polled by the host shell before every navigation.
//!
//! The provider answers whether acting on a navigation would lose unsaved
//! work. The answer is `Option<bool>`: `None` means "no opinion, use the host
//! default" and is returned once the session is gone.
//!
//! Verdicts move through an explicit cycle:
//!
//! ```text
//! Clean ──(dirty verdict)──► Dirty ──(deferred host flag reset)──► Clean
//! ```
//!
//! Once told "dirty" the host keeps its own dirty flag set and stops polling
//! providers. The reset step clears that flag after the host's current turn so
//! the next navigation is checked again.

use std::sync::{Arc, Weak};

use folio_worker::{DeferredStep, Deferrer, GenerationClock};
use parking_lot::Mutex;

use crate::collab::{HostShell, RouterCapability};

/// Outcome of one navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	/// Cannot decide; the host applies its default behaviour.
	Defer,
	/// Navigation is safe.
	Clean,
	/// Navigation would lose unsaved work.
	Dirty,
}

impl Verdict {
	/// The value reported to the host.
	pub fn as_host_answer(self) -> Option<bool> {
		match self {
			Self::Defer => None,
			Self::Clean => Some(false),
			Self::Dirty => Some(true),
		}
	}
}

/// A verdict plus the safe hash to remember afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
	pub verdict: Verdict,
	/// New last-safe hash; only set for [`Verdict::Clean`].
	pub next_safe_hash: Option<String>,
}

impl Decision {
	fn defer() -> Self {
		Self {
			verdict: Verdict::Defer,
			next_safe_hash: None,
		}
	}

	fn clean(target: &str) -> Self {
		Self {
			verdict: Verdict::Clean,
			next_safe_hash: Some(target.to_string()),
		}
	}

	fn dirty() -> Self {
		Self {
			verdict: Verdict::Dirty,
			next_safe_hash: None,
		}
	}
}

/// Decides whether navigating to `target` is safe.
///
/// Depends only on its arguments and the router's answers.
pub fn decide(target: &str, last_safe: &str, session_on: bool, router: &dyn RouterCapability) -> Decision {
	if !session_on {
		return Decision::defer();
	}
	if !router.is_navigation_finalized() {
		return Decision::clean(target);
	}
	if target == last_safe {
		// Refresh or leave from the very same place.
		return Decision::dirty();
	}
	if router.check_target_against_guard(target) || router.is_guard_crossing_allowed_by_user() {
		return Decision::clean(target);
	}
	Decision::dirty()
}

/// Host-facing provider bound to the hash captured when the session started.
///
/// A provider belongs to one session activation. Once that activation is no
/// longer live it defers, even if a later session is running.
pub struct DirtyStateProvider {
	generation: u64,
	clock: GenerationClock,
	router: Arc<dyn RouterCapability>,
	host: Weak<dyn HostShell>,
	deferrer: Arc<dyn Deferrer>,
	safe_hash: Mutex<String>,
}

impl DirtyStateProvider {
	pub(crate) fn new(
		generation: u64,
		clock: GenerationClock,
		router: Arc<dyn RouterCapability>,
		host: Weak<dyn HostShell>,
		deferrer: Arc<dyn Deferrer>,
		baseline_hash: String,
	) -> Self {
		Self {
			generation,
			clock,
			router,
			host,
			deferrer,
			safe_hash: Mutex::new(baseline_hash),
		}
	}

	/// Last hash known to be safe to stay on.
	pub fn last_safe_hash(&self) -> String {
		self.safe_hash.lock().clone()
	}

	/// Answers the host's question for a navigation to `target`.
	pub fn is_dirty(&self, target: &str) -> Option<bool> {
		let last_safe = self.last_safe_hash();
		let decision = decide(target, &last_safe, self.clock.is_live(self.generation), self.router.as_ref());
		tracing::debug!(target, last_safe = %last_safe, verdict = ?decision.verdict, "dirty.decide");

		match decision.verdict {
			Verdict::Dirty => self.schedule_host_reset(),
			Verdict::Clean => {
				if let Some(next) = decision.next_safe_hash {
					*self.safe_hash.lock() = next;
				}
			}
			Verdict::Defer => {}
		}
		decision.verdict.as_host_answer()
	}

	fn schedule_host_reset(&self) {
		let host = self.host.clone();
		self.deferrer.defer(DeferredStep::from_fn("reset-host-dirty-flag", move || {
			if let Some(host) = host.upgrade() {
				host.set_dirty_flag(false);
			}
		}));
	}
}

impl std::fmt::Debug for DirtyStateProvider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DirtyStateProvider")
			.field("generation", &self.generation)
			.field("safe_hash", &*self.safe_hash.lock())
			.finish_non_exhaustive()
	}
}
