//! Session establishment and teardown.
//!
//! # Purpose
//!
//! - Protect unsaved work while a document is edited inside a host shell the
//!   editor does not control.
//! - Install, and later remove, every host-side hook that protection needs.
//!
//! # Mental model
//!
//! - A session is `Inactive`, `Starting` or `Active`.
//!   [`SessionLifecycle::start_session`] reserves the slot (`Starting`), installs
//!   the hooks and then commits one [`GuardRegistration`] (`Active`);
//!   [`SessionLifecycle::end_session`] removes it. Discard, save-and-exit and
//!   session timeout all end in `end_session`.
//! - While active, the host holds: a navigation guard keyed on the document, a
//!   back-navigation interceptor, a [`DirtyStateProvider`], and a route-matched
//!   handler. The remote model holds a session-timeout handler.
//!
//! # Invariants
//!
//! - At most one guard registration per editor. A start reserves the slot
//!   before installing anything, so a second start is refused even while the
//!   first is still talking to the host.
//! - `end_session` is idempotent; each cleanup step checks its own target.
//! - Callbacks given to the host never return errors into it; they log.
//! - The navigation guard is registered one tick late, after the host applied
//!   its pending hash update. The step is skipped if the session that scheduled
//!   it is no longer the active one.
//!
//! # Failure modes and recovery
//!
//! - No host or no router: start is refused and logged; the editor stays usable
//!   without navigation protection.
//! - Discard rejected by the remote service: the session is still ended, and the
//!   error is returned to the caller.

mod handlers;

use std::sync::Arc;

use folio_worker::{DeferredStep, Deferrer, GenerationClock};
use parking_lot::Mutex;

use crate::collab::{Collaborators, Dialogs, HostShell, RemoteModel, RouterCapability, SubscriptionId};
use crate::dirty::DirtyStateProvider;
use crate::document::DocumentContext;
use crate::error::{RemoteError, SessionRejected};
use crate::events::{EventBus, SessionEvent};
use crate::state::{EditMode, SessionState};

/// Where the editor is in the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	Inactive,
	/// A start reserved the slot and is installing its hooks.
	Starting,
	Active,
}

/// Callback ids handed out by the host and the remote model.
#[derive(Debug, Clone, Copy)]
struct InstalledHooks {
	provider_id: SubscriptionId,
	route_id: SubscriptionId,
	timeout_id: SubscriptionId,
}

/// Hooks installed with the host while a session is active.
#[derive(Debug)]
struct GuardRegistration {
	generation: u64,
	path: String,
	baseline_hash: String,
	provider: Arc<DirtyStateProvider>,
	hooks: InstalledHooks,
}

/// The single registration slot of an editor.
///
/// A start reserves the slot before touching the host, so a concurrent start
/// sees it occupied. `Cancelled` keeps the slot reserved until a start that
/// lost against `end_session` has removed its hooks again.
#[derive(Debug)]
enum Slot {
	Empty,
	Starting(u64),
	Cancelled(u64),
	Active(GuardRegistration),
}

struct LifecycleInner {
	state: SessionState,
	remote: Arc<dyn RemoteModel>,
	host: Option<Arc<dyn HostShell>>,
	dialogs: Arc<dyn Dialogs>,
	deferrer: Arc<dyn Deferrer>,
	events: EventBus,
	generations: GenerationClock,
	slot: Mutex<Slot>,
}

impl LifecycleInner {
	fn router(&self) -> Option<Arc<dyn RouterCapability>> {
		self.host.as_ref().and_then(|host| host.router())
	}

	fn with_registration<R>(&self, f: impl FnOnce(&GuardRegistration) -> R) -> Option<R> {
		match &*self.slot.lock() {
			Slot::Active(reg) => Some(f(reg)),
			_ => None,
		}
	}
}

/// Owner of the session state machine and the guard registration of one editor.
#[derive(Clone)]
pub struct SessionLifecycle {
	inner: Arc<LifecycleInner>,
}

impl SessionLifecycle {
	pub fn new(state: SessionState, collab: &Collaborators, events: EventBus) -> Self {
		Self {
			inner: Arc::new(LifecycleInner {
				state,
				remote: Arc::clone(&collab.remote),
				host: collab.host.clone(),
				dialogs: Arc::clone(&collab.dialogs),
				deferrer: Arc::clone(&collab.deferrer),
				events,
				generations: GenerationClock::new(),
				slot: Mutex::new(Slot::Empty),
			}),
		}
	}

	pub fn phase(&self) -> SessionPhase {
		match &*self.inner.slot.lock() {
			Slot::Empty => SessionPhase::Inactive,
			Slot::Starting(_) | Slot::Cancelled(_) => SessionPhase::Starting,
			Slot::Active(_) => SessionPhase::Active,
		}
	}

	/// Hash captured as the first safe navigation target of the active session.
	pub fn guard_baseline(&self) -> Option<String> {
		self.inner.with_registration(|reg| reg.baseline_hash.clone())
	}

	/// Provider registered with the host for the active session.
	pub fn dirty_state_provider(&self) -> Option<Arc<DirtyStateProvider>> {
		self.inner.with_registration(|reg| Arc::clone(&reg.provider))
	}

	/// Starts protecting `context`. Returns false, after logging why, when the
	/// session could not be started.
	pub fn start_session(&self, context: &DocumentContext) -> bool {
		match self.try_start_session(context) {
			Ok(()) => true,
			Err(reason) => {
				tracing::info!(path = %context.path(), %reason, "session.start_skipped");
				false
			}
		}
	}

	fn try_start_session(&self, context: &DocumentContext) -> Result<(), SessionRejected> {
		let host = self.inner.host.clone().ok_or(SessionRejected::MissingHost)?;
		let router = host.router().ok_or(SessionRejected::MissingRouter)?;
		let generation = self.reserve()?;

		let baseline_hash = router.hash();
		let path = context.path();

		host.set_back_navigation_handler(Some(self.back_navigation_handler(context, Arc::clone(&router))));
		let provider = Arc::new(DirtyStateProvider::new(
			generation,
			self.inner.generations.clone(),
			Arc::clone(&router),
			Arc::downgrade(&host),
			Arc::clone(&self.inner.deferrer),
			baseline_hash.clone(),
		));
		let hooks = InstalledHooks {
			provider_id: host.register_dirty_state_provider(Arc::clone(&provider)),
			timeout_id: self.inner.remote.attach_session_timeout(self.session_timeout_handler(context)),
			route_id: host.on_route_matched(self.route_matched_handler(context)),
		};

		let registration = GuardRegistration {
			generation,
			path: path.clone(),
			baseline_hash,
			provider,
			hooks,
		};
		if let Err(registration) = self.commit(registration) {
			self.uninstall(&registration.hooks);
			host.set_back_navigation_handler(None);
			self.release(generation);
			tracing::debug!(path = %path, generation, "session.start_cancelled");
			return Err(SessionRejected::EndedWhileStarting);
		}

		self.defer_guard_registration(generation, router, context.guard_key());
		tracing::info!(path = %path, generation, "session.start");
		self.inner.events.emit(SessionEvent::SessionStarted { path });
		Ok(())
	}

	/// Claims the empty slot for a new activation.
	fn reserve(&self) -> Result<u64, SessionRejected> {
		let mut slot = self.inner.slot.lock();
		if !matches!(*slot, Slot::Empty) {
			return Err(SessionRejected::AlreadyActive);
		}
		let generation = self.inner.generations.issue();
		*slot = Slot::Starting(generation);
		Ok(generation)
	}

	/// Turns the reservation into the active registration, unless the session
	/// was ended meanwhile.
	fn commit(&self, registration: GuardRegistration) -> Result<(), GuardRegistration> {
		let mut slot = self.inner.slot.lock();
		if !matches!(*slot, Slot::Starting(generation) if generation == registration.generation) {
			return Err(registration);
		}
		self.inner.generations.activate(registration.generation);
		self.inner.state.set_session_on(true);
		*slot = Slot::Active(registration);
		Ok(())
	}

	/// Frees a slot left `Cancelled` by `end_session`.
	fn release(&self, generation: u64) {
		let mut slot = self.inner.slot.lock();
		if matches!(*slot, Slot::Cancelled(cancelled) if cancelled == generation) {
			*slot = Slot::Empty;
		}
	}

	fn uninstall(&self, hooks: &InstalledHooks) {
		if let Some(host) = &self.inner.host {
			host.deregister_dirty_state_provider(hooks.provider_id);
			host.off_route_matched(hooks.route_id);
		}
		self.inner.remote.detach_session_timeout(hooks.timeout_id);
	}

	fn defer_guard_registration(&self, generation: u64, router: Arc<dyn RouterCapability>, key: String) {
		let clock = self.inner.generations.clone();
		self.inner.deferrer.defer(DeferredStep::from_fn("register-navigation-guard", move || {
			if clock.is_live(generation) {
				router.register_navigation_guard(&key);
			} else {
				tracing::warn!(generation, key = %key, "session.guard_skipped");
			}
		}));
	}

	/// Removes every hook installed by [`Self::start_session`] and returns to display mode.
	///
	/// Safe to call repeatedly or without an active session. A start still
	/// installing its hooks is cancelled and removes them itself.
	pub fn end_session(&self) {
		let registration = {
			let mut slot = self.inner.slot.lock();
			match std::mem::replace(&mut *slot, Slot::Empty) {
				Slot::Active(reg) => {
					self.inner.generations.retire(reg.generation);
					self.inner.state.set_session_on(false);
					Some(reg)
				}
				Slot::Starting(generation) | Slot::Cancelled(generation) => {
					*slot = Slot::Cancelled(generation);
					None
				}
				Slot::Empty => None,
			}
		};

		if let Some(router) = self.inner.router() {
			router.discard_navigation_guard();
		}
		if let Some(reg) = &registration {
			self.uninstall(&reg.hooks);
		}
		self.inner.state.set_edit_mode(Some(EditMode::Display), None);
		if let Some(host) = &self.inner.host {
			host.set_back_navigation_handler(None);
		}

		if let Some(reg) = registration {
			tracing::info!(path = %reg.path, generation = reg.generation, "session.end");
			self.inner.events.emit(SessionEvent::SessionEnded);
		}
	}

	/// Discards the unpublished or session copy of `context`, then ends the session.
	///
	/// The session is ended even when the discard was rejected.
	pub async fn discard_session(&self, context: &DocumentContext) -> Result<Option<DocumentContext>, RemoteError> {
		let outcome = self.discard_remote(context).await;
		if let Err(err) = &outcome {
			tracing::error!(path = %context.path(), error = %err, "session.discard_failed");
		}
		self.end_session();
		outcome
	}

	async fn discard_remote(&self, context: &DocumentContext) -> Result<Option<DocumentContext>, RemoteError> {
		let remote = &self.inner.remote;
		let discarded = remote.discard_unpublished(context).await?;
		if let Some(handle) = &discarded {
			if handle.has_pending_changes() {
				remote.reset_changes(handle).await?;
			}
			remote.refresh(handle).await?;
		}
		Ok(discarded)
	}
}
