//! Callbacks installed with the host shell and the remote model.

use std::sync::Arc;

use folio_worker::{DeferredStep, TaskClass, spawn};
use futures::FutureExt;

use super::SessionLifecycle;
use crate::collab::{BackNavigation, BackNavigationHandler, RouteMatchedHandler, RouterCapability, SessionExpiredHandler};
use crate::document::DocumentContext;
use crate::events::SessionEvent;

impl SessionLifecycle {
	/// Interceptor for back navigation while the session is active.
	///
	/// Leaving the guarded object asks for data-loss confirmation first and
	/// discards the session once confirmed; any other back navigation proceeds.
	pub(super) fn back_navigation_handler(&self, context: &DocumentContext, router: Arc<dyn RouterCapability>) -> BackNavigationHandler {
		let weak = Arc::downgrade(&self.inner);
		let context = context.clone();
		Arc::new(move || {
			let weak = weak.clone();
			let context = context.clone();
			let router = Arc::clone(&router);
			async move {
				let Some(inner) = weak.upgrade() else {
					return BackNavigation::Proceed;
				};
				if !router.is_back_out_of_guard() {
					return BackNavigation::Proceed;
				}
				if !inner.dialogs.confirm_data_loss().await {
					tracing::debug!(path = %context.path(), "session.back_cancelled");
					return BackNavigation::Stay;
				}
				let lifecycle = SessionLifecycle { inner };
				if let Err(err) = lifecycle.discard_session(&context).await {
					tracing::warn!(error = %err, "session.back_discard_failed");
				}
				BackNavigation::Proceed
			}
			.boxed()
		})
	}

	pub(super) fn session_timeout_handler(&self, context: &DocumentContext) -> SessionExpiredHandler {
		let weak = Arc::downgrade(&self.inner);
		let context = context.clone();
		Arc::new(move || {
			if let Some(inner) = weak.upgrade() {
				SessionLifecycle { inner }.on_session_expired(&context);
			}
		})
	}

	pub(super) fn route_matched_handler(&self, context: &DocumentContext) -> RouteMatchedHandler {
		let weak = Arc::downgrade(&self.inner);
		let context = context.clone();
		Arc::new(move |hash: &str| {
			if let Some(inner) = weak.upgrade() {
				SessionLifecycle { inner }.on_route_matched(hash, &context);
			}
		})
	}

	/// Shows the expiry notice; confirming it tears the session down and
	/// navigates back from `context`.
	///
	/// Only one notice at a time is the modal primitive's concern.
	fn on_session_expired(&self, context: &DocumentContext) {
		let path = context.path();
		tracing::warn!(path = %path, "session.expired");
		self.inner.dialogs.clear_transient_messages();
		self.inner.events.emit(SessionEvent::SessionExpired { path });

		let lifecycle = self.clone();
		let context = context.clone();
		spawn(TaskClass::Callback, async move {
			lifecycle.inner.dialogs.notify_session_expired().await;
			lifecycle.end_session();
			match lifecycle.inner.router() {
				Some(router) => router.navigate_back_from(&context),
				None => tracing::info!("session.expired_without_router"),
			}
		});
	}

	/// Discards the session once the user left the guarded object.
	///
	/// An empty hash means the user left the app altogether.
	fn on_route_matched(&self, hash: &str, context: &DocumentContext) {
		let Some(router) = self.inner.router() else {
			return;
		};
		if !hash.is_empty() && router.check_target_against_guard(hash) {
			return;
		}
		tracing::debug!(hash, path = %context.path(), "session.left_guarded_object");

		let lifecycle = self.clone();
		let context = context.clone();
		spawn(TaskClass::Callback, async move {
			// Failure is already logged by discard_session.
			let _ = lifecycle.discard_session(&context).await;
		});

		// A later listing refresh must not reuse the expired session.
		let remote = Arc::clone(&self.inner.remote);
		self.inner
			.deferrer
			.defer(DeferredStep::from_fn("clear-session-context", move || remote.clear_session_context()));
	}
}
