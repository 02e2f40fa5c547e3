//! Collaborator interfaces consumed by the coordinator.
//!
//! # Purpose
//!
//! - Describe the narrow surface of the remote-data service and of the host
//!   shell that the coordinator depends on.
//! - Keep wire formats, rendering and dialog plumbing on the other side of
//!   these traits.
//!
//! # Mental model
//!
//! - [`RemoteModel`] owns documents. The coordinator asks it to create,
//!   delete and discard, and to report metadata.
//! - [`HostShell`] owns navigation. The coordinator installs callbacks into it
//!   while a session is active. Hosts without a router return `None` from
//!   [`HostShell::router`]; callers branch on that instead of probing.
//! - [`Dialogs`] and [`ListControl`] are the UI pieces the coordinator drives.
//!
//! # Invariants
//!
//! - Callbacks handed to the host must not panic or return errors into it.
//! - The host stops polling a dirty-state provider once it answered "dirty"
//!   until its own dirty flag is reset; see [`crate::dirty`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::dirty::DirtyStateProvider;
use crate::document::{ActivityFlag, Collection, CreationRequest, DocumentContext, PropertyKind};
use crate::edit_mode::{NewActionAnnotation, ProgrammingModel};
use crate::error::RemoteError;

/// Identifier returned by the collaborators for an installed callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback invoked when the remote service reports that the session expired.
pub type SessionExpiredHandler = Arc<dyn Fn() + Send + Sync>;

/// Callback invoked with the new inner-app hash after every route change.
pub type RouteMatchedHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback invoked when the user triggers back navigation.
pub type BackNavigationHandler = Arc<dyn Fn() -> BoxFuture<'static, BackNavigation> + Send + Sync>;

/// What the host should do with an intercepted back navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackNavigation {
	/// Continue with the normal back navigation.
	Proceed,
	/// Stay on the current page.
	Stay,
}

/// Remote-data service owning the edited documents.
#[async_trait]
pub trait RemoteModel: Send + Sync {
	/// Requests one server-reported activity flag of the instance at `path`.
	async fn request_activity_flag(&self, path: &str, flag: ActivityFlag) -> Result<bool, RemoteError>;

	/// Submits one creation. The returned handle may still be transient.
	async fn create_record(&self, collection: &Collection, request: CreationRequest) -> Result<DocumentContext, RemoteError>;

	async fn delete_record(&self, context: &DocumentContext) -> Result<(), RemoteError>;

	/// Discards the unpublished version or the exclusive session copy.
	///
	/// Returns the handle that is left afterwards, if any.
	async fn discard_unpublished(&self, context: &DocumentContext) -> Result<Option<DocumentContext>, RemoteError>;

	/// Drops local changes of the handle that were not sent yet.
	async fn reset_changes(&self, context: &DocumentContext) -> Result<(), RemoteError>;

	/// Reloads the handle from the service.
	async fn refresh(&self, context: &DocumentContext) -> Result<(), RemoteError>;

	/// Refreshes data that depends on the navigation relationship `navigation_path` of `context`.
	async fn refresh_side_effects(&self, navigation_path: &str, context: Option<&DocumentContext>) -> Result<(), RemoteError>;

	/// Forgets session-scoped request context so later requests start fresh.
	fn clear_session_context(&self);

	/// True while `collection` holds instances that are not persisted yet.
	fn has_transient_contexts(&self, collection: &Collection) -> bool;

	fn attach_session_timeout(&self, handler: SessionExpiredHandler) -> SubscriptionId;

	fn detach_session_timeout(&self, id: SubscriptionId);

	/// Maps a data path to its metadata path.
	fn meta_path(&self, data_path: &str) -> String;

	/// Describes `property` of the type at `meta_path`, or `None` if unknown.
	fn property_kind(&self, meta_path: &str, property: &str) -> Option<PropertyKind>;

	fn programming_model(&self, context: &DocumentContext) -> ProgrammingModel;

	/// New-action annotation of the collection at `meta_path`, if any.
	fn new_action_annotation(&self, meta_path: &str) -> Option<NewActionAnnotation>;
}

/// Router capability of the host shell.
pub trait RouterCapability: Send + Sync {
	/// Current inner-app hash.
	fn hash(&self) -> String;

	/// False while the router is in the middle of a navigation.
	fn is_navigation_finalized(&self) -> bool;

	fn register_navigation_guard(&self, key: &str);

	fn discard_navigation_guard(&self);

	/// True if `hash` stays inside the object protected by the guard.
	fn check_target_against_guard(&self, hash: &str) -> bool;

	/// True if the user already confirmed leaving the guarded object.
	fn is_guard_crossing_allowed_by_user(&self) -> bool;

	/// True if the history entry before the current one lies outside the guard.
	fn is_back_out_of_guard(&self) -> bool;

	/// Navigates back to whatever page led to `context`.
	fn navigate_back_from(&self, context: &DocumentContext);
}

/// Host shell the editor runs in.
pub trait HostShell: Send + Sync {
	/// Router capability, if this host provides one.
	fn router(&self) -> Option<Arc<dyn RouterCapability>>;

	fn register_dirty_state_provider(&self, provider: Arc<DirtyStateProvider>) -> SubscriptionId;

	fn deregister_dirty_state_provider(&self, id: SubscriptionId);

	/// Sets the host's own dirty flag.
	fn set_dirty_flag(&self, dirty: bool);

	fn on_route_matched(&self, handler: RouteMatchedHandler) -> SubscriptionId;

	fn off_route_matched(&self, id: SubscriptionId);

	/// Installs a back-navigation interceptor, or restores the default with `None`.
	fn set_back_navigation_handler(&self, handler: Option<BackNavigationHandler>);
}

/// Modal dialogs and message plumbing.
#[async_trait]
pub trait Dialogs: Send + Sync {
	/// Asks the user to confirm losing unsaved work. Resolves to true when confirmed.
	async fn confirm_data_loss(&self) -> bool;

	/// Shows the session-expired notice and resolves once the user confirmed it.
	async fn notify_session_expired(&self);

	/// Removes transient messages currently shown to the user.
	fn clear_transient_messages(&self);
}

/// A table or list control bound to a collection.
#[async_trait]
pub trait ListControl: Send + Sync {
	fn collection(&self) -> Collection;

	fn clear_selection(&self);

	/// Refreshes the bound data and resolves once the new data was received.
	async fn refresh_and_wait(&self);
}

/// Lookup of controls by id.
pub trait ControlRegistry: Send + Sync {
	fn control(&self, id: &str) -> Option<Arc<dyn ListControl>>;
}

/// Every collaborator one coordinator works with.
#[derive(Clone)]
pub struct Collaborators {
	pub remote: Arc<dyn RemoteModel>,
	/// `None` when the editor runs outside a host shell.
	pub host: Option<Arc<dyn HostShell>>,
	pub dialogs: Arc<dyn Dialogs>,
	pub controls: Arc<dyn ControlRegistry>,
	pub deferrer: Arc<dyn folio_worker::Deferrer>,
}
