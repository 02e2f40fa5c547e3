//! UI-facing entry point of the coordinator.

use std::future::Future;
use std::sync::Arc;

use folio_worker::{Drained, TaskHandle, TaskSerializer};
use tokio::sync::broadcast;

use crate::bulk::{BulkDocumentOps, CreateOptions, DeleteOptions, DeleteOutcome};
use crate::collab::Collaborators;
use crate::config::CoordinatorConfig;
use crate::document::{Collection, DocumentContext, Record};
use crate::edit_mode::{EditModeResolver, Resolution};
use crate::error::{RemoteError, Result};
use crate::events::{EventBus, SessionEvent};
use crate::lifecycle::SessionLifecycle;
use crate::state::{EditMode, SessionState};

/// Edit-session coordinator of one open editor.
///
/// Cloning yields another handle to the same editor state.
#[derive(Clone)]
pub struct EditCoordinator {
	state: SessionState,
	serializer: TaskSerializer,
	events: EventBus,
	lifecycle: SessionLifecycle,
	edit_mode: EditModeResolver,
	bulk: BulkDocumentOps,
}

impl EditCoordinator {
	/// Opens the coordinator for a new editor instance.
	pub fn new(collab: Collaborators, config: CoordinatorConfig) -> Self {
		let state = SessionState::init();
		let serializer = TaskSerializer::new();
		let events = EventBus::new(config.event_capacity);
		let lifecycle = SessionLifecycle::new(state.clone(), &collab, events.clone());
		let edit_mode = EditModeResolver::new(state.clone(), Arc::clone(&collab.remote), lifecycle.clone(), config.clone());
		let bulk = BulkDocumentOps::new(
			state.clone(),
			Arc::clone(&collab.remote),
			Arc::clone(&collab.controls),
			serializer.clone(),
			events.clone(),
			config,
		);
		Self {
			state,
			serializer,
			events,
			lifecycle,
			edit_mode,
			bulk,
		}
	}

	pub fn state(&self) -> &SessionState {
		&self.state
	}

	pub fn lifecycle(&self) -> &SessionLifecycle {
		&self.lifecycle
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.events.subscribe()
	}

	pub fn set_edit_mode(&self, mode: Option<EditMode>, create: Option<bool>) {
		self.state.set_edit_mode(mode, create);
	}

	pub fn is_document_modified(&self) -> bool {
		self.state.is_modified()
	}

	pub fn set_document_modified(&self, modified: bool) {
		self.state.set_modified(modified);
	}

	/// Queues a mutating operation behind everything queued before it.
	pub fn enqueue<F, Fut>(&self, task: F) -> TaskHandle<Fut::Output>
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future + Send + 'static,
		Fut::Output: Send + 'static,
	{
		self.serializer.enqueue(task)
	}

	/// Barrier resolving once everything queued so far has finished.
	pub fn drained(&self) -> Drained {
		self.serializer.drained()
	}

	pub fn is_busy(&self) -> bool {
		self.bulk.is_busy()
	}

	pub async fn compute_edit_mode(&self, context: &DocumentContext) -> Result<Resolution> {
		self.edit_mode.compute_edit_mode(context).await
	}

	pub fn start_session(&self, context: &DocumentContext) -> bool {
		self.lifecycle.start_session(context)
	}

	pub fn end_session(&self) {
		self.lifecycle.end_session();
	}

	pub async fn discard_session(&self, context: &DocumentContext) -> std::result::Result<Option<DocumentContext>, RemoteError> {
		self.lifecycle.discard_session(context).await
	}

	pub async fn create_multiple_documents(&self, collection: Collection, records: Vec<Record>, options: CreateOptions) -> Result<Vec<DocumentContext>> {
		self.bulk.create_multiple_documents(collection, records, options).await
	}

	pub async fn delete_multiple_documents(&self, contexts: Vec<DocumentContext>, options: DeleteOptions) -> Result<DeleteOutcome> {
		self.bulk.delete_multiple_documents(contexts, options).await
	}

	/// Closes the editor: ends any session and resets the session state.
	pub fn close(&self) {
		self.lifecycle.end_session();
		self.state.dispose();
	}
}
