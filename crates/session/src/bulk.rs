//! Bulk creation and deletion of table rows.
//!
//! Both operations hold the busy lock for their whole duration and run their
//! remote mutations through the shared [`TaskSerializer`], so they never
//! interleave with other queued work of the same editor.

use std::sync::Arc;

use folio_worker::{BusyLock, TaskSerializer};
use futures::future::{BoxFuture, join_all, try_join_all};

use crate::collab::{ControlRegistry, ListControl, RemoteModel};
use crate::config::CoordinatorConfig;
use crate::document::{Collection, CreationMode, CreationRequest, DocumentContext, Placement, PropertyKind, Record};
use crate::error::{CoordinatorError, Result};
use crate::events::{EventBus, SessionEvent};
use crate::state::SessionState;

/// Hook awaited before creation; receives the collection's bound path.
pub type BeforeCreateHook = Box<dyn FnOnce(String) -> BoxFuture<'static, Result<()>> + Send>;

/// Hook awaited before deletion; receives the paths about to be deleted.
pub type BeforeDeleteHook = Box<dyn FnOnce(Vec<String>) -> BoxFuture<'static, Result<()>> + Send>;

/// Options of [`BulkDocumentOps::create_multiple_documents`].
#[derive(Default)]
pub struct CreateOptions {
	pub placement: Placement,
	pub from_paste: bool,
	pub before_create: Option<BeforeCreateHook>,
	/// Create placeholder rows that are only sent once they receive data.
	pub inactive: bool,
}

/// Options of [`BulkDocumentOps::delete_multiple_documents`].
pub struct DeleteOptions {
	/// Control whose collection owns the deleted documents.
	pub control_id: String,
	pub before_delete: Option<BeforeDeleteHook>,
}

impl DeleteOptions {
	pub fn new(control_id: impl Into<String>) -> Self {
		Self {
			control_id: control_id.into(),
			before_delete: None,
		}
	}
}

/// How a bulk delete ended. Failures are logged, not returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
	Deleted { paths: Vec<String> },
	Failed,
}

/// Orchestrates multi-row create and delete.
#[derive(Clone)]
pub struct BulkDocumentOps {
	state: SessionState,
	remote: Arc<dyn RemoteModel>,
	controls: Arc<dyn ControlRegistry>,
	serializer: TaskSerializer,
	busy: BusyLock,
	events: EventBus,
	config: CoordinatorConfig,
}

impl BulkDocumentOps {
	pub fn new(
		state: SessionState,
		remote: Arc<dyn RemoteModel>,
		controls: Arc<dyn ControlRegistry>,
		serializer: TaskSerializer,
		events: EventBus,
		config: CoordinatorConfig,
	) -> Self {
		Self {
			state,
			remote,
			controls,
			serializer,
			busy: BusyLock::new(),
			events,
			config,
		}
	}

	/// True while a bulk operation holds the busy lock.
	pub fn is_busy(&self) -> bool {
		self.busy.is_locked()
	}

	/// Creates one document per record in `collection`.
	///
	/// Returns the created handles once every active one has a stable identity.
	pub async fn create_multiple_documents(
		&self,
		collection: Collection,
		records: Vec<Record>,
		options: CreateOptions,
	) -> Result<Vec<DocumentContext>> {
		let _busy = self.busy.try_lock().ok_or(CoordinatorError::Busy)?;
		let count = records.len();
		let path = collection.resolved_path();

		let this = self.clone();
		let outcome = self
			.serializer
			.enqueue(move || async move { this.create_serialized(collection, records, options).await })
			.await
			.map_err(CoordinatorError::from)
			.and_then(|created| created);

		match &outcome {
			Ok(created) => tracing::debug!(path = %path, count = created.len(), "bulk.create"),
			Err(err) => tracing::error!(path = %path, count, error = %err, "bulk.create.failed"),
		}
		outcome
	}

	async fn create_serialized(&self, collection: Collection, records: Vec<Record>, options: CreateOptions) -> Result<Vec<DocumentContext>> {
		if let Some(hook) = options.before_create {
			hook(collection.path().to_string()).await?;
		}

		let meta_path = self.remote.meta_path(&collection.resolved_path());
		let requests: Vec<CreationRequest> = records
			.into_iter()
			.map(|record| CreationRequest {
				data: self.creation_payload(&meta_path, record),
				mode: CreationMode::Row,
				placement: options.placement,
				inactive: options.inactive,
				from_paste: options.from_paste,
				keep_transient_on_failure: false,
			})
			.collect();
		let submitted = requests.len();
		// Every submitted request runs to completion, even after a sibling failed.
		let outcomes = join_all(requests.into_iter().map(|request| self.remote.create_record(&collection, request))).await;
		let mut created = Vec::with_capacity(outcomes.len());
		let mut first_error = None;
		for outcome in outcomes {
			match outcome {
				Ok(context) => created.push(context),
				Err(err) => {
					first_error.get_or_insert(err);
				}
			}
		}
		if let Some(err) = first_error {
			let survivors: Vec<String> = created.iter().map(DocumentContext::path).collect();
			tracing::warn!(rejected = submitted - created.len(), ?survivors, "bulk.create.partial");
			return Err(err.into());
		}

		// Transient identities are only replaced once the handle settled.
		try_join_all(created.iter().filter(|ctx| !ctx.is_inactive()).map(DocumentContext::settled)).await?;

		if !options.inactive {
			self.state.set_modified_on_create(collection.is_relative());
		}
		let still_transient = created.iter().any(DocumentContext::is_transient) || self.remote.has_transient_contexts(&collection);
		if !still_transient {
			self.refresh_side_effects(&collection).await;
		}

		self.events.emit(SessionEvent::Created {
			paths: created.iter().map(DocumentContext::path).collect(),
		});
		Ok(created)
	}

	/// Keeps structural properties with a value; deep creation is not supported.
	fn creation_payload(&self, meta_path: &str, record: Record) -> Record {
		record
			.into_iter()
			.filter(|(name, value)| !value.is_null() && self.remote.property_kind(meta_path, name) == Some(PropertyKind::Structural))
			.collect()
	}

	/// Deletes `contexts`, then refreshes the owning control.
	///
	/// Fails fast if the control cannot be resolved. Remote failures are
	/// logged and reported as [`DeleteOutcome::Failed`].
	pub async fn delete_multiple_documents(&self, contexts: Vec<DocumentContext>, options: DeleteOptions) -> Result<DeleteOutcome> {
		let control = self
			.controls
			.control(&options.control_id)
			.ok_or_else(|| CoordinatorError::UnknownControl(options.control_id.clone()))?;
		let _busy = self.busy.try_lock().ok_or(CoordinatorError::Busy)?;

		match self.delete_and_refresh(contexts, control.as_ref(), options.before_delete).await {
			Ok(paths) => Ok(DeleteOutcome::Deleted { paths }),
			Err(err) => {
				tracing::error!(control = %options.control_id, error = %err, "bulk.delete.failed");
				Ok(DeleteOutcome::Failed)
			}
		}
	}

	async fn delete_and_refresh(&self, contexts: Vec<DocumentContext>, control: &dyn ListControl, before_delete: Option<BeforeDeleteHook>) -> Result<Vec<String>> {
		let paths: Vec<String> = contexts.iter().map(DocumentContext::path).collect();
		self.delete_document_transaction(contexts, before_delete).await?;

		control.clear_selection();
		let collection = control.collection();
		if !collection.is_relative() {
			// Stay pending until the listing shows the new data.
			control.refresh_and_wait().await;
		} else if !self.remote.has_transient_contexts(&collection) {
			self.refresh_side_effects(&collection).await;
		}

		if self.config.marks_edit_state() {
			self.state.mark_edit_state_dirty();
		}
		tracing::debug!(count = paths.len(), "bulk.delete");
		self.events.emit(SessionEvent::Deleted { paths: paths.clone() });
		Ok(paths)
	}

	/// Deletes `contexts` as one serialized transaction.
	pub async fn delete_document_transaction(&self, contexts: Vec<DocumentContext>, before_delete: Option<BeforeDeleteHook>) -> Result<()> {
		let remote = Arc::clone(&self.remote);
		self.serializer
			.enqueue(move || async move {
				if let Some(hook) = before_delete {
					hook(contexts.iter().map(DocumentContext::path).collect()).await?;
				}
				try_join_all(contexts.iter().map(|ctx| remote.delete_record(ctx))).await?;
				Ok::<(), CoordinatorError>(())
			})
			.await?
	}

	async fn refresh_side_effects(&self, collection: &Collection) {
		if let Err(err) = self.remote.refresh_side_effects(collection.path(), collection.parent()).await {
			tracing::warn!(path = %collection.path(), error = %err, "bulk.side_effects_failed");
		}
	}
}
