//! Handles to remote document instances and collections.
//!
//! A [`DocumentContext`] is owned by the remote-data collaborator. The
//! coordinator only clones the handle around; the settlement and flag mutators
//! exist for the collaborator's side of the contract.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::RemoteError;

/// Field values for one record to create.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Settlement {
	Transient,
	Persisted,
	Failed(RemoteError),
}

struct ContextInner {
	path: RwLock<String>,
	inactive: AtomicBool,
	pending_changes: AtomicBool,
	settlement: watch::Sender<Settlement>,
}

/// Handle to one instance of a remote document.
#[derive(Clone)]
pub struct DocumentContext {
	inner: Arc<ContextInner>,
}

impl DocumentContext {
	fn with_state(path: impl Into<String>, settlement: Settlement, inactive: bool) -> Self {
		let (settlement, _) = watch::channel(settlement);
		Self {
			inner: Arc::new(ContextInner {
				path: RwLock::new(path.into()),
				inactive: AtomicBool::new(inactive),
				pending_changes: AtomicBool::new(false),
				settlement,
			}),
		}
	}

	/// A handle to an instance the remote service already knows.
	pub fn persisted(path: impl Into<String>) -> Self {
		Self::with_state(path, Settlement::Persisted, false)
	}

	/// A locally created instance awaiting acknowledgement.
	pub fn transient(path: impl Into<String>) -> Self {
		Self::with_state(path, Settlement::Transient, false)
	}

	/// A placeholder row that is only sent once it receives data.
	pub fn inactive(path: impl Into<String>) -> Self {
		Self::with_state(path, Settlement::Transient, true)
	}

	pub fn path(&self) -> String {
		self.inner.path.read().clone()
	}

	/// Key used for the host's navigation guard: the path without its leading `/`.
	pub fn guard_key(&self) -> String {
		let path = self.inner.path.read();
		path.strip_prefix('/').unwrap_or(path.as_str()).to_string()
	}

	pub fn is_transient(&self) -> bool {
		*self.inner.settlement.borrow() == Settlement::Transient
	}

	pub fn is_inactive(&self) -> bool {
		self.inner.inactive.load(Ordering::Acquire)
	}

	pub fn has_pending_changes(&self) -> bool {
		self.inner.pending_changes.load(Ordering::Acquire)
	}

	/// Resolves once the instance has a stable identity.
	///
	/// Returns the creation error if the remote service rejected the instance.
	pub async fn settled(&self) -> Result<(), RemoteError> {
		let mut rx = self.inner.settlement.subscribe();
		let outcome = match rx.wait_for(|state| *state != Settlement::Transient).await {
			Ok(state) => match &*state {
				Settlement::Failed(err) => Err(err.clone()),
				_ => Ok(()),
			},
			Err(_) => Err(RemoteError::new("settle", "document handle dropped")),
		};
		outcome
	}

	/// Collaborator side: the instance was acknowledged, optionally under a new path.
	pub fn mark_persisted(&self, stable_path: Option<String>) {
		if let Some(path) = stable_path {
			*self.inner.path.write() = path;
		}
		self.inner.settlement.send_replace(Settlement::Persisted);
	}

	/// Collaborator side: the remote service rejected the instance.
	pub fn mark_failed(&self, err: RemoteError) {
		self.inner.settlement.send_replace(Settlement::Failed(err));
	}

	/// Collaborator side: a placeholder row received data.
	pub fn activate(&self) {
		self.inner.inactive.store(false, Ordering::Release);
	}

	/// Collaborator side: local edits exist that were not sent yet.
	pub fn set_pending_changes(&self, pending: bool) {
		self.inner.pending_changes.store(pending, Ordering::Release);
	}
}

impl PartialEq for DocumentContext {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Eq for DocumentContext {}

impl fmt::Debug for DocumentContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentContext")
			.field("path", &*self.inner.path.read())
			.field("transient", &self.is_transient())
			.field("inactive", &self.is_inactive())
			.finish()
	}
}

/// A collection of documents, either a root listing or relative to a parent document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
	path: String,
	parent: Option<DocumentContext>,
}

impl Collection {
	/// A top-level listing such as `/SalesOrders`.
	pub fn root(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			parent: None,
		}
	}

	/// A sub-collection reached through a navigation property of `parent`.
	pub fn relative(parent: DocumentContext, path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			parent: Some(parent),
		}
	}

	/// Path as bound, relative to the parent when there is one.
	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn parent(&self) -> Option<&DocumentContext> {
		self.parent.as_ref()
	}

	/// True for sub-collections of the edited document.
	pub fn is_relative(&self) -> bool {
		self.parent.is_some()
	}

	/// Absolute data path of the collection.
	pub fn resolved_path(&self) -> String {
		match &self.parent {
			Some(parent) => format!("{}/{}", parent.path(), self.path),
			None => self.path.clone(),
		}
	}
}

/// Server-reported activity flags of the versioned model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityFlag {
	/// The instance is the published version.
	IsActiveEntity,
	/// The instance has a published counterpart.
	HasActiveEntity,
}

impl ActivityFlag {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::IsActiveEntity => "IsActiveEntity",
			Self::HasActiveEntity => "HasActiveEntity",
		}
	}
}

/// Kind of a property as described by the service metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
	/// A plain value property.
	Structural,
	/// A relationship to other documents.
	Navigation,
}

/// How a created record is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreationMode {
	/// Inline as a table row.
	Row,
}

/// Where a created row is inserted into its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
	#[default]
	Start,
	End,
}

/// One creation submitted to the remote collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct CreationRequest {
	pub data: Record,
	pub mode: CreationMode,
	pub placement: Placement,
	pub inactive: bool,
	/// The records come from a clipboard paste.
	pub from_paste: bool,
	pub keep_transient_on_failure: bool,
}
