//! Error taxonomy of the coordinator.

use folio_worker::TaskLost;
use thiserror::Error;

/// A remote operation (create, delete, discard, flag request) was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct RemoteError {
	/// Name of the rejected operation.
	pub operation: &'static str,
	/// Reason reported by the remote service.
	pub message: String,
}

impl RemoteError {
	pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
		Self {
			operation,
			message: message.into(),
		}
	}
}

/// Errors surfaced by coordinator operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
	/// The named control does not exist or is not bound to a collection.
	#[error("control `{0}` missing or not bound to a collection")]
	UnknownControl(String),

	/// Another bulk operation holds the busy lock.
	#[error("another bulk operation is in progress")]
	Busy,

	/// A remote operation was rejected.
	#[error(transparent)]
	Remote(#[from] RemoteError),

	/// A serialized task ended without an outcome.
	#[error(transparent)]
	TaskLost(#[from] TaskLost),
}

/// Why a session could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionRejected {
	/// A guard registration is already active for this editor.
	#[error("a session guard is already registered")]
	AlreadyActive,

	/// No host shell is attached to the coordinator.
	#[error("no host shell attached")]
	MissingHost,

	/// The host shell exposes no router to hold the navigation guard.
	#[error("host shell exposes no router")]
	MissingRouter,

	/// The session was ended while the start was still installing its hooks.
	#[error("session ended before its hooks were installed")]
	EndedWhileStarting,
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;
