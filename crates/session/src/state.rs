//! Per-editor session state and the document activity operations on it.
//!
//! One [`SessionState`] exists per open editor. It is created when the editor
//! opens ([`SessionState::init`]), shared by cloning the handle into each
//! component, and reset when the editor closes ([`SessionState::dispose`]).
//! Only coordinator components call the setters.

use std::sync::Arc;

use parking_lot::Mutex;

/// Whether the object page is editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
	/// Fields are editable.
	Editable,
	/// Read-only display.
	#[default]
	Display,
}

/// Save indicator of the versioned model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftStatus {
	#[default]
	Clear,
	Saving,
	Saved,
}

/// Snapshot of all session fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
	pub edit_mode: EditMode,
	pub editable_pending: bool,
	pub document_modified: bool,
	pub create_mode: bool,
	pub draft_status: DraftStatus,
	pub session_on: bool,
	pub last_invoked_action: Option<String>,
	pub edit_state_dirty: bool,
}

/// Shared handle to the session fields of one editor.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
	fields: Arc<Mutex<SessionSnapshot>>,
}

impl SessionState {
	/// Creates the state for a freshly opened editor.
	pub fn init() -> Self {
		Self::default()
	}

	/// Resets every field to its initial value.
	pub fn dispose(&self) {
		*self.fields.lock() = SessionSnapshot::default();
		tracing::debug!("state.dispose");
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		self.fields.lock().clone()
	}

	/// Sets the edit mode and/or create mode; `None` leaves a part unchanged.
	pub fn set_edit_mode(&self, mode: Option<EditMode>, create: Option<bool>) {
		let mut fields = self.fields.lock();
		if let Some(mode) = mode {
			fields.edit_mode = mode;
		}
		if let Some(create) = create {
			fields.create_mode = create;
		}
		tracing::debug!(mode = ?fields.edit_mode, create = fields.create_mode, "state.edit_mode");
	}

	pub fn edit_mode(&self) -> EditMode {
		self.fields.lock().edit_mode
	}

	pub fn is_editable(&self) -> bool {
		self.edit_mode() == EditMode::Editable
	}

	pub fn set_modified(&self, modified: bool) {
		self.fields.lock().document_modified = modified;
	}

	pub fn is_modified(&self) -> bool {
		self.fields.lock().document_modified
	}

	/// Marks the document modified after a creation, but only when the
	/// collection was relative to the edited document.
	///
	/// Creating from a top-level listing leaves the flag untouched.
	pub fn set_modified_on_create(&self, is_sub_collection_create: bool) {
		if is_sub_collection_create {
			self.set_modified(true);
		}
	}

	pub fn set_create_mode(&self, create: bool) {
		self.fields.lock().create_mode = create;
	}

	pub fn is_create_mode(&self) -> bool {
		self.fields.lock().create_mode
	}

	pub fn set_draft_status(&self, status: DraftStatus) {
		self.fields.lock().draft_status = status;
		tracing::trace!(?status, "state.draft_status");
	}

	pub fn draft_status(&self) -> DraftStatus {
		self.fields.lock().draft_status
	}

	/// Signals that edit-mode computation is in flight.
	pub fn set_editable_pending(&self, pending: bool) {
		self.fields.lock().editable_pending = pending;
	}

	pub fn is_editable_pending(&self) -> bool {
		self.fields.lock().editable_pending
	}

	pub(crate) fn set_session_on(&self, on: bool) {
		self.fields.lock().session_on = on;
	}

	/// True while a guard registration is active.
	pub fn is_session_on(&self) -> bool {
		self.fields.lock().session_on
	}

	/// Records the fully qualified name of the action just invoked, or clears it.
	pub fn set_last_invoked_action(&self, action: Option<String>) {
		self.fields.lock().last_invoked_action = action;
	}

	pub fn last_invoked_action(&self) -> Option<String> {
		self.fields.lock().last_invoked_action.clone()
	}

	/// Flags listings as stale: they refresh when the user returns to them.
	pub fn mark_edit_state_dirty(&self) {
		self.fields.lock().edit_state_dirty = true;
	}

	/// Returns and clears the edit-state dirty flag.
	pub fn take_edit_state_dirty(&self) -> bool {
		std::mem::take(&mut self.fields.lock().edit_state_dirty)
	}

	pub fn is_edit_state_dirty(&self) -> bool {
		self.fields.lock().edit_state_dirty
	}

	/// A field change was sent to the remote service.
	pub fn on_patch_sent(&self) {
		let mut fields = self.fields.lock();
		fields.document_modified = true;
		fields.draft_status = DraftStatus::Saving;
	}

	/// A field change round trip finished.
	pub fn on_patch_completed(&self, success: bool) {
		let status = if success { DraftStatus::Saved } else { DraftStatus::Clear };
		self.set_draft_status(status);
	}
}
