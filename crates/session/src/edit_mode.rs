//! Edit-mode resolution for a freshly opened document.
//!
//! One resolution runs per document-open event and moves through
//! `Resolving → {Editable, Display}`, or leaves the mode unchanged when the
//! programming model gives no reason to switch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collab::RemoteModel;
use crate::config::CoordinatorConfig;
use crate::document::{ActivityFlag, DocumentContext};
use crate::error::Result;
use crate::lifecycle::SessionLifecycle;
use crate::state::{DraftStatus, EditMode, SessionState};

/// How edits of a document are carried out by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgrammingModel {
	/// Edits go to a separate unpublished version.
	Versioned,
	/// Edits happen in a server-side session exclusive to this client.
	ExclusiveSession,
	/// Neither; the editor never switches modes on its own.
	Unmanaged,
}

/// One or several fully qualified action names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionNames {
	One(String),
	Many(Vec<String>),
}

impl ActionNames {
	fn contains(&self, action: &str) -> bool {
		match self {
			Self::One(name) => name == action,
			Self::Many(names) => names.iter().any(|name| name == action),
		}
	}
}

/// Annotation naming the actions that create a new instance in a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActionAnnotation {
	#[serde(rename = "NewAction", default)]
	pub new_action: Option<ActionNames>,
	#[serde(rename = "AdditionalNewActions", default)]
	pub additional_new_actions: Vec<String>,
}

impl NewActionAnnotation {
	/// Exact match of `action` against the primary or any additional new action.
	pub fn matches(&self, action: &str) -> bool {
		self.new_action.as_ref().is_some_and(|names| names.contains(action))
			|| self.additional_new_actions.iter().any(|name| name == action)
	}
}

/// Result of one edit-mode computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	Editable { create: bool },
	Display,
	Unchanged,
}

/// Computes the edit mode from server-reported activity flags.
#[derive(Clone)]
pub struct EditModeResolver {
	state: SessionState,
	remote: Arc<dyn RemoteModel>,
	lifecycle: SessionLifecycle,
	config: CoordinatorConfig,
}

impl EditModeResolver {
	pub fn new(state: SessionState, remote: Arc<dyn RemoteModel>, lifecycle: SessionLifecycle, config: CoordinatorConfig) -> Self {
		Self {
			state,
			remote,
			lifecycle,
			config,
		}
	}

	/// Resolves the edit mode for `context`.
	///
	/// `editable_pending` is raised for the duration and cleared on every exit.
	/// A failure is fatal to the caller's operation and returned unchanged.
	pub async fn compute_edit_mode(&self, context: &DocumentContext) -> Result<Resolution> {
		self.state.set_draft_status(DraftStatus::Clear);
		self.state.set_editable_pending(true);
		let outcome = self.resolve(context).await;
		self.state.set_editable_pending(false);

		match outcome {
			Ok(resolution) => {
				tracing::debug!(path = %context.path(), ?resolution, "edit_mode.resolved");
				Ok(resolution)
			}
			Err(err) => {
				self.state.set_draft_status(DraftStatus::Clear);
				tracing::error!(path = %context.path(), error = %err, "edit_mode.failed");
				Err(err)
			}
		}
	}

	async fn resolve(&self, context: &DocumentContext) -> Result<Resolution> {
		match self.remote.programming_model(context) {
			ProgrammingModel::Versioned => self.resolve_versioned(context).await,
			ProgrammingModel::ExclusiveSession => Ok(self.resolve_exclusive_session(context)),
			ProgrammingModel::Unmanaged => Ok(Resolution::Unchanged),
		}
	}

	async fn resolve_versioned(&self, context: &DocumentContext) -> Result<Resolution> {
		let path = context.path();
		let is_active = self.remote.request_activity_flag(&path, ActivityFlag::IsActiveEntity).await?;
		if is_active {
			self.state.set_edit_mode(Some(EditMode::Display), Some(false));
			return Ok(Resolution::Display);
		}

		self.state.set_edit_mode(Some(EditMode::Editable), None);
		let has_active = self.remote.request_activity_flag(&path, ActivityFlag::HasActiveEntity).await?;
		// No published counterpart: the version is being newly created.
		let create = !has_active;
		self.state.set_edit_mode(None, Some(create));
		Ok(Resolution::Editable { create })
	}

	fn resolve_exclusive_session(&self, context: &DocumentContext) -> Resolution {
		let Some(action) = self.state.last_invoked_action() else {
			return Resolution::Unchanged;
		};
		let meta_path = self.remote.meta_path(&context.path());
		let is_new_action = self
			.remote
			.new_action_annotation(&meta_path)
			.is_some_and(|annotation| annotation.matches(&action));
		if !is_new_action {
			tracing::trace!(action = %action, "edit_mode.not_a_new_action");
			return Resolution::Unchanged;
		}

		self.state.set_edit_mode(Some(EditMode::Editable), Some(true));
		if self.config.marks_edit_state() {
			self.state.mark_edit_state_dirty();
		}
		self.lifecycle.start_session(context);
		self.state.set_last_invoked_action(None);
		Resolution::Editable { create: true }
	}
}
