#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Edit-session coordinator for a form-based document editor.
//!
//! The coordinator governs an in-progress edit of a remote, versioned
//! document. It serializes mutating operations, resolves whether the editor is
//! editable, and keeps a navigation guard installed in the host shell while
//! unsaved work exists.
//!
//! # Main Types
//!
//! - [`EditCoordinator`] - UI-facing entry point of one open editor
//! - [`SessionState`] - per-editor flags (edit mode, modified, draft status)
//! - [`SessionLifecycle`] - guard registration with the host shell
//! - [`DirtyStateProvider`] - navigation check polled by the host shell
//! - [`BulkDocumentOps`] - multi-row create and delete
//!
//! # Architecture
//!
//! ```text
//! UI action ──► EditCoordinator ──► TaskSerializer ──► RemoteModel
//!                    │
//!                    ├──► SessionState ◄── EditModeResolver
//!                    └──► SessionLifecycle ──► HostShell (guard, provider, routes)
//! ```

pub mod bulk;
/// Collaborator traits for the remote model and the host shell.
pub mod collab;
pub mod config;
mod coordinator;
pub mod dirty;
/// Document handles and collections.
pub mod document;
pub mod edit_mode;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod state;

pub use bulk::{BulkDocumentOps, CreateOptions, DeleteOptions, DeleteOutcome};
pub use collab::Collaborators;
pub use config::{CoordinatorConfig, LayoutMode};
pub use coordinator::EditCoordinator;
pub use dirty::DirtyStateProvider;
pub use document::{Collection, DocumentContext, Record};
pub use edit_mode::{EditModeResolver, ProgrammingModel, Resolution};
pub use error::{CoordinatorError, RemoteError, SessionRejected};
pub use events::SessionEvent;
pub use lifecycle::{SessionLifecycle, SessionPhase};
pub use state::{DraftStatus, EditMode, SessionState};
