//! Coordinator configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default capacity of the [`crate::events::EventBus`].
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// How the editor is laid out inside the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
	/// The object page owns the whole screen.
	#[default]
	FullScreen,
	/// The object page shares the screen with its listing.
	CompanionPane,
}

/// Configuration for one [`crate::EditCoordinator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
	/// Layout of the editor.
	pub layout: LayoutMode,
	/// Buffer size of the session event bus.
	pub event_capacity: usize,
}

impl Default for CoordinatorConfig {
	fn default() -> Self {
		Self {
			layout: LayoutMode::FullScreen,
			event_capacity: DEFAULT_EVENT_CAPACITY,
		}
	}
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// The event bus cannot be created with zero capacity.
	#[error("event_capacity must be > 0")]
	ZeroEventCapacity,
}

impl CoordinatorConfig {
	/// Parses a configuration document.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		if config.event_capacity == 0 {
			return Err(ConfigError::ZeroEventCapacity);
		}
		Ok(config)
	}

	/// Whether operations should set the edit-state dirty flag.
	///
	/// A companion-pane layout keeps its listing visible and refreshes it
	/// itself, so the flag is left alone there.
	pub fn marks_edit_state(&self) -> bool {
		self.layout == LayoutMode::FullScreen
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_gives_defaults() {
		let config = CoordinatorConfig::from_toml_str("").unwrap();
		assert_eq!(config, CoordinatorConfig::default());
		assert!(config.marks_edit_state());
	}

	#[test]
	fn companion_pane_suppresses_edit_state() {
		let config = CoordinatorConfig::from_toml_str("layout = \"companion-pane\"\nevent_capacity = 8").unwrap();
		assert_eq!(config.layout, LayoutMode::CompanionPane);
		assert_eq!(config.event_capacity, 8);
		assert!(!config.marks_edit_state());
	}

	#[test]
	fn rejects_unknown_keys_and_zero_capacity() {
		assert!(matches!(CoordinatorConfig::from_toml_str("fcl = true"), Err(ConfigError::Toml(_))));
		assert!(matches!(
			CoordinatorConfig::from_toml_str("event_capacity = 0"),
			Err(ConfigError::ZeroEventCapacity)
		));
	}
}
