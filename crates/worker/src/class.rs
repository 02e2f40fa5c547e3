/// Execution classes used to tag spawned work in trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// A link of the mutation chain owned by a [`crate::TaskSerializer`].
	Serialized,
	/// A step that must run after the host finished its current turn.
	Deferred,
	/// Continuation of a host callback that cannot block the host (dialogs, discards).
	Callback,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Serialized => "serialized",
			Self::Deferred => "deferred",
			Self::Callback => "callback",
		}
	}
}
