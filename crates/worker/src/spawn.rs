use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::TaskClass;

/// Runtime for host callbacks that fire on threads outside any tokio context.
static CALLBACK_RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn callback_runtime() -> &'static Runtime {
	CALLBACK_RUNTIME.get_or_init(|| {
		Builder::new_multi_thread()
			.worker_threads(1)
			.thread_name("folio-callbacks")
			.enable_all()
			.build()
			.unwrap_or_else(|err| panic!("cannot start the folio callback runtime: {err}"))
	})
}

/// Spawns `fut` on the caller's runtime, or on the shared callback runtime
/// when the caller is not inside one.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	match Handle::try_current() {
		Ok(handle) => {
			tracing::trace!(class = class.as_str(), "worker.spawn");
			handle.spawn(fut)
		}
		Err(_) => {
			tracing::trace!(class = class.as_str(), "worker.spawn_detached");
			callback_runtime().spawn(fut)
		}
	}
}
