//! FIFO serialization of mutating work.
//!
//! [`TaskSerializer`] keeps one chain of links. Every [`TaskSerializer::enqueue`]
//! appends a link that waits for its predecessor and then runs the task, so at
//! most one task is in flight and tasks start in enqueue order.
//!
//! A link never fails. The task's output (including an `Err`) is delivered
//! only through the [`TaskHandle`] returned to the caller that enqueued it; a
//! panicking task is caught at the link and reported as [`TaskLost`]. The
//! shared chain therefore always settles and later tasks always run.
//!
//! Ordering is best-effort, not transactional: nothing is rolled back when an
//! earlier task fails.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{TaskClass, spawn};

type Link = Shared<BoxFuture<'static, ()>>;

/// A queued task ended without producing an output (it panicked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("serialized task #{seq} ended without an outcome")]
pub struct TaskLost {
	pub seq: u64,
}

#[derive(Debug, Default)]
struct Counters {
	scheduled: AtomicU64,
	completed: AtomicU64,
}

/// Single-chain FIFO queue for mutating operations.
#[derive(Clone)]
pub struct TaskSerializer {
	tail: Arc<Mutex<Link>>,
	counters: Arc<Counters>,
}

impl Default for TaskSerializer {
	fn default() -> Self {
		Self {
			tail: Arc::new(Mutex::new(futures::future::ready(()).boxed().shared())),
			counters: Arc::new(Counters::default()),
		}
	}
}

impl std::fmt::Debug for TaskSerializer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TaskSerializer")
			.field("scheduled", &self.scheduled_total())
			.field("completed", &self.completed_total())
			.finish()
	}
}

impl TaskSerializer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `task` to the tail of the chain.
	///
	/// The task is started (its closure invoked) only once every previously
	/// enqueued task has finished. It runs whether or not the returned handle
	/// is awaited.
	pub fn enqueue<F, Fut>(&self, task: F) -> TaskHandle<Fut::Output>
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future + Send + 'static,
		Fut::Output: Send + 'static,
	{
		let seq = self.counters.scheduled.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
		let counters = Arc::clone(&self.counters);
		let (tx, rx) = oneshot::channel();

		let link = {
			let mut tail = self.tail.lock();
			let prev = tail.clone();
			let link: Link = async move {
				prev.await;
				tracing::trace!(seq, "serializer.start");
				match AssertUnwindSafe(async move { task().await }).catch_unwind().await {
					Ok(output) => {
						let _ = tx.send(output);
					}
					Err(_) => tracing::error!(seq, "serializer.task_panicked"),
				}
				counters.completed.fetch_add(1, Ordering::AcqRel);
				tracing::trace!(seq, "serializer.done");
			}
			.boxed()
			.shared();
			*tail = link.clone();
			link
		};

		spawn(TaskClass::Serialized, link);
		tracing::trace!(seq, pending = self.pending(), "serializer.enqueue");
		TaskHandle { seq, rx }
	}

	/// Returns the current chain.
	///
	/// Resolves once everything enqueued before this call has finished. It
	/// never fails, whatever the queued tasks returned.
	pub fn drained(&self) -> Drained {
		Drained(self.tail.lock().clone())
	}

	/// Total tasks ever enqueued.
	pub fn scheduled_total(&self) -> u64 {
		self.counters.scheduled.load(Ordering::Acquire)
	}

	/// Total tasks that finished (including panicked ones).
	pub fn completed_total(&self) -> u64 {
		self.counters.completed.load(Ordering::Acquire)
	}

	/// Tasks enqueued but not yet finished.
	pub fn pending(&self) -> u64 {
		self.scheduled_total().saturating_sub(self.completed_total())
	}
}

/// The enqueuing caller's view of one task's outcome.
#[derive(Debug)]
pub struct TaskHandle<R> {
	seq: u64,
	rx: oneshot::Receiver<R>,
}

impl<R> TaskHandle<R> {
	/// Position of the task in the serializer's lifetime order, starting at 1.
	pub fn seq(&self) -> u64 {
		self.seq
	}
}

impl<R> Future for TaskHandle<R> {
	type Output = Result<R, TaskLost>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.get_mut();
		let seq = this.seq;
		Pin::new(&mut this.rx).poll(cx).map(|res| res.map_err(|_| TaskLost { seq }))
	}
}

/// Barrier future returned by [`TaskSerializer::drained`].
#[must_use = "a drain barrier does nothing unless awaited"]
pub struct Drained(Link);

impl Future for Drained {
	type Output = ();

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		self.get_mut().0.poll_unpin(cx)
	}
}
