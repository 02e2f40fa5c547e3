//! Deferred ("next tick") steps.
//!
//! Some host shells update internal state (the current hash, their own dirty
//! flag) only after the callback that triggered us returns. Work that must
//! observe the updated state is wrapped in a [`DeferredStep`] and handed to a
//! [`Deferrer`], which guarantees the step runs after the current turn.
//!
//! A scheduled step always runs. It has no cancellation path, so a step must
//! tolerate running after the registration that scheduled it was torn down.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::{TaskClass, spawn};

/// A named unit of work that runs after the host's current turn.
pub struct DeferredStep {
	name: &'static str,
	work: BoxFuture<'static, ()>,
}

impl DeferredStep {
	pub fn new(name: &'static str, work: impl Future<Output = ()> + Send + 'static) -> Self {
		Self { name, work: work.boxed() }
	}

	/// Wraps a synchronous closure.
	pub fn from_fn(name: &'static str, f: impl FnOnce() + Send + 'static) -> Self {
		Self::new(name, async move { f() })
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Runs the step to completion.
	pub async fn run(self) {
		tracing::trace!(step = self.name, "defer.run");
		self.work.await;
	}
}

impl fmt::Debug for DeferredStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DeferredStep").field("name", &self.name).finish_non_exhaustive()
	}
}

/// Scheduler for steps that must run after the host's internal update.
pub trait Deferrer: Send + Sync {
	fn defer(&self, step: DeferredStep);
}

/// Runs steps on the tokio runtime after yielding once.
#[derive(Debug, Default, Clone, Copy)]
pub struct NextTick;

impl Deferrer for NextTick {
	fn defer(&self, step: DeferredStep) {
		tracing::trace!(step = step.name(), "defer.schedule");
		spawn(TaskClass::Deferred, async move {
			tokio::task::yield_now().await;
			step.run().await;
		});
	}
}

/// Holds steps until the host drives them with [`TickQueue::run_pending`].
///
/// Useful for hosts that own their event loop and drain deferred work once per
/// frame, and for tests that assert what was deferred before running it.
#[derive(Debug, Default, Clone)]
pub struct TickQueue {
	steps: Arc<Mutex<VecDeque<DeferredStep>>>,
}

impl TickQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of steps waiting for the next tick.
	pub fn pending(&self) -> usize {
		self.steps.lock().len()
	}

	/// Names of waiting steps in scheduling order.
	pub fn pending_names(&self) -> Vec<&'static str> {
		self.steps.lock().iter().map(DeferredStep::name).collect()
	}

	/// Runs every step that was pending when called, in scheduling order.
	///
	/// Steps deferred by the steps being run are left for the next call.
	pub async fn run_pending(&self) -> usize {
		let batch: Vec<DeferredStep> = self.steps.lock().drain(..).collect();
		let count = batch.len();
		for step in batch {
			step.run().await;
		}
		count
	}
}

impl Deferrer for TickQueue {
	fn defer(&self, step: DeferredStep) {
		tracing::trace!(step = step.name(), "defer.queue");
		self.steps.lock().push_back(step);
	}
}
