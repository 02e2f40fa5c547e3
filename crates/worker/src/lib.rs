#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Runtime primitives for the edit coordinator.
//!
//! Nothing in this crate knows about documents or sessions. It provides the
//! ordering and scheduling building blocks the coordinator is assembled from:
//!
//! - [`TaskSerializer`] linearizes mutating work into one FIFO chain.
//! - [`Deferrer`] runs a step after the current host turn completes.
//! - [`BusyLock`] is the non-queuing UI busy flag.
//! - [`GenerationClock`] hands out ids used to recognize stale deferred steps.

mod busy;
mod class;
mod defer;
mod generation;
mod serializer;
mod spawn;

pub use busy::{BusyGuard, BusyLock};
pub use class::TaskClass;
pub use defer::{DeferredStep, Deferrer, NextTick, TickQueue};
pub use generation::GenerationClock;
pub use serializer::{Drained, TaskHandle, TaskLost, TaskSerializer};
pub use spawn::spawn;
