//! Deferred task dispatch onto a dedicated thread.
//!
//! A [`TaskWorker`] owns one background thread and an unbounded FIFO queue.
//! The thread also owns a context value `C` (the render thread owns the GPU
//! device and every agent through it). Tasks run once, in the order a given
//! producer posted them.
//!
//! [`TaskRunner`] is the policy seam: call sites post against a runner and do
//! not care whether work lands on the current thread or a dedicated one.
//!
//! Contract:
//! - posting never blocks and is never rejected while the worker is alive
//! - [`TaskWorker::wait_synchronize`] is a full barrier for the caller's own
//!   earlier posts
//! - dropping the worker joins its thread; tasks still queued are dropped
//!   without running

mod runner;
mod thread;

pub use runner::TaskRunner;
pub use thread::TaskWorker;

/// A deferred unit of work receiving the executing thread's context.
pub type Task<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;
