use std::cell::RefCell;
use std::sync::Arc;

use anyhow::Result;

use super::TaskWorker;

/// Where deferred work executes.
///
/// `CurrentThread` is the null worker: tasks run synchronously on the caller
/// against a locally owned context before `post` returns. The variant is not
/// `Sync`, so no task can capture it and re-enter the context.
pub enum TaskRunner<C: 'static = ()> {
    CurrentThread(RefCell<C>),
    Dedicated(TaskWorker<C>),
}

impl<C: 'static> TaskRunner<C> {
    /// Runs tasks on the calling thread against `context`.
    pub fn current_thread(context: C) -> Self {
        Self::CurrentThread(RefCell::new(context))
    }

    /// Runs tasks on a new dedicated thread whose context is built by `init`.
    pub fn dedicated<F>(name: impl Into<String>, init: F) -> Result<Self>
    where
        F: FnOnce() -> Result<C> + Send + 'static,
    {
        Ok(Self::Dedicated(TaskWorker::spawn(name, init)?))
    }

    pub fn is_dedicated(&self) -> bool {
        matches!(self, Self::Dedicated(_))
    }

    pub fn post<F>(&self, task: F)
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        match self {
            Self::CurrentThread(context) => task(&mut context.borrow_mut()),
            Self::Dedicated(worker) => worker.post(task),
        }
    }

    pub fn post_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post(move |_| task());
    }

    /// Barrier. A no-op for the null worker, whose work is already done.
    pub fn wait_synchronize(&self) {
        if let Self::Dedicated(worker) = self {
            worker.wait_synchronize();
        }
    }

    pub fn round_trip<R, F>(&self, f: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut C) -> R + Send + 'static,
    {
        match self {
            Self::CurrentThread(context) => Some(f(&mut context.borrow_mut())),
            Self::Dedicated(worker) => worker.round_trip(f),
        }
    }

    /// The null worker always executes on the caller's thread.
    pub fn runs_tasks_on_current_thread(&self) -> bool {
        match self {
            Self::CurrentThread(_) => true,
            Self::Dedicated(worker) => worker.runs_tasks_on_current_thread(),
        }
    }

    pub fn delete_soon<T: Send + 'static>(&self, object: T) {
        self.post_task(move || drop(object));
    }

    pub fn release_soon<T: ?Sized + Send + Sync + 'static>(&self, object: Arc<T>) {
        self.post_task(move || drop(object));
    }
}
