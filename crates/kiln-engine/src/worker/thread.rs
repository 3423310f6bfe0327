use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, Sender};

use super::Task;

enum Message<C> {
    Run(Task<C>),
    Quit,
}

/// Background thread draining a FIFO task queue.
///
/// The context `C` is built on the worker thread by the initialiser passed to
/// [`TaskWorker::spawn`] and dropped there when the worker shuts down, so
/// thread-affine resources never leave it.
pub struct TaskWorker<C: 'static = ()> {
    name: String,
    sender: Sender<Message<C>>,
    quit: Arc<AtomicBool>,
    thread_id: ThreadId,
    thread: Option<JoinHandle<()>>,
}

impl TaskWorker<()> {
    /// Spawns a worker without a thread context.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::spawn(name, || Ok(()))
    }
}

impl<C: 'static> TaskWorker<C> {
    /// Spawns the worker thread and builds its context there.
    ///
    /// Blocks until `init` has finished. An initialiser error is carried back
    /// to the caller and the thread exits.
    pub fn spawn<F>(name: impl Into<String>, init: F) -> Result<Self>
    where
        F: FnOnce() -> Result<C> + Send + 'static,
    {
        let name = name.into();
        let (sender, receiver) = crossbeam_channel::unbounded::<Message<C>>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);
        let quit = Arc::new(AtomicBool::new(false));

        let thread_quit = Arc::clone(&quit);
        let thread_name = name.clone();
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let mut context = match init() {
                    Ok(context) => {
                        let _ = ready_tx.send(Ok(()));
                        context
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                drain_queue(&thread_name, &receiver, &thread_quit, &mut context);
            })
            .with_context(|| format!("failed to spawn worker thread '{name}'"))?;

        let thread_id = thread.thread().id();

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e.context(format!("worker '{name}' failed to initialise")));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(anyhow!("worker '{name}' exited during initialisation"));
            }
        }

        log::info!("worker '{name}' started");

        Ok(Self {
            name,
            sender,
            quit,
            thread_id,
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueues a task and returns immediately.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        if self.sender.send(Message::Run(Box::new(task))).is_err() {
            log::error!("worker '{}' is gone; task dropped", self.name);
        }
    }

    /// Enqueues a zero-argument task.
    pub fn post_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post(move |_| task());
    }

    /// Blocks until every task this thread posted earlier has run.
    ///
    /// If the worker thread has died the release is dropped with the queue
    /// and this returns instead of waiting forever.
    pub fn wait_synchronize(&self) {
        let (release, acquire) = crossbeam_channel::bounded::<()>(1);
        self.post_task(move || {
            let _ = release.send(());
        });
        if acquire.recv().is_err() {
            log::warn!("worker '{}' stopped before reaching the barrier", self.name);
        }
    }

    /// Runs `f` on the worker after everything posted before it and returns
    /// its result. `None` when the worker died first.
    pub fn round_trip<R, F>(&self, f: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut C) -> R + Send + 'static,
    {
        let (reply, result) = crossbeam_channel::bounded::<R>(1);
        self.post(move |cx| {
            let _ = reply.send(f(cx));
        });
        result.recv().ok()
    }

    /// True when called from this worker's thread.
    pub fn runs_tasks_on_current_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Drops `object` on the worker thread, after all earlier tasks.
    pub fn delete_soon<T: Send + 'static>(&self, object: T) {
        self.post_task(move || drop(object));
    }

    /// Releases one shared reference on the worker thread.
    pub fn release_soon<T: ?Sized + Send + Sync + 'static>(&self, object: Arc<T>) {
        self.post_task(move || drop(object));
    }
}

impl<C: 'static> Drop for TaskWorker<C> {
    fn drop(&mut self) {
        self.quit.store(true, Ordering::Release);
        let _ = self.sender.send(Message::Quit);

        if let Some(thread) = self.thread.take() {
            if self.runs_tasks_on_current_thread() {
                // Dropped from one of its own tasks; the thread exits after
                // that task returns.
                log::debug!("worker '{}' dropped on its own thread; detaching", self.name);
                drop(thread);
            } else if thread.join().is_err() {
                log::error!("worker '{}' panicked", self.name);
            }
        }

        log::info!("worker '{}' stopped", self.name);
    }
}

fn drain_queue<C>(name: &str, receiver: &Receiver<Message<C>>, quit: &AtomicBool, context: &mut C) {
    for message in receiver.iter() {
        if quit.load(Ordering::Acquire) {
            break;
        }
        match message {
            Message::Run(task) => task(context),
            Message::Quit => break,
        }
    }

    let dropped = receiver.try_iter().filter(|m| matches!(m, Message::Run(_))).count();
    if dropped > 0 {
        log::warn!("worker '{name}' shut down with {dropped} queued task(s) unrun");
    }
}
