//! Readiness multiplexing.
//!
//! Connection tasks are resumed only when the I/O driver reports progress on
//! their own socket. Each task gets a waker that records its id in a shared
//! [`WakeQueue`]; the [`Multiplexer`] waits until a listener has connections
//! or the queue holds task ids, and reports both.

use std::future::poll_fn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Wake, Waker};
use std::time::Duration;

use crate::server::listener::ListenerSet;

/// Identifies a connection task for its whole life. Ids are never reused.
pub(crate) type TaskId = u64;

/// Task ids woken since the engine last looked, plus the shutdown flag.
#[derive(Debug, Default)]
pub(crate) struct WakeQueue {
    woken: Mutex<Vec<TaskId>>,
    engine: Mutex<Option<Waker>>,
    shutdown: AtomicBool,
}

impl WakeQueue {
    /// Mark task `id` as ready to be resumed.
    pub(crate) fn schedule(&self, id: TaskId) {
        lock(&self.woken).push(id);
        self.wake_engine();
    }

    /// Ask the engine to stop accepting and drain.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake_engine();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Remove and return the woken ids, deduplicated and in ascending order.
    fn take(&self) -> Vec<TaskId> {
        let mut woken = std::mem::take(&mut *lock(&self.woken));
        woken.sort_unstable();
        woken.dedup();
        woken
    }

    fn register(&self, waker: &Waker) {
        let mut engine = lock(&self.engine);
        match engine.as_ref() {
            Some(current) if current.will_wake(waker) => {}
            _ => *engine = Some(waker.clone()),
        }
    }

    fn wake_engine(&self) {
        if let Some(waker) = lock(&self.engine).as_ref() {
            waker.wake_by_ref();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct TaskWaker {
    id: TaskId,
    queue: Arc<WakeQueue>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.queue.schedule(self.id);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.queue.schedule(self.id);
    }
}

/// Build the waker handed to task `id` when it is polled.
pub(crate) fn task_waker(id: TaskId, queue: Arc<WakeQueue>) -> Waker {
    Waker::from(Arc::new(TaskWaker { id, queue }))
}

/// What one readiness check found.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Readiness {
    /// Listeners with accepted connections waiting.
    pub listeners: Vec<usize>,
    /// Tasks whose socket made progress.
    pub tasks: Vec<TaskId>,
    /// Shutdown was requested.
    pub shutdown: bool,
}

impl Readiness {
    fn is_empty(&self) -> bool {
        self.listeners.is_empty() && self.tasks.is_empty() && !self.shutdown
    }
}

/// Waits for listener or task readiness.
pub(crate) struct Multiplexer {
    queue: Arc<WakeQueue>,
    busy_wait: Duration,
    accept_batch: usize,
}

impl Multiplexer {
    pub(crate) fn new(queue: Arc<WakeQueue>, busy_wait: Duration, accept_batch: usize) -> Self {
        Self {
            queue,
            busy_wait,
            accept_batch: accept_batch.max(1),
        }
    }

    /// Perform one readiness check.
    ///
    /// With no task in flight this blocks until a listener is ready or
    /// shutdown is requested. Otherwise it first yields to the runtime, which
    /// lets the I/O driver poll without blocking, then waits at most
    /// `busy_wait` and may report nothing.
    pub(crate) async fn wait(&self, listeners: &mut ListenerSet, active: usize) -> Readiness {
        if active == 0 {
            return poll_fn(|cx| self.poll_ready(listeners, cx)).await;
        }

        tokio::task::yield_now().await;
        tokio::time::timeout(self.busy_wait, poll_fn(|cx| self.poll_ready(listeners, cx)))
            .await
            .unwrap_or_default()
    }

    /// Wait for task wake-ups only, ignoring listeners and shutdown.
    pub(crate) async fn wait_tasks(&self) -> Vec<TaskId> {
        tokio::task::yield_now().await;
        poll_fn(|cx| {
            self.queue.register(cx.waker());
            let tasks = self.queue.take();
            if tasks.is_empty() {
                Poll::Pending
            } else {
                Poll::Ready(tasks)
            }
        })
        .await
    }

    fn poll_ready(&self, listeners: &mut ListenerSet, cx: &mut Context<'_>) -> Poll<Readiness> {
        self.queue.register(cx.waker());
        let readiness = Readiness {
            listeners: listeners.poll_ready(cx, self.accept_batch),
            tasks: self.queue.take(),
            shutdown: self.queue.is_shutdown(),
        };
        if readiness.is_empty() {
            Poll::Pending
        } else {
            Poll::Ready(readiness)
        }
    }
}
