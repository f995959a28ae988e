//! The scheduler engine.
//!
//! Each iteration takes the console and the active task set by value, waits
//! for readiness, accepts new connections, resumes the tasks whose sockets
//! made progress and hands both values back to the caller. Tasks never see
//! the console or the task set.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;
use log::{debug, error, trace, warn};

use crate::server::listener::ListenerSet;
use crate::server::output::{Console, Output};
use crate::server::poll::{task_waker, Multiplexer, TaskId, WakeQueue};
use crate::server::task::{ConnectionTask, Stage, TaskContext};

/// The connection tasks not yet completed, ordered by id.
#[derive(Default)]
pub(crate) struct ActiveTasks {
    tasks: BTreeMap<TaskId, ConnectionTask>,
}

impl ActiveTasks {
    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn stages(&self) -> Vec<(TaskId, Stage)> {
        self.tasks.iter().map(|(id, task)| (*id, task.stage())).collect()
    }

    fn insert(&mut self, task: ConnectionTask) {
        self.tasks.insert(task.id(), task);
    }
}

pub(crate) struct Engine {
    listeners: ListenerSet,
    multiplexer: Multiplexer,
    queue: Arc<WakeQueue>,
    context: Rc<TaskContext>,
    output: Arc<dyn Output>,
    task_timeout: Option<Duration>,
    next_id: TaskId,
}

impl Engine {
    pub(crate) fn new(
        listeners: ListenerSet,
        multiplexer: Multiplexer,
        queue: Arc<WakeQueue>,
        context: Rc<TaskContext>,
        output: Arc<dyn Output>,
        task_timeout: Option<Duration>,
    ) -> Self {
        Self {
            listeners,
            multiplexer,
            queue,
            context,
            output,
            task_timeout,
            next_id: 0,
        }
    }

    /// Run one loop iteration.
    pub(crate) async fn iterate(&mut self, console: Console, mut active: ActiveTasks) -> (Console, ActiveTasks) {
        let console = self.output.emit(console, "Pending connections...\n");

        let readiness = self.multiplexer.wait(&mut self.listeners, active.len()).await;
        let spawned = self.accept(&readiness.listeners);

        let console = self.output.emit(console, &format!("New connections: {}\n", spawned.len()));

        self.resume(&mut active, &readiness.tasks);

        for task in spawned {
            // First poll happens on the next readiness check.
            self.queue.schedule(task.id());
            active.insert(task);
        }

        (console, active)
    }

    /// Resume woken tasks until none is left, without accepting anything.
    pub(crate) async fn drain(&mut self, mut active: ActiveTasks) -> ActiveTasks {
        while !active.is_empty() {
            let woken = self.multiplexer.wait_tasks().await;
            self.resume(&mut active, &woken);
        }
        active
    }

    /// Close every listening socket.
    ///
    /// Connections already accepted into a listener backlog still become
    /// tasks, so each of them gets a response during the drain.
    pub(crate) fn close_listeners(&mut self, mut active: ActiveTasks) -> ActiveTasks {
        let every: Vec<usize> = (0..self.listeners.len()).collect();
        let spawned = self.accept(&every);
        if !spawned.is_empty() {
            debug!("Adopted {} backlogged connections before closing", spawned.len());
        }
        for task in spawned {
            self.queue.schedule(task.id());
            active.insert(task);
        }
        self.listeners = ListenerSet::empty();
        active
    }

    fn accept(&mut self, ready: &[usize]) -> Vec<ConnectionTask> {
        let mut spawned = Vec::new();
        for &index in ready {
            for accepted in self.listeners.accept(index) {
                match accepted {
                    Ok((stream, peer)) => {
                        let id = self.next_id;
                        self.next_id += 1;
                        trace!("Accepted connection {id} from {peer}");
                        spawned.push(ConnectionTask::spawn(
                            id,
                            stream,
                            peer,
                            self.context.clone(),
                            task_waker(id, self.queue.clone()),
                            self.task_timeout,
                        ));
                    }
                    Err(e) => warn!("Error accepting connection: {e}"),
                }
            }
        }
        spawned
    }

    fn resume(&self, active: &mut ActiveTasks, woken: &[TaskId]) {
        for id in woken {
            // Ids of tasks that already completed may still be queued.
            let Some(task) = active.tasks.get_mut(id) else {
                continue;
            };

            // A panic here comes from the handler's lazy body or a bug in the
            // pipeline; it ends this connection only.
            match panic::catch_unwind(AssertUnwindSafe(|| task.resume())) {
                Ok(Poll::Pending) => trace!("Connection {id} suspended while {}", task.stage()),
                Ok(Poll::Ready(Ok(()))) => {
                    debug!("Connection {id} from {} served", task.peer());
                    active.tasks.remove(id);
                }
                Ok(Poll::Ready(Err(e))) => {
                    debug!("Connection {id} from {} abandoned while {}: {e}", task.peer(), task.stage());
                    active.tasks.remove(id);
                }
                Err(_) => {
                    error!("Connection {id} from {} panicked while {}", task.peer(), task.stage());
                    active.tasks.remove(id);
                }
            }
        }
    }
}
