//! HTTP server implementation.

use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use log::{debug, error, info, warn};
use tokio::signal;

use crate::server::clock::{Clock, SystemClock};
use crate::server::config::ServerConfig;
use crate::server::encode::Encoder;
use crate::server::engine::{ActiveTasks, Engine};
use crate::server::handler::{Environment, Handler, Os};
use crate::server::listener::ListenerSet;
use crate::server::output::{Console, Everything, Output};
use crate::server::poll::{Multiplexer, WakeQueue};
use crate::server::task::TaskContext;

/// Message written to stderr when the listening sockets cannot be opened.
pub const OPEN_FAILURE: &str = "Failed to open sockets\n";

/// An HTTP server.
///
/// Every connection is served on the calling thread: the server runs a
/// single-threaded event loop and interleaves connections at their I/O
/// boundaries. Each connection carries exactly one request.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    handler: Arc<dyn Handler>,
    output: Arc<dyn Output>,
    clock: Arc<dyn Clock>,
    env: Environment,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and handler.
    pub fn new(config: ServerConfig, handler: impl Handler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            output: Arc::new(Everything),
            clock: Arc::new(SystemClock),
            env: Environment::from_process(),
        }
    }

    /// Replace the diagnostic output policy.
    pub fn with_output(mut self, output: impl Output + 'static) -> Self {
        self.output = Arc::new(output);
        self
    }

    /// Replace the clock used for `Date` headers and handed to handlers.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the environment injected into requests.
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Run until Ctrl+C, on a new single-threaded runtime.
    pub fn run(self, console: Console) -> Console {
        self.run_until(console, async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Error setting up Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, initiating graceful shutdown");
        })
    }

    /// Run until `shutdown` resolves, on a new single-threaded runtime.
    pub fn run_until<F>(self, console: Console, shutdown: F) -> Console
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build();
        match runtime {
            Ok(runtime) => runtime.block_on(self.serve_until(console, shutdown)),
            Err(e) => {
                error!("Failed to start the runtime: {e}");
                console.exit(1).error(OPEN_FAILURE)
            }
        }
    }

    /// Serve on the current runtime until `shutdown` resolves.
    ///
    /// The future is not `Send`: await it directly, for instance from
    /// `block_on`. The returned console carries the exit code.
    pub async fn serve_until<F>(self, console: Console, shutdown: F) -> Console
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if console.is_failed() {
            return console;
        }

        let listeners = match ListenerSet::open(&self.config.listeners).await {
            Ok(listeners) => listeners,
            Err(e) => {
                error!("{e}");
                return console.exit(1).error(OPEN_FAILURE);
            }
        };
        let mut console = self.output.emit(console, "HTTP server ready!\n");

        let queue = Arc::new(WakeQueue::default());
        let watcher = {
            let queue = queue.clone();
            tokio::spawn(async move {
                shutdown.await;
                queue.shutdown();
            })
        };

        let context = Rc::new(TaskContext {
            handler: self.handler.clone(),
            os: Os::new(self.clock.clone(), self.env.clone()),
            encoder: Encoder::new(self.clock.clone()),
            read_buffer_size: self.config.read_buffer_size,
            max_request_size: self.config.max_request_size,
        });
        let multiplexer = Multiplexer::new(queue.clone(), self.config.busy_wait(), self.config.accept_batch);
        let mut engine = Engine::new(
            listeners,
            multiplexer,
            queue.clone(),
            context,
            self.output.clone(),
            self.config.task_timeout(),
        );

        let mut active = ActiveTasks::default();
        while !console.is_failed() && !queue.is_shutdown() {
            (console, active) = engine.iterate(console, active).await;
        }

        info!("Shutting down server...");
        let active = engine.close_listeners(active);
        watcher.abort();

        if !active.is_empty() {
            info!("Waiting for {len} active connections to complete...", len = active.len());
            debug!("In-flight connections: {:?}", active.stages());
            let timeout = self.config.shutdown_timeout();
            if tokio::time::timeout(timeout, engine.drain(active)).await.is_err() {
                warn!("Shutdown timeout of {timeout:?} elapsed, dropping remaining connections");
            }
        }

        info!("Server shutdown complete");
        console
    }
}
