//! Request handlers.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use log::{error, warn};

use crate::parser::decode::decode_all;
use crate::parser::HttpRequest;
use crate::server::clock::Clock;
use crate::server::response::HttpResponse;

/// Boxed error returned by handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Turns a request into a response.
///
/// A handler is called once per request on the server thread and must not
/// keep state between calls. Returning an error, or panicking, produces a
/// `500 Internal Server Error` with the request's protocol version.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: HttpRequest, os: &Os) -> Result<HttpResponse, BoxError>;
}

impl<F, E> Handler for F
where
    F: Fn(HttpRequest, &Os) -> Result<HttpResponse, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn handle(&self, request: HttpRequest, os: &Os) -> Result<HttpResponse, BoxError> {
        self(request, os).map_err(Into::into)
    }
}

/// Snapshot of the server's environment variables, injected into every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    /// Capture the environment of the current process.
    pub fn from_process() -> Self {
        Self::new(std::env::vars().collect())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Copy the variables into `request.env`.
    pub fn inject(&self, mut request: HttpRequest) -> HttpRequest {
        request.env = self.vars.clone();
        request
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Operating system capabilities available to handlers.
#[derive(Clone)]
pub struct Os {
    clock: Arc<dyn Clock>,
    env: Environment,
}

impl Os {
    pub fn new(clock: Arc<dyn Clock>, env: Environment) -> Self {
        Self { clock, env }
    }

    /// The current time according to the server clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }
}

/// Decode `request`, inject the environment and run the handler.
///
/// Never fails: handler errors and panics become a 500 response.
pub(crate) fn dispatch(handler: &dyn Handler, request: HttpRequest, os: &Os) -> HttpResponse {
    let request = os.env().inject(decode_all(request));
    let version = request.version;
    let target = format!("{} {}", request.method, request.path);

    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request, os))) {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            warn!("Handler failed for {target}: {e}");
            HttpResponse::internal_error(version)
        }
        Err(_) => {
            error!("Handler panicked for {target}");
            HttpResponse::internal_error(version)
        }
    }
}
