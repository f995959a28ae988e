//! HTTP server implementation for loophttp.
//!
//! A single control thread accepts connections, turns each one into a
//! connection task and interleaves the tasks at their I/O boundaries.

mod response;
mod config;
mod error;
mod handler;
mod clock;
mod encode;
mod listener;
mod poll;
mod task;
mod engine;
mod output;
mod http_server;

// Re-export public items
pub use response::{Body, HttpResponse, StatusCode, BAD_REQUEST_BODY};
pub use config::ServerConfig;
pub use error::Error;
pub use handler::{BoxError, Environment, Handler, Os};
pub use clock::{http_date, Clock, FixedClock, SystemClock};
pub use encode::Encoder;
pub use listener::{ListenAddr, ListenerSet, Transport};
pub use task::{Interest, Stage};
pub use output::{Console, Everything, Nothing, Output, Stream};
pub use http_server::{HttpServer, OPEN_FAILURE};
