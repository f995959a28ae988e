//! A single-threaded HTTP/1.x server.
//!
//! Connections are served without a thread per connection: one control
//! thread runs an event loop that accepts sockets, turns each into a
//! connection task and resumes a task only when its own socket is ready.
//! Every connection carries exactly one request and is closed after the
//! response.
//!
//! # Features
//!
//! - HTTP/1.0 and HTTP/1.1 request parsing, incremental over socket reads
//! - `Content-Length` and chunked request bodies
//! - Cookie, query string and urlencoded form decoding
//! - Handler errors and panics answered with `500`, malformed requests with `400`
//! - Diagnostic output that can be silenced, graceful shutdown
//! - JSON helpers for request and response bodies
//!
//! # Examples
//!
//! ## Serving
//!
//! ```no_run
//! use std::convert::Infallible;
//! use loophttp::{Console, HttpRequest, HttpResponse, HttpServer, Os, ServerConfig, StatusCode};
//!
//! fn hello(request: HttpRequest, _os: &Os) -> Result<HttpResponse, Infallible> {
//!     Ok(HttpResponse::new(StatusCode::Ok)
//!         .with_version(request.version)
//!         .with_body_string("Hello world"))
//! }
//!
//! let console = HttpServer::new(ServerConfig::default(), hello).run(Console::stdio());
//! std::process::exit(console.exit_code().into());
//! ```
//!
//! ## Parsing
//!
//! ```
//! use loophttp::{parse_request, ParserError};
//!
//! let request = parse_request(b"GET /index.html?page=2 HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//! assert_eq!(request.route(), "/index.html");
//! assert_eq!(request.query_string(), Some("page=2"));
//!
//! match parse_request(b"INVALID /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n") {
//!     Err(ParserError::InvalidMethod(method)) => assert_eq!(method, "INVALID"),
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! ```
//!
//! ## JSON support
//!
//! ```
//! use loophttp::{HttpResponse, StatusCode};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct User {
//!     name: String,
//! }
//!
//! let response = HttpResponse::new(StatusCode::Ok)
//!     .with_json(&User { name: "John Doe".to_string() })
//!     .unwrap();
//! assert_eq!(response.headers.get("Content-Type"), Some("application/json"));
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

pub mod cli;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, Headers, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{
    Console, Environment, Error as ServerError, Handler, HttpResponse, HttpServer, ListenAddr, Os,
    ServerConfig, StatusCode,
};
