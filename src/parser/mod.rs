//! HTTP request parsing.
//!
//! Requests arrive as a stream of byte chunks. [`RequestReader`] accumulates
//! them until a complete request (head and body) is available, and the
//! decoders in [`decode`] turn the raw request into one with cookies, query
//! parameters and form fields extracted.

mod request;
mod method;
mod version;
mod headers;
mod reader;
mod error;
pub mod decode;
mod tests;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use headers::Headers;
pub use reader::{Progress, RequestReader};
pub use error::Error;

// Re-export the parse_request function
pub use request::parse_request;
