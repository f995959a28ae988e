//! HTTP response types and utilities.

use std::fmt;
use serde::Serialize;

use crate::parser::{Headers, HttpVersion};
use crate::server::error::Error;

/// Body sent for requests that could not be parsed.
pub const BAD_REQUEST_BODY: &str = "Request doesn't respect HTTP protocol";

/// HTTP status codes with their standard reason phrases.
///
/// Codes without a named variant are written with [`StatusCode::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    Created,
    Accepted,
    NoContent,
    MovedPermanently,
    Found,
    SeeOther,
    NotModified,
    TemporaryRedirect,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    RequestTimeout,
    PayloadTooLarge,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    /// Any other code, with the reason phrase to write after it.
    Custom(u16, &'static str),
}

impl StatusCode {
    /// The numeric status code.
    pub fn code(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::Accepted => 202,
            StatusCode::NoContent => 204,
            StatusCode::MovedPermanently => 301,
            StatusCode::Found => 302,
            StatusCode::SeeOther => 303,
            StatusCode::NotModified => 304,
            StatusCode::TemporaryRedirect => 307,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::RequestTimeout => 408,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::BadGateway => 502,
            StatusCode::ServiceUnavailable => 503,
            StatusCode::Custom(code, _) => *code,
        }
    }

    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::SeeOther => "See Other",
            StatusCode::NotModified => "Not Modified",
            StatusCode::TemporaryRedirect => "Temporary Redirect",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::Custom(_, reason) => *reason,
        }
    }
}

/// A response body: a finite sequence of byte chunks that can be consumed once.
pub enum Body {
    Empty,
    Full(Vec<u8>),
    Chunks(Box<dyn Iterator<Item = Vec<u8>>>),
}

impl Body {
    /// Consume the body into its chunks, in order. Empty chunks are skipped.
    pub fn into_chunks(self) -> Box<dyn Iterator<Item = Vec<u8>>> {
        match self {
            Body::Empty => Box::new(std::iter::empty()),
            Body::Full(bytes) if bytes.is_empty() => Box::new(std::iter::empty()),
            Body::Full(bytes) => Box::new(std::iter::once(bytes)),
            Body::Chunks(chunks) => Box::new(chunks.filter(|chunk| !chunk.is_empty())),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => write!(f, "Empty"),
            Body::Full(bytes) => write!(f, "Full({} bytes)", bytes.len()),
            Body::Chunks(_) => write!(f, "Chunks(..)"),
        }
    }
}

/// Represents an HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// The protocol version written in the status line
    pub version: HttpVersion,
    /// The HTTP headers, in the order they are written
    pub headers: Headers,
    /// The response body
    pub body: Body,
}

impl HttpResponse {
    /// Create a new HTTP/1.1 response with the given status code, no headers and no body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            version: HttpVersion::Http11,
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    /// The fixed response sent when a request could not be parsed.
    pub fn bad_request() -> Self {
        HttpResponse::new(StatusCode::BadRequest)
            .with_version(HttpVersion::Http10)
            .with_content_type("text/plain")
            .with_body_string(BAD_REQUEST_BODY)
    }

    /// The response sent when the handler fails.
    pub fn internal_error(version: HttpVersion) -> Self {
        HttpResponse::new(StatusCode::InternalServerError)
            .with_version(version)
            .with_header("Content-Length", "0")
    }

    /// Set the protocol version.
    pub fn with_version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the response body with a string.
    pub fn with_body_string(self, body: impl Into<String>) -> Self {
        self.with_body_bytes(body.into().into_bytes())
    }

    /// Set the response body with bytes.
    pub fn with_body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        let content_length = body.len().to_string();
        self.body = Body::Full(body);
        self.with_header("Content-Length", content_length)
    }

    /// Stream the body as a sequence of chunks.
    ///
    /// No `Content-Length` is set; the connection is closed after the
    /// response, which delimits the body for the client.
    pub fn with_chunks<I>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
        I::IntoIter: 'static,
    {
        self.body = Body::Chunks(Box::new(chunks.into_iter()));
        self
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the content type.
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    /// Set the response body with a JSON value.
    ///
    /// This method serializes the provided value to JSON and sets it as the response body.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(value).map_err(Error::JsonError)?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_body_bytes(json))
    }
}
