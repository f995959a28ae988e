//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;
use serde::de::DeserializeOwned;

use crate::parser::error::Error;
use crate::parser::headers::Headers;
use crate::parser::method::Method;
use crate::parser::reader::{Progress, RequestReader};
use crate::parser::version::HttpVersion;

/// Represents an HTTP request.
///
/// The `cookies`, `query_params`, `form` and `env` maps start empty and are
/// filled by the decoders in [`crate::parser::decode`] and by the server's
/// environment injection before the request reaches a handler.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, including any query string
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: Headers,
    /// The request body, with any transfer encoding removed
    pub body: Vec<u8>,
    /// Query parameters parsed from the path
    pub query_params: HashMap<String, String>,
    /// Cookies sent in the `Cookie` header
    pub cookies: HashMap<String, String>,
    /// Fields of an `application/x-www-form-urlencoded` body
    pub form: HashMap<String, String>,
    /// Server environment variables
    pub env: HashMap<String, String>,
}

impl HttpRequest {
    /// Create a new HTTP request with an empty body.
    pub fn new(method: Method, path: impl Into<String>, version: HttpVersion, headers: Headers) -> Self {
        Self {
            method,
            path: path.into(),
            version,
            headers,
            body: Vec::new(),
            query_params: HashMap::new(),
            cookies: HashMap::new(),
            form: HashMap::new(),
            env: HashMap::new(),
        }
    }

    /// Create a new HTTP request with a body.
    pub fn with_body(method: Method, path: impl Into<String>, version: HttpVersion, headers: Headers, body: Vec<u8>) -> Self {
        let mut request = Self::new(method, path, version, headers);
        request.body = body;
        request
    }

    /// The path without its query string.
    pub fn route(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(route, _)| route)
    }

    /// The raw query string, if any.
    pub fn query_string(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, query)| query)
    }

    /// Get a header value. Header names are case-insensitive.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    /// Parse the request body as JSON.
    ///
    /// Fails with [`Error::MissingHeader`] unless the request declares an
    /// `application/json` content type.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = serde_json::from_slice(&self.body)?;
        Ok(json)
    }

    /// Check if the request has a JSON body.
    pub fn is_json(&self) -> bool {
        self.get_header("Content-Type")
            .is_some_and(|content_type| content_type.starts_with("application/json"))
    }

    /// Get a query parameter value.
    pub fn get_query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// Check if a query parameter exists.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_params.contains_key(name)
    }

    /// Get a cookie value.
    pub fn cookie(&self, name: &str) -> Option<&String> {
        self.cookies.get(name)
    }

    /// Get a decoded form field.
    pub fn form_value(&self, name: &str) -> Option<&String> {
        self.form.get(name)
    }

    /// Get a server environment variable.
    pub fn env_var(&self, name: &str) -> Option<&String> {
        self.env.get(name)
    }
}

/// Parse the request line and header lines of a request head.
///
/// `head` is everything before the blank line that ends the header section.
pub(crate) fn parse_head(head: &str) -> Result<HttpRequest, Error> {
    let mut lines = head.lines();

    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let path = parts[1];
    if !path.starts_with('/') && path != "*" {
        return Err(Error::InvalidPath);
    }

    let version = HttpVersion::from_str(parts[2])?;

    let mut headers = Headers::new();
    for line in lines {
        if line.is_empty() {
            break;
        }

        let (name, value) = line.split_once(':').ok_or(Error::InvalidHeaderFormat)?;
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(Error::InvalidHeaderFormat);
        }

        headers.append(name, value.trim());
    }

    if version == HttpVersion::Http11 && !headers.contains("Host") {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    Ok(HttpRequest::new(method, path, version, headers))
}

/// Parse a complete HTTP request from a byte slice.
///
/// The slice must hold the whole request; a request whose head or body is
/// cut short fails with [`Error::Incomplete`].
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    let mut reader = RequestReader::new(input.len().max(1));
    match reader.feed(input)? {
        Progress::Complete(request) => Ok(request),
        Progress::NeedMore => reader.finish(),
    }
}
