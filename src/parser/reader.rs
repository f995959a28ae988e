//! Incremental request reading.
//!
//! A connection delivers a request in arbitrary chunks. The reader buffers
//! them, parses the head as soon as the blank line arrives and then waits for
//! the body announced by `Content-Length` or `Transfer-Encoding: chunked`.

use crate::parser::error::Error;
use crate::parser::headers::Headers;
use crate::parser::request::{parse_head, HttpRequest};

const HEAD_END: &[u8] = b"\r\n\r\n";
const CRLF: &[u8] = b"\r\n";

/// Outcome of feeding a chunk to a [`RequestReader`].
#[derive(Debug)]
pub enum Progress {
    /// More bytes are needed before the request is complete.
    NeedMore,
    /// The request is complete. Bytes past its end are ignored.
    Complete(HttpRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Empty,
    Length(usize),
    Chunked,
}

#[derive(Debug)]
struct Head {
    request: HttpRequest,
    body_start: usize,
    framing: Framing,
}

/// Accumulates byte chunks until they form a complete request.
#[derive(Debug)]
pub struct RequestReader {
    buffer: Vec<u8>,
    max_size: usize,
    head: Option<Head>,
}

impl RequestReader {
    /// Create a reader that rejects requests larger than `max_size` bytes.
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_size,
            head: None,
        }
    }

    /// Number of bytes buffered so far.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed the next chunk read from the connection.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Progress, Error> {
        if self.buffer.len() + chunk.len() > self.max_size {
            return Err(Error::TooLarge(self.max_size));
        }
        self.buffer.extend_from_slice(chunk);
        self.advance()
    }

    /// Signal the end of the stream.
    ///
    /// Returns the most specific error available: a malformed head is
    /// reported as such even when it never got its terminating blank line.
    pub fn finish(&mut self) -> Result<HttpRequest, Error> {
        if let Progress::Complete(request) = self.advance()? {
            return Ok(request);
        }
        if self.head.is_some() {
            return Err(Error::Incomplete);
        }
        if self.buffer.is_empty() {
            return Err(Error::EmptyRequest);
        }
        parse_head(&String::from_utf8_lossy(&self.buffer))?;
        Err(Error::Incomplete)
    }

    fn advance(&mut self) -> Result<Progress, Error> {
        if self.head.is_none() {
            let Some(end) = find(&self.buffer, HEAD_END) else {
                return Ok(Progress::NeedMore);
            };
            let head = std::str::from_utf8(&self.buffer[..end])
                .map_err(|_| Error::MalformedRequestLine("Invalid UTF-8".to_string()))?;
            let request = parse_head(head)?;
            let framing = framing(&request.headers)?;
            self.head = Some(Head {
                request,
                body_start: end + HEAD_END.len(),
                framing,
            });
        }

        let Some(head) = self.head.as_ref() else {
            return Ok(Progress::NeedMore);
        };
        let available = &self.buffer[head.body_start..];
        let body = match head.framing {
            Framing::Empty => Vec::new(),
            Framing::Length(length) if available.len() >= length => available[..length].to_vec(),
            Framing::Length(_) => return Ok(Progress::NeedMore),
            Framing::Chunked => match decode_chunked(available, self.max_size)? {
                Some(body) => body,
                None => return Ok(Progress::NeedMore),
            },
        };

        match self.head.take() {
            Some(mut head) => {
                head.request.body = body;
                Ok(Progress::Complete(head.request))
            }
            None => Ok(Progress::NeedMore),
        }
    }
}

fn framing(headers: &Headers) -> Result<Framing, Error> {
    if let Some(encoding) = headers.get("Transfer-Encoding") {
        let chunked = encoding
            .split(',')
            .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
        if !chunked {
            return Err(Error::InvalidBody(format!("unsupported transfer encoding: {encoding}")));
        }
        return Ok(Framing::Chunked);
    }

    match headers.get("Content-Length") {
        Some(length) => length
            .trim()
            .parse()
            .map(|length| if length == 0 { Framing::Empty } else { Framing::Length(length) })
            .map_err(|_| Error::InvalidBody(format!("invalid Content-Length: {length}"))),
        None => Ok(Framing::Empty),
    }
}

/// Decode a chunked body. `Ok(None)` means the body is not complete yet.
///
/// A chunk announcing more than `max_size` bytes can never fit in the
/// request and is rejected before its data arrives.
fn decode_chunked(mut input: &[u8], max_size: usize) -> Result<Option<Vec<u8>>, Error> {
    let mut body = Vec::new();
    loop {
        let Some(line_end) = find(input, CRLF) else {
            return Ok(None);
        };
        let size_line = std::str::from_utf8(&input[..line_end])
            .map_err(|_| Error::InvalidBody("invalid chunk size".to_string()))?;
        let size_field = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_field, 16)
            .map_err(|_| Error::InvalidBody(format!("invalid chunk size: {size_field}")))?;
        if size > max_size {
            return Err(Error::InvalidBody(format!("chunk of {size} bytes exceeds the request limit")));
        }
        input = &input[line_end + CRLF.len()..];

        if size == 0 {
            // Trailer section, terminated by an empty line.
            if input.starts_with(CRLF) {
                return Ok(Some(body));
            }
            return Ok(find(input, HEAD_END).map(|_| body));
        }

        let chunk_end = size
            .checked_add(CRLF.len())
            .ok_or_else(|| Error::InvalidBody(format!("invalid chunk size: {size_field}")))?;
        if input.len() < chunk_end {
            return Ok(None);
        }
        if &input[size..chunk_end] != CRLF {
            return Err(Error::InvalidBody("chunk is not terminated by CRLF".to_string()));
        }
        body.extend_from_slice(&input[..size]);
        input = &input[chunk_end..];
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
