//! Response encoding.

use std::sync::Arc;

use crate::server::clock::{http_date, Clock};
use crate::server::response::HttpResponse;

const EOL: &[u8] = b"\r\n";

/// Turns a response into the byte chunks written on the wire.
///
/// The output is the status line, one line per header, a blank line, the
/// body chunks unmodified, then two more CRLFs. A `Date` header is appended
/// when the response has none.
#[derive(Clone)]
pub struct Encoder {
    clock: Arc<dyn Clock>,
}

impl Encoder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Encode `response`. The body is consumed lazily as the chunks are pulled.
    pub fn encode(&self, response: HttpResponse) -> impl Iterator<Item = Vec<u8>> {
        let HttpResponse {
            status,
            version,
            mut headers,
            body,
        } = response;

        if !headers.contains("Date") {
            headers.insert("Date", http_date(self.clock.now()));
        }

        let mut head = Vec::with_capacity(headers.len() + 2);
        head.push(line(format!(
            "HTTP/{version} {code} {reason}",
            version = version.number(),
            code = status.code(),
            reason = status.reason_phrase(),
        )));
        head.extend(headers.iter().map(|(name, value)| line(format!("{name}: {value}"))));
        head.push(EOL.to_vec());

        head.into_iter()
            .chain(body.into_chunks())
            .chain([EOL.to_vec(), EOL.to_vec()])
    }
}

fn line(text: String) -> Vec<u8> {
    let mut bytes = text.into_bytes();
    bytes.extend_from_slice(EOL);
    bytes
}
