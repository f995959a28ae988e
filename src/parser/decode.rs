//! Request decoders.
//!
//! Each decoder is a pure `HttpRequest -> HttpRequest` transform. The server
//! applies them in a fixed order: cookies, query, form.

use std::collections::HashMap;

use crate::parser::request::HttpRequest;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Fill `request.cookies` from the `Cookie` header.
pub fn decode_cookies(mut request: HttpRequest) -> HttpRequest {
    if let Some(header) = request.get_header("Cookie") {
        request.cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let value = value.trim().trim_matches('"');
                Some((name.to_string(), percent_decode(value, false)))
            })
            .collect();
    }
    request
}

/// Fill `request.query_params` from the query string of the path.
pub fn decode_query(mut request: HttpRequest) -> HttpRequest {
    if let Some(query) = request.query_string() {
        request.query_params = parse_pairs(query);
    }
    request
}

/// Fill `request.form` from an urlencoded body.
pub fn decode_form(mut request: HttpRequest) -> HttpRequest {
    let is_form = request
        .get_header("Content-Type")
        .is_some_and(|content_type| content_type.starts_with(FORM_CONTENT_TYPE));
    if is_form {
        request.form = parse_pairs(&String::from_utf8_lossy(&request.body));
    }
    request
}

/// Apply every decoder in order.
pub fn decode_all(request: HttpRequest) -> HttpRequest {
    decode_form(decode_query(decode_cookies(request)))
}

/// Parse `a=1&b=2` pairs. Keys without `=` map to an empty string.
pub fn parse_pairs(input: &str) -> HashMap<String, String> {
    input
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (percent_decode(k, true), percent_decode(v, true)),
            None => (percent_decode(pair, true), String::new()),
        })
        .collect()
}

/// Decode `%XX` escapes, and `+` as a space when `plus_as_space` is set.
///
/// Malformed escapes are kept verbatim.
pub fn percent_decode(input: &str, plus_as_space: bool) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => match (bytes.get(i + 1).and_then(hex), bytes.get(i + 2).and_then(hex)) {
                (Some(high), Some(low)) => {
                    decoded.push(high << 4 | low);
                    i += 3;
                }
                _ => {
                    decoded.push(b'%');
                    i += 1;
                }
            },
            b'+' if plus_as_space => {
                decoded.push(b' ');
                i += 1;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex(byte: &u8) -> Option<u8> {
    (*byte as char).to_digit(16).map(|digit| digit as u8)
}
