//! Tests for the HTTP parser.

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use crate::parser::decode::{decode_all, decode_cookies, decode_form, decode_query, percent_decode};
    use crate::parser::{parse_request, Error, Headers, HttpRequest, HttpVersion, Method, Progress, RequestReader};

    #[test]
    fn test_parse_simple_get_request() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.method, Method::GET);
        assert_eq!(result.path, "/index.html");
        assert_eq!(result.version, HttpVersion::Http11);
        assert_eq!(result.headers.get("Host").unwrap(), "example.com");
        assert!(result.body.is_empty());
    }

    #[test]
    fn test_case_insensitive_headers() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert!(result.has_header("host"));
        assert!(result.has_header("HOST"));
        assert!(result.has_header("Host"));
    }

    #[test]
    fn test_missing_host_header() {
        let request = b"GET /index.html HTTP/1.1\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::MissingHeader(ref h)) if h == "Host"));
    }

    #[test]
    fn test_invalid_method() {
        let request = b"INVALID /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidMethod(ref m)) if m == "INVALID"));
    }

    #[test]
    fn test_http2_is_rejected() {
        let request = b"GET /index.html HTTP/2\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidVersion(ref v)) if v == "HTTP/2"));
    }

    #[test]
    fn test_invalid_header_format() {
        let request = b"GET /index.html HTTP/1.1\r\nInvalidHeader\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidHeaderFormat)));
    }

    #[test]
    fn test_empty_request() {
        let result = parse_request(b"");
        assert!(matches!(result, Err(Error::EmptyRequest)));
    }

    #[test]
    fn test_garbage_without_head_terminator() {
        let result = parse_request(b"INVALID REQUEST");
        assert!(matches!(result, Err(Error::MalformedRequestLine(_))));

        let result = parse_request(b"GET\r\n");
        assert!(matches!(result, Err(Error::MalformedRequestLine(_))));
    }

    #[test]
    fn test_valid_head_without_blank_line_is_incomplete() {
        let result = parse_request(b"GET / HTTP/1.0\r\n");
        assert!(matches!(result, Err(Error::Incomplete)));
    }

    #[test]
    fn test_path_must_be_absolute() {
        let result = parse_request(b"GET index.html HTTP/1.0\r\n\r\n");
        assert!(matches!(result, Err(Error::InvalidPath)));
    }

    #[test]
    fn test_all_methods() {
        let methods = [
            ("GET", Method::GET),
            ("POST", Method::POST),
            ("PUT", Method::PUT),
            ("DELETE", Method::DELETE),
            ("HEAD", Method::HEAD),
            ("OPTIONS", Method::OPTIONS),
            ("PATCH", Method::PATCH),
            ("CONNECT", Method::CONNECT),
            ("TRACE", Method::TRACE),
        ];

        for (name, expected_method) in methods {
            let request = format!("{name} /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n");
            let result = parse_request(request.as_bytes()).unwrap();
            assert_eq!(result.method, expected_method);
            assert_eq!(result.method.to_string(), name);
        }

        assert_eq!(Method::ALL.len(), methods.len());
        assert!(matches!("get".parse::<Method>(), Err(Error::InvalidMethod(ref m)) if m == "get"));
    }

    #[test]
    fn test_headers_with_multiple_colons() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nX-Test: value:with:colons\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.headers.get("X-Test").unwrap(), "value:with:colons");
    }

    #[test]
    fn test_http10_without_host() {
        // HTTP/1.0 doesn't require a Host header
        let request = b"GET /index.html HTTP/1.0\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.version, HttpVersion::Http10);
        assert!(result.headers.is_empty());
    }

    #[test]
    fn test_http_version_display() {
        assert_eq!(HttpVersion::Http10.to_string(), "HTTP/1.0");
        assert_eq!(HttpVersion::Http11.to_string(), "HTTP/1.1");
        assert_eq!(HttpVersion::Http11.number(), "1.1");
    }

    #[test]
    fn test_headers_with_trailing_whitespace() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com  \r\nUser-Agent:  test  \r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.headers.get("Host").unwrap(), "example.com");
        assert_eq!(result.headers.get("User-Agent").unwrap(), "test");
    }

    #[test]
    fn test_mixed_line_endings() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\nUser-Agent: test\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.headers.get("Host").unwrap(), "example.com");
        assert_eq!(result.headers.get("User-Agent").unwrap(), "test");
    }

    #[test]
    fn test_malformed_utf8_in_request() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nX-Test: \xFF\xFF\xFF\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::MalformedRequestLine(ref s)) if s == "Invalid UTF-8"));
    }

    #[test]
    fn test_duplicate_headers_are_kept_in_order() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nX-Test: value1\r\nX-Test: value2\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.headers.get("X-Test").unwrap(), "value1");
        let values: Vec<&str> = result
            .headers
            .iter()
            .filter(|(name, _)| *name == "X-Test")
            .map(|(_, value)| value)
            .collect();
        assert_eq!(values, vec!["value1", "value2"]);
    }

    #[test]
    fn test_headers_insert_replaces_every_occurrence() {
        let mut headers: Headers = [("A", "1"), ("date", "old"), ("B", "2"), ("DATE", "older")]
            .into_iter()
            .collect();
        headers.insert("Date", "new");

        let entries: Vec<(&str, &str)> = headers.iter().collect();
        assert_eq!(entries, vec![("A", "1"), ("Date", "new"), ("B", "2")]);
        assert_eq!(headers.remove("a"), Some("1".to_string()));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_content_length_body() {
        let request = b"POST /api/users HTTP/1.1\r\n\
            Host: example.com\r\n\
            Content-Type: application/json\r\n\
            Content-Length: 46\r\n\
            \r\n\
            {\"name\":\"John Doe\",\"email\":\"john@example.com\"}";

        let result = parse_request(request).unwrap();
        assert_eq!(result.method, Method::POST);
        assert_eq!(result.body, br#"{"name":"John Doe","email":"john@example.com"}"#.to_vec());
    }

    #[test]
    fn test_short_body_is_incomplete() {
        let request = b"POST / HTTP/1.0\r\nContent-Length: 10\r\n\r\nabc";
        assert!(matches!(parse_request(request), Err(Error::Incomplete)));
    }

    #[test]
    fn test_invalid_content_length() {
        let request = b"POST / HTTP/1.0\r\nContent-Length: ten\r\n\r\n";
        assert!(matches!(parse_request(request), Err(Error::InvalidBody(_))));
    }

    #[test]
    fn test_chunked_body() {
        let request = b"POST /upload HTTP/1.1\r\n\
            Host: example.com\r\n\
            Transfer-Encoding: chunked\r\n\
            \r\n\
            5\r\nHello\r\n6;ext=1\r\n world\r\n0\r\n\r\n";

        let result = parse_request(request).unwrap();
        assert_eq!(result.body, b"Hello world".to_vec());
    }

    #[test]
    fn test_chunked_body_with_bad_terminator() {
        let request = b"POST / HTTP/1.0\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabcXX0\r\n\r\n";
        assert!(matches!(parse_request(request), Err(Error::InvalidBody(_))));
    }

    #[test]
    fn test_chunk_size_beyond_limit_is_rejected() {
        let head = b"POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n";
        for size_line in [&b"ffffffffffffffff\r\nab"[..], b"fffffffffffffffe\r\n", b"801\r\nab"] {
            let mut reader = RequestReader::new(2048);
            reader.feed(head).unwrap();
            let result = reader.feed(size_line);
            assert!(
                matches!(result, Err(Error::InvalidBody(_))),
                "size line {:?}: {result:?}",
                String::from_utf8_lossy(size_line)
            );
        }

        let mut request = head.to_vec();
        request.extend_from_slice(b"ffffffffffffffff\r\nab");
        assert!(matches!(parse_request(&request), Err(Error::InvalidBody(_))));
    }

    #[test]
    fn test_chunk_size_within_limit_waits_for_data() {
        let mut reader = RequestReader::new(2048);
        let request = b"POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n400\r\nab";
        assert!(matches!(reader.feed(request), Ok(Progress::NeedMore)));
    }

    #[test]
    fn test_reader_accumulates_chunks() {
        let raw = b"POST /form HTTP/1.1\r\nHost: example.com\r\nContent-Length: 7\r\n\r\nname=jo";
        let mut reader = RequestReader::new(1024);

        let mut completed = None;
        for byte in raw.chunks(3) {
            match reader.feed(byte).unwrap() {
                Progress::NeedMore => assert!(completed.is_none()),
                Progress::Complete(request) => completed = Some(request),
            }
        }

        let request = completed.expect("request should complete on the last chunk");
        assert_eq!(request.path, "/form");
        assert_eq!(request.body, b"name=jo".to_vec());
    }

    #[test]
    fn test_reader_enforces_size_limit() {
        let mut reader = RequestReader::new(16);
        assert!(matches!(reader.feed(b"GET / HTTP/1.0\r\n"), Ok(Progress::NeedMore)));
        assert!(matches!(reader.feed(b"X-Long: header\r\n\r\n"), Err(Error::TooLarge(16))));
    }

    #[test]
    fn test_reader_finish_on_garbage() {
        let mut reader = RequestReader::new(1024);
        assert!(matches!(reader.feed(b"\x01\x02abc"), Ok(Progress::NeedMore)));
        assert_eq!(reader.buffered(), 5);
        assert!(reader.finish().is_err());
    }

    #[test]
    fn test_http_request_methods() {
        let headers: Headers = [("Host", "example.com"), ("Content-Type", "application/json")]
            .into_iter()
            .collect();

        let request = HttpRequest::new(Method::GET, "/index.html?x=1", HttpVersion::Http11, headers.clone());

        assert_eq!(request.get_header("host").unwrap(), "example.com");
        assert!(request.get_header("X-Test").is_none());
        assert!(request.has_header("HOST"));
        assert!(request.is_json());
        assert_eq!(request.route(), "/index.html");
        assert_eq!(request.query_string(), Some("x=1"));

        let body = b"{\"key\":\"value\"}".to_vec();
        let request_with_body = HttpRequest::with_body(Method::POST, "/api", HttpVersion::Http11, headers, body);
        assert_eq!(request_with_body.route(), "/api");
        assert_eq!(request_with_body.body, b"{\"key\":\"value\"}".to_vec());
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestUser {
        name: String,
        email: String,
    }

    #[test]
    fn test_json_parsing() {
        let headers: Headers = [("Host", "example.com"), ("Content-Type", "application/json")]
            .into_iter()
            .collect();

        let body = r#"{"name":"John Doe","email":"john@example.com"}"#.as_bytes().to_vec();
        let request = HttpRequest::with_body(Method::POST, "/api/users", HttpVersion::Http11, headers.clone(), body.clone());

        let user: TestUser = request.json().unwrap();
        assert_eq!(user.name, "John Doe");
        assert_eq!(user.email, "john@example.com");

        let mut headers_no_json = headers.clone();
        headers_no_json.insert("Content-Type", "text/plain");
        let request_no_json = HttpRequest::with_body(Method::POST, "/api/users", HttpVersion::Http11, headers_no_json, body);
        let result: Result<TestUser, _> = request_no_json.json();
        assert!(matches!(result, Err(Error::MissingHeader(_))));

        let invalid_body = r#"{"name":"John Doe","email":}"#.as_bytes().to_vec();
        let request_invalid_json = HttpRequest::with_body(Method::POST, "/api/users", HttpVersion::Http11, headers, invalid_body);
        let result: Result<TestUser, _> = request_invalid_json.json();
        assert!(matches!(result, Err(Error::JsonError(_))));
    }

    #[test]
    fn test_query_parameters() {
        let request = parse_request(b"GET /search?q=test%20query&filter=name:john&flag&empty= HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        assert!(request.query_params.is_empty());

        let request = decode_query(request);
        assert_eq!(request.get_query_param("q").unwrap(), "test query");
        assert_eq!(request.get_query_param("filter").unwrap(), "name:john");
        assert_eq!(request.get_query_param("flag").unwrap(), "");
        assert!(request.has_query_param("empty"));
    }

    #[test]
    fn test_cookies() {
        let request = parse_request(b"GET / HTTP/1.1\r\nHost: a\r\nCookie: session=abc%3D; theme=\"dark\"; broken\r\n\r\n").unwrap();
        let request = decode_cookies(request);
        assert_eq!(request.cookie("session").unwrap(), "abc=");
        assert_eq!(request.cookie("theme").unwrap(), "dark");
        assert!(request.cookie("broken").is_none());
    }

    #[test]
    fn test_form_requires_content_type() {
        let raw = b"POST / HTTP/1.0\r\nContent-Length: 16\r\n\r\nname=J+D&x=%41%4";
        let request = decode_form(parse_request(raw).unwrap());
        assert!(request.form.is_empty());

        let raw = b"POST / HTTP/1.0\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 16\r\n\r\nname=J+D&x=%41%4";
        let request = decode_all(parse_request(raw).unwrap());
        assert_eq!(request.form_value("name").unwrap(), "J D");
        assert_eq!(request.form_value("x").unwrap(), "A%4");
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("a%20b+c", false), "a b+c");
        assert_eq!(percent_decode("a%20b+c", true), "a b c");
        assert_eq!(percent_decode("100%", true), "100%");
        assert_eq!(percent_decode("%zz", true), "%zz");
    }
}
