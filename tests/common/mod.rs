//! Shared test utilities for running against a local echo server.
//!
//! The server answers with a JSON description of every request it receives
//! so tests can assert on what actually went over the wire. Set
//! `REK_TEST_BASE_URL` to point the tests at another compatible server.

#![allow(dead_code)]

use std::{io::Cursor, io::Read, thread};

use once_cell::sync::OnceCell;
use serde_json::{Map, Value, json};
use tiny_http::{Header, Request, Response, Server, StatusCode};
use url::Url;

#[derive(Debug)]
pub struct TestServer {
    base: String,
    // Keep the thread alive for the duration of the tests.
    _thread: thread::JoinHandle<()>,
}

/// Return the base URL for the local test server, falling back to an env var
/// override so the tests can target another server if needed.
pub fn server_base() -> String {
    if let Ok(base) = std::env::var("REK_TEST_BASE_URL") {
        return base.trim_end_matches('/').to_string();
    }
    test_server().base.clone()
}

/// Build a full URL against the local test server.
pub fn server_uri(path: &str) -> String {
    format!("{}/{}", server_base(), path.trim_start_matches('/'))
}

pub fn test_server() -> &'static TestServer {
    static INSTANCE: OnceCell<TestServer> = OnceCell::new();
    INSTANCE.get_or_init(TestServer::start)
}

impl TestServer {
    fn start() -> Self {
        let server = Server::http("127.0.0.1:0").expect("start test server");
        let base = format!("http://{}", server.server_addr());
        let thread = thread::spawn(move || run_server(&server));

        Self {
            base,
            _thread: thread,
        }
    }
}

fn run_server(server: &Server) {
    for mut request in server.incoming_requests() {
        let response = handle_request(&mut request);
        let _ = request.respond(response);
    }
}

fn handle_request(request: &mut Request) -> Response<Cursor<Vec<u8>>> {
    // tiny_http only provides the path/query, so prefix with a dummy scheme/host.
    let url = Url::parse(&format!("http://localhost{}", request.url())).unwrap();
    let path = url.path().to_string();

    match path.as_str() {
        "/json" => json_response(200, r#"{"slideshow":{"title":"rek local","author":"rek"}}"#),
        "/text" => text_response(200, "plain text"),
        "/form" => {
            let content_type =
                Header::from_bytes("Content-Type", "application/x-www-form-urlencoded").unwrap();
            text_response(200, "name=rek&lang=rust").with_header(content_type)
        }
        "/error/json" => json_response(422, r#"{"reason":"bad"}"#),
        "/error/text" => text_response(500, "oops"),
        _ => {
            if let Some(code) = path.strip_prefix("/status/") {
                return handle_status(code);
            }
            echo(request, &url)
        }
    }
}

/// Describe the request as JSON: method, path, query pairs, headers and body.
fn echo(request: &mut Request, url: &Url) -> Response<Cursor<Vec<u8>>> {
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);

    let mut headers = Map::new();
    for header in request.headers() {
        headers.insert(
            header.field.to_string().to_ascii_lowercase(),
            Value::String(String::from_utf8_lossy(header.value.as_ref()).into_owned()),
        );
    }
    let query: Map<String, Value> = url
        .query_pairs()
        .into_owned()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    let description = json!({
        "method": request.method().to_string(),
        "path": url.path(),
        "query": query,
        "headers": headers,
        "body": body,
    });
    json_response(200, &description.to_string())
}

fn handle_status(code: &str) -> Response<Cursor<Vec<u8>>> {
    let status = code.parse::<u16>().unwrap_or(400);
    if status == 204 {
        return Response::new(StatusCode(status), vec![], Cursor::new(Vec::new()), None, None);
    }
    text_response(status, format!("status {status}"))
}

fn json_response(status: u16, body: &str) -> Response<Cursor<Vec<u8>>> {
    let content_type = Header::from_bytes("Content-Type", "application/json").unwrap();
    Response::from_string(body.to_string())
        .with_status_code(StatusCode(status))
        .with_header(content_type)
}

fn text_response(status: u16, body: impl Into<String>) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body.into()).with_status_code(StatusCode(status))
}
