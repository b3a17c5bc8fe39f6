//! Local HTTP server shared by the integration tests.
//!
//! Every test talks to a `tiny_http` server on a random loopback port, so no
//! test depends on the network. Set `CURLHANDLE_TEST_BASE_URL` to point the
//! suite at another server implementing the same routes.

#![allow(dead_code)]

use std::{
    fmt::Write as _,
    io::{Cursor, Read},
    thread,
    time::Duration,
};

use once_cell::sync::OnceCell;
use tiny_http::{Header, ListenAddr, Request, Response, Server, StatusCode};
use url::Url;

#[derive(Debug)]
pub struct TestServer {
    base: String,
    // Keep the thread alive for the duration of the tests.
    _thread: thread::JoinHandle<()>,
}

/// Base URL of the test server, without a trailing slash.
pub fn server_base() -> String {
    if let Ok(base) = std::env::var("CURLHANDLE_TEST_BASE_URL") {
        return base.trim_end_matches('/').to_string();
    }
    test_server().base.clone()
}

/// Full URL for `path` on the test server.
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
        let addr: ListenAddr = server.server_addr();
        let base = format!("http://{addr}");
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
    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body).unwrap();

    match url.path() {
        "/headers" => {
            let mut text = String::new();
            for header in request.headers() {
                writeln!(&mut text, "{}: {}", header.field, header.value).unwrap();
            }
            text_response(StatusCode(200), text)
        }
        "/redirect" => {
            let location = Header::from_bytes("Location", "/request").unwrap();
            text_response(StatusCode(302), "redirect").with_header(location)
        }
        "/slow" => {
            thread::sleep(Duration::from_millis(300));
            text_response(StatusCode(200), "slow")
        }
        "/json" => {
            let content_type = Header::from_bytes("Content-Type", "application/json").unwrap();
            text_response(StatusCode(200), r#"{"server":"curlhandle-local"}"#)
                .with_header(content_type)
        }
        path => {
            if let Some(code) = path.strip_prefix("/status/") {
                let status = code.parse::<u16>().unwrap_or(400);
                return text_response(StatusCode(status), format!("status {status}"));
            }
            // Echo the request line, then the body if there is one.
            let mut text = format!("{} {}", request.method(), request.url());
            if !body.is_empty() {
                text.push('\n');
                text.push_str(&String::from_utf8_lossy(&body));
            }
            text_response(StatusCode(200), text)
        }
    }
}

fn text_response(status: StatusCode, body: impl Into<String>) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body.into()).with_status_code(status)
}
