//! Minimal HTTP/1.1 JSON server for integration tests.
//!
//! Routes:
//! - `/status/<code>` answers `<code>` with `{"status": <code>}`.
//! - `/echo` answers 200 with the method, path, query, selected headers and
//!   the parsed request body.
//! - `/slow/<ms>` sleeps, then answers 200.
//! - `/text` answers a plain-text body.
//! - anything else answers 404.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Handle to a running server. The server runs until the process exits.
#[derive(Clone)]
pub struct ApiServer {
    pub base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl ApiServer {
    /// Number of requests seen for `path` (query string excluded).
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

/// Starts the server in a background thread. `base_url` has no trailing slash.
pub fn start() -> ApiServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let hits = Arc::new(Mutex::new(HashMap::new()));
    let counter = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &counter));
        }
    });
    ApiServer {
        base_url: format!("http://127.0.0.1:{}", port),
        hits,
    }
}

struct Parsed {
    method: String,
    path: String,
    query: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Parsed {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn handle(mut stream: TcpStream, hits: &Mutex<HashMap<String, usize>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    *hits.lock().unwrap().entry(req.path.clone()).or_insert(0) += 1;

    let (status, content_type, body) = route(&req);
    let reason = if (200..300).contains(&status) { "OK" } else { "Status" };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nX-Fixture: apiq\r\nConnection: close\r\n\r\n",
        status,
        reason,
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    if req.method != "HEAD" {
        let _ = stream.write_all(&body);
    }
}

fn route(req: &Parsed) -> (u16, &'static str, Vec<u8>) {
    let json = "application/json";
    if let Some(code) = req.path.strip_prefix("/status/") {
        let code: u16 = code.parse().unwrap_or(500);
        return (code, json, format!("{{\"status\":{}}}", code).into_bytes());
    }
    if let Some(ms) = req.path.strip_prefix("/slow/") {
        thread::sleep(Duration::from_millis(ms.parse().unwrap_or(0)));
        return (200, json, b"{\"slow\":true}".to_vec());
    }
    match req.path.as_str() {
        "/echo" => {
            let body = if req.body.is_empty() {
                "null".to_string()
            } else {
                String::from_utf8_lossy(&req.body).into_owned()
            };
            let quoted = |v: Option<&str>| match v {
                Some(s) => format!("{:?}", s),
                None => "null".to_string(),
            };
            let out = format!(
                "{{\"method\":{:?},\"path\":{:?},\"query\":{:?},\"content_type\":{},\"authorization\":{},\"body\":{}}}",
                req.method,
                req.path,
                req.query,
                quoted(req.header("content-type")),
                quoted(req.header("authorization")),
                body
            );
            (200, json, out.into_bytes())
        }
        "/text" => (200, "text/plain", b"hello".to_vec()),
        _ => (404, json, b"{\"error\":\"not found\"}".to_vec()),
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Parsed> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = std::str::from_utf8(&buf[..header_end]).ok()?;
    let mut lines = head.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let target = first.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let len: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[header_end..].to_vec();
    while body.len() < len {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(len);

    Some(Parsed {
        method,
        path: path.to_string(),
        query: query.to_string(),
        headers,
        body,
    })
}
