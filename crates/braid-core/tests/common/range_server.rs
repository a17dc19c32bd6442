//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body. Responds to HEAD with Content-Length and
//! Accept-Ranges: bytes; responds to GET with Range with 206 Partial Content.
//! Options switch on the failure modes the fetch engine has to cope with.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// Every request (HEAD and GET) gets 500.
    pub fail_all: bool,
    /// GETs whose range starts at or past this offset get 500.
    pub fail_ranges_from: Option<u64>,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, HEAD omits Content-Length.
    pub send_content_length: bool,
    /// Requests with a different (or no) User-Agent get 403.
    pub required_user_agent: Option<&'static str>,
    /// Ranged GETs send this many body bytes, then stall for a while.
    pub stall_after: Option<usize>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            fail_all: false,
            fail_ranges_from: None,
            support_ranges: true,
            send_content_length: true,
            required_user_agent: None,
            stall_after: None,
        }
    }
}

/// Handle to a running server. The server runs until the process exits.
pub struct RangeServer {
    pub url: String,
    get_requests: Arc<AtomicUsize>,
    range_headers: Arc<Mutex<Vec<String>>>,
}

impl RangeServer {
    /// Number of GET requests served so far.
    pub fn get_requests(&self) -> usize {
        self.get_requests.load(Ordering::SeqCst)
    }

    /// Raw `Range` header values received, in arrival order.
    pub fn range_headers(&self) -> Vec<String> {
        self.range_headers.lock().unwrap().clone()
    }
}

/// Deterministic body of `len` bytes.
pub fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let get_requests = Arc::new(AtomicUsize::new(0));
    let range_headers = Arc::new(Mutex::new(Vec::new()));
    let server = RangeServer {
        url: format!("http://127.0.0.1:{}/data.bin", port),
        get_requests: Arc::clone(&get_requests),
        range_headers: Arc::clone(&range_headers),
    };
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let gets = Arc::clone(&get_requests);
            let ranges = Arc::clone(&range_headers);
            thread::spawn(move || handle(stream, &body, opts, &gets, &ranges));
        }
    });
    server
}

struct ParsedRequest {
    method: String,
    range: Option<String>,
    user_agent: Option<String>,
}

fn read_request(stream: &mut TcpStream) -> Option<ParsedRequest> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    }
    let text = String::from_utf8_lossy(&data);
    let mut lines = text.lines();
    let method = lines.next()?.split_whitespace().next()?.to_string();
    let mut range = None;
    let mut user_agent = None;
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if name.eq_ignore_ascii_case("range") {
                range = Some(value.trim().to_string());
            } else if name.eq_ignore_ascii_case("user-agent") {
                user_agent = Some(value.trim().to_string());
            }
        }
    }
    Some(ParsedRequest {
        method,
        range,
        user_agent,
    })
}

/// Returns (start, end_inclusive) for `bytes=X-Y`.
fn parse_range(value: &str) -> Option<(u64, u64)> {
    let part = value.strip_prefix("bytes=")?;
    let (a, b) = part.split_once('-')?;
    let start = a.trim().parse().ok()?;
    let end = b.trim();
    let end_incl = if end.is_empty() {
        u64::MAX
    } else {
        end.parse().ok()?
    };
    Some((start, end_incl))
}

fn respond(stream: &mut TcpStream, status: &str, headers: &str) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n{}\r\n",
        status, headers
    );
    let _ = stream.write_all(head.as_bytes());
}

fn handle(
    mut stream: TcpStream,
    body: &[u8],
    opts: RangeServerOptions,
    gets: &AtomicUsize,
    range_headers: &Mutex<Vec<String>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    let total = body.len() as u64;

    if opts.fail_all {
        respond(&mut stream, "500 Internal Server Error", "");
        return;
    }
    if let Some(required) = opts.required_user_agent {
        if req.user_agent.as_deref() != Some(required) {
            respond(&mut stream, "403 Forbidden", "");
            return;
        }
    }

    if req.method.eq_ignore_ascii_case("HEAD") {
        let length = if opts.send_content_length {
            format!("Content-Length: {}\r\n", total)
        } else {
            String::new()
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\n{}Accept-Ranges: bytes\r\nConnection: close\r\n\r\n",
            length
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if !req.method.eq_ignore_ascii_case("GET") {
        respond(&mut stream, "405 Method Not Allowed", "");
        return;
    }
    gets.fetch_add(1, Ordering::SeqCst);
    if let Some(value) = &req.range {
        range_headers.lock().unwrap().push(value.clone());
    }

    let range = req.range.as_deref().and_then(parse_range);
    let (status, content_range, slice) = match range {
        Some((start, end_incl)) if opts.support_ranges => {
            if let Some(from) = opts.fail_ranges_from {
                if start >= from {
                    respond(&mut stream, "500 Internal Server Error", "");
                    return;
                }
            }
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start >= total || start > end_incl {
                let header = format!("Content-Range: bytes */{}\r\n", total);
                respond(&mut stream, "416 Range Not Satisfiable", &header);
                return;
            }
            let slice = &body[start as usize..=end_incl as usize];
            (
                "206 Partial Content",
                format!("Content-Range: bytes {}-{}/{}\r\n", start, end_incl, total),
                slice,
            )
        }
        _ => ("200 OK", String::new(), body),
    };

    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        slice.len(),
        content_range
    );
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    match opts.stall_after {
        Some(n) if range.is_some() => {
            let n = n.min(slice.len());
            let _ = stream.write_all(&slice[..n]);
            let _ = stream.flush();
            thread::sleep(Duration::from_secs(10));
            let _ = stream.write_all(&slice[n..]);
        }
        _ => {
            let _ = stream.write_all(slice);
        }
    }
}
