//! Minimal HTTP/1.1 server standing in for an archive server in integration
//! tests.
//!
//! Serves one stored file. `RETRIEVE` with the known file id answers 200 with
//! the body; unknown ids get 404 with a status document; `STATUS` answers
//! with a small server status document.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
pub struct ArchiveServerOptions {
    /// File id the server knows; anything else gets a 404 status document.
    pub file_id: String,
    /// Filename advertised via `Content-Disposition` (None = header omitted).
    pub advertised_filename: Option<String>,
    /// If set, advertise the full `Content-Length` but close the connection
    /// after sending only this many body bytes.
    pub truncate_after: Option<usize>,
}

impl Default for ArchiveServerOptions {
    fn default() -> Self {
        Self {
            file_id: "obs-42.fits".to_string(),
            advertised_filename: None,
            truncate_after: None,
        }
    }
}

/// Starts a server in a background thread serving `body` as the stored file.
/// Returns `(host, port)`. The server runs until the process exits.
pub fn start(body: Vec<u8>, opts: ArchiveServerOptions) -> (String, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let opts = Arc::new(opts);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = Arc::clone(&opts);
            thread::spawn(move || handle(stream, &body, &opts));
        }
    });
    ("127.0.0.1".to_string(), port)
}

fn handle(mut stream: TcpStream, body: &[u8], opts: &ArchiveServerOptions) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));

    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, target) = parse_request_line(request);
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
        return;
    }
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target, ""),
    };

    match path {
        "/STATUS" => {
            let doc = b"<Status state=\"ONLINE\" version=\"1.0\"/>\n";
            respond(&mut stream, "200 OK", &[], doc);
        }
        "/RETRIEVE" => {
            let file_id = query
                .split('&')
                .find_map(|p| p.strip_prefix("file_id="))
                .unwrap_or("");
            if file_id == opts.file_id {
                serve_file(&mut stream, body, opts);
            } else {
                let doc = format!(
                    "<Status>\n  <Message>file {} not found in archive</Message>\n</Status>\n",
                    file_id
                );
                respond(&mut stream, "404 Not Found", &[], doc.as_bytes());
            }
        }
        _ => {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
        }
    }
}

fn serve_file(stream: &mut TcpStream, body: &[u8], opts: &ArchiveServerOptions) {
    let mut extra = Vec::new();
    if let Some(name) = &opts.advertised_filename {
        extra.push(format!(
            "Content-Disposition: attachment; filename=\"{}\"",
            name
        ));
    }
    let extra: Vec<&str> = extra.iter().map(|s| s.as_str()).collect();
    let sent = match opts.truncate_after {
        Some(cut) => &body[..cut.min(body.len())],
        None => body,
    };
    respond_advertising(stream, "200 OK", &extra, body.len(), sent);
}

fn respond(stream: &mut TcpStream, status: &str, extra_headers: &[&str], body: &[u8]) {
    respond_advertising(stream, status, extra_headers, body.len(), body);
}

/// Writes a response advertising `advertised_len` but sending `body` (which
/// may be shorter, to simulate a connection dying mid-transfer).
fn respond_advertising(
    stream: &mut TcpStream,
    status: &str,
    extra_headers: &[&str],
    advertised_len: usize,
    body: &[u8],
) {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status, advertised_len
    );
    for header in extra_headers {
        head.push_str(header);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

/// Returns (method, request target) from the request line.
fn parse_request_line(request: &str) -> (&str, &str) {
    let line = request.lines().next().unwrap_or("");
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("");
    (method, target)
}
