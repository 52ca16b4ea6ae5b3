//! Blocking HTTP connection over libcurl.
//!
//! The transfer runs on a dedicated worker thread. Header lines are captured
//! as they arrive; the parsed status line and headers are handed over once the
//! first body byte shows up (or the transfer ends), and body chunks flow
//! through a bounded channel so a slow reader applies backpressure to the
//! socket.

use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::Connection;

/// Bounded body queue depth, in curl write callbacks (~16 KiB each).
const BODY_QUEUE_CHUNKS: usize = 32;

/// Parsed response status line and headers.
#[derive(Debug, Clone, Default)]
struct Handshake {
    code: u32,
    reason: String,
    headers: Vec<(String, String)>,
}

/// Header lines of the response block currently being received, plus whether
/// the handshake has already been handed to the reading side.
#[derive(Default)]
struct HeaderCapture {
    lines: Vec<String>,
    sent: bool,
}

/// One HTTP GET exchange with the archive server.
///
/// `open` starts the transfer and returns immediately; response metadata is
/// read lazily and blocks until the server answers. No transfer timeouts are
/// configured, so a stalled server blocks the caller.
pub struct CurlConnection {
    handshake_rx: Option<Receiver<io::Result<Handshake>>>,
    handshake: Option<Handshake>,
    body: Option<ChannelBody>,
    worker: Option<JoinHandle<()>>,
}

impl CurlConnection {
    /// Issues an HTTP GET for `url` on a worker thread. `request_headers` are
    /// extra headers as `(name, value)` pairs (e.g. `Authorization`).
    pub fn open(url: &str, request_headers: &[(String, String)]) -> io::Result<Self> {
        let url = url.to_string();
        let header_lines: Vec<String> = request_headers
            .iter()
            .map(|(name, value)| format!("{}: {}", name.trim(), value.trim()))
            .collect();

        let (handshake_tx, handshake_rx) = mpsc::channel();
        let (body_tx, body_rx) = mpsc::sync_channel(BODY_QUEUE_CHUNKS);

        let worker = thread::Builder::new()
            .name("arcget-transfer".into())
            .spawn(move || run_transfer(&url, &header_lines, handshake_tx, body_tx))?;

        Ok(CurlConnection {
            handshake_rx: Some(handshake_rx),
            handshake: None,
            body: Some(ChannelBody::new(body_rx)),
            worker: Some(worker),
        })
    }

    fn handshake(&mut self) -> io::Result<&Handshake> {
        if let Some(rx) = self.handshake_rx.take() {
            let handshake = rx
                .recv()
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "transfer worker exited before the server answered",
                    )
                })??;
            self.handshake = Some(handshake);
        }
        match &self.handshake {
            Some(handshake) => Ok(handshake),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection is closed",
            )),
        }
    }

    fn take_body(&mut self) -> io::Result<Box<dyn Read + Send>> {
        match self.body.take() {
            Some(body) => Ok(Box::new(body)),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "response body already taken",
            )),
        }
    }
}

impl Connection for CurlConnection {
    fn response_code(&mut self) -> io::Result<u32> {
        self.handshake().map(|handshake| handshake.code)
    }

    fn response_message(&mut self) -> io::Result<String> {
        self.handshake().map(|handshake| handshake.reason.clone())
    }

    fn header(&self, name: &str) -> Option<String> {
        self.handshake
            .as_ref()?
            .headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    fn error_body(&mut self) -> io::Result<Box<dyn Read + Send>> {
        self.take_body()
    }

    fn success_body(&mut self) -> io::Result<Box<dyn Read + Send>> {
        self.take_body()
    }

    /// Drops the local body receiver (aborting the transfer on the next write
    /// callback) and joins the worker. If the body reader was handed out and
    /// is still alive, the join waits until it is dropped.
    fn disconnect(&mut self) {
        self.body = None;
        self.handshake_rx = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("transfer worker panicked during disconnect");
            }
        }
    }
}

impl Drop for CurlConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Pull-style reader over the worker's body channel. End of body is signalled
/// by the worker dropping its sender.
struct ChannelBody {
    rx: Receiver<io::Result<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl ChannelBody {
    fn new(rx: Receiver<io::Result<Vec<u8>>>) -> Self {
        ChannelBody {
            rx,
            chunk: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for ChannelBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.chunk.len() {
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn run_transfer(
    url: &str,
    request_headers: &[String],
    handshake_tx: Sender<io::Result<Handshake>>,
    body_tx: SyncSender<io::Result<Vec<u8>>>,
) {
    let mut easy = curl::easy::Easy::new();
    if let Err(e) = configure(&mut easy, url, request_headers) {
        let _ = handshake_tx.send(Err(curl_io_error(e)));
        return;
    }

    let capture = Arc::new(Mutex::new(HeaderCapture::default()));
    let result = {
        let mut transfer = easy.transfer();

        let cap = Arc::clone(&capture);
        if let Err(e) = transfer.header_function(move |line| {
            let mut cap = cap.lock().unwrap();
            let text = String::from_utf8_lossy(line);
            let text = text.trim_end();
            if text.starts_with("HTTP/") {
                // A redirect or interim response starts a fresh header block.
                cap.lines.clear();
            }
            if !text.is_empty() {
                cap.lines.push(text.to_string());
            }
            true
        }) {
            let _ = handshake_tx.send(Err(curl_io_error(e)));
            return;
        }

        let cap = Arc::clone(&capture);
        let tx = handshake_tx.clone();
        let chunks = body_tx.clone();
        if let Err(e) = transfer.write_function(move |data| {
            let mut cap = cap.lock().unwrap();
            if !cap.sent {
                cap.sent = true;
                let _ = tx.send(Ok(parse_handshake(&cap.lines)));
            }
            drop(cap);
            match chunks.send(Ok(data.to_vec())) {
                Ok(()) => Ok(data.len()),
                Err(_) => Ok(0), // receiver gone: abort the transfer
            }
        }) {
            let _ = handshake_tx.send(Err(curl_io_error(e)));
            return;
        }

        transfer.perform()
    };

    let mut cap = capture.lock().unwrap();
    match result {
        Ok(()) => {
            if !cap.sent {
                // Bodyless response: hand over the metadata now.
                cap.sent = true;
                let _ = handshake_tx.send(Ok(parse_handshake(&cap.lines)));
            }
        }
        Err(e) => {
            if !cap.sent {
                cap.sent = true;
                let _ = handshake_tx.send(Err(curl_io_error(e)));
            } else {
                let _ = body_tx.send(Err(curl_io_error(e)));
            }
        }
    }
}

fn configure(
    easy: &mut curl::easy::Easy,
    url: &str,
    request_headers: &[String],
) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    if !request_headers.is_empty() {
        let mut list = curl::easy::List::new();
        for line in request_headers {
            list.append(line)?;
        }
        easy.http_headers(list)?;
    }
    Ok(())
}

fn curl_io_error(e: curl::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

fn parse_handshake(lines: &[String]) -> Handshake {
    let mut handshake = Handshake::default();
    for line in lines {
        if line.starts_with("HTTP/") {
            let mut parts = line.splitn(3, ' ');
            parts.next();
            handshake.code = parts.next().and_then(|c| c.parse().ok()).unwrap_or(0);
            handshake.reason = parts.next().unwrap_or("").trim().to_string();
        } else if let Some((name, value)) = line.split_once(':') {
            handshake
                .headers
                .push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    handshake
}
