//! Response adapter: settles an open HTTP exchange into a readable byte
//! stream (accepted command) or a diagnostic status (rejected command).
//!
//! The outcome is a tagged variant, so reading is only possible on the
//! success arm; there is no "stream that may not exist" state. Failures are
//! reported through [`Status`], never raised to the constructing caller.

use std::io::{self, BufRead, BufReader, Read};

use crate::connection::Connection;
use crate::status::{Status, HTTP_OK};

/// Settled outcome of an archive command sent over `C`.
pub enum Retrieval<C: Connection> {
    /// The server accepted the command; the body streams the file bytes.
    Success(RetrievalStream<C>),
    /// The server rejected the command, or the transfer itself failed.
    Failure(RetrievalFailure<C>),
}

impl<C: Connection> Retrieval<C> {
    /// Inspects the response on `conn` and settles the outcome.
    ///
    /// Blocks until the status line arrives. On a rejected command the whole
    /// error body is drained into the status here, line by line. Any I/O
    /// failure along the way is captured as a transport-failure status; this
    /// constructor never returns an error.
    pub fn begin(mut conn: C) -> Self {
        match settle(&mut conn) {
            Ok(Settled::Accepted { body, status }) => {
                Retrieval::Success(RetrievalStream { body, status, conn })
            }
            Ok(Settled::Rejected { status }) => {
                Retrieval::Failure(RetrievalFailure { status, conn })
            }
            Err(e) => {
                tracing::warn!(error = %e, "exchange with the archive server failed");
                let status = Status::transport_failure(format!("retrieve exchange failed: {}", e));
                Retrieval::Failure(RetrievalFailure { status, conn })
            }
        }
    }

    /// Outcome of the exchange, whichever arm this is.
    pub fn status(&self) -> &Status {
        match self {
            Retrieval::Success(stream) => stream.status(),
            Retrieval::Failure(failure) => failure.status(),
        }
    }

    /// Releases any body reader and disconnects. Safe in both arms.
    pub fn close(self) {
        match self {
            Retrieval::Success(stream) => stream.close(),
            Retrieval::Failure(failure) => failure.close(),
        }
    }
}

enum Settled {
    Accepted {
        body: BufReader<Box<dyn Read + Send>>,
        status: Status,
    },
    Rejected {
        status: Status,
    },
}

fn settle<C: Connection>(conn: &mut C) -> io::Result<Settled> {
    let code = conn.response_code()?;
    let message = conn.response_message()?;

    if code != HTTP_OK {
        let mut document = String::new();
        for line in BufReader::new(conn.error_body()?).lines() {
            document.push_str(&line?);
            document.push('\n');
        }
        tracing::warn!(
            code,
            message = %message,
            "archive server rejected the command; see the returned status document"
        );
        return Ok(Settled::Rejected {
            status: Status::http_failure(code, message, document),
        });
    }

    let content_length = conn
        .header("Content-Length")
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = BufReader::new(conn.success_body()?);
    tracing::info!(code, content_length, "archive server accepted the command");
    Ok(Settled::Accepted {
        body,
        status: Status::success(code, message, content_length),
    })
}

/// Readable byte stream over the success body. Reads delegate straight to the
/// buffered body reader.
pub struct RetrievalStream<C: Connection> {
    // Declared before `conn` so the body reader is released first on drop,
    // letting the connection teardown join its transfer worker.
    body: BufReader<Box<dyn Read + Send>>,
    status: Status,
    conn: C,
}

impl<C: Connection> RetrievalStream<C> {
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Response header lookup (e.g. `Content-Disposition` for a filename hint).
    pub fn header(&self, name: &str) -> Option<String> {
        self.conn.header(name)
    }

    /// Releases the body reader and disconnects the connection.
    pub fn close(self) {
        let RetrievalStream { body, mut conn, .. } = self;
        drop(body);
        conn.disconnect();
    }
}

impl<C: Connection> Read for RetrievalStream<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read(buf)
    }
}

impl<C: Connection> BufRead for RetrievalStream<C> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.body.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.body.consume(amt)
    }
}

/// Failure arm: no stream exists, only the diagnostic status.
pub struct RetrievalFailure<C: Connection> {
    status: Status,
    conn: C,
}

impl<C: Connection> RetrievalFailure<C> {
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Disconnects the connection. No reader was ever created on this arm.
    pub fn close(self) {
        let RetrievalFailure { mut conn, .. } = self;
        conn.disconnect();
    }
}
