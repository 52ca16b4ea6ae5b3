//! Outcome of a single archive HTTP exchange.
//!
//! The server answers a command either with the requested file bytes or with
//! a status document describing the failure. Both outcomes are captured in
//! [`Status`], built once when the response is inspected and immutable after.

use std::fmt;

/// Conventional path where callers dump the server status document for
/// inspection after a failed command.
pub const STATUS_DOCUMENT_PATH: &str = "/tmp/arcget-status.xml";

/// Response code the archive server uses for an accepted command.
pub const HTTP_OK: u32 = 200;

/// Result of one HTTP exchange with the archive server.
///
/// Exactly one of the failure payload (`error_document`) and the success
/// payload (`content_length`) can be populated; partial success does not
/// exist in this protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    ok: bool,
    code: Option<u32>,
    message: String,
    error_document: Option<String>,
    document_path: Option<&'static str>,
    content_length: Option<u64>,
}

impl Status {
    /// Accepted command: the body carries file bytes.
    pub fn success(code: u32, message: impl Into<String>, content_length: Option<u64>) -> Self {
        Status {
            ok: true,
            code: Some(code),
            message: message.into(),
            error_document: None,
            document_path: None,
            content_length,
        }
    }

    /// Rejected command: the body carried a status document, drained into
    /// `error_document`.
    pub fn http_failure(code: u32, message: impl Into<String>, error_document: String) -> Self {
        Status {
            ok: false,
            code: Some(code),
            message: message.into(),
            error_document: Some(error_document),
            document_path: Some(STATUS_DOCUMENT_PATH),
            content_length: None,
        }
    }

    /// The exchange itself failed (connection refused, reset mid-headers, ...);
    /// no HTTP code or reason phrase is available, only a description.
    pub fn transport_failure(description: impl Into<String>) -> Self {
        Status {
            ok: false,
            code: None,
            message: description.into(),
            error_document: None,
            document_path: None,
            content_length: None,
        }
    }

    /// True when the server accepted the command.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// HTTP response code; `None` for transport failures.
    pub fn code(&self) -> Option<u32> {
        self.code
    }

    /// Reason phrase for HTTP outcomes, or the failure description for
    /// transport failures.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status document text drained from the error body, line by line with a
    /// trailing newline per line.
    pub fn error_document(&self) -> Option<&str> {
        self.error_document.as_deref()
    }

    /// Where the status document is conventionally dumped for inspection.
    pub fn document_path(&self) -> Option<&str> {
        self.document_path
    }

    /// Parsed `Content-Length` of the success body, if the server sent one.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "HTTP {} {}", code, self.message),
            None => write!(f, "transport failure: {}", self.message),
        }
    }
}
