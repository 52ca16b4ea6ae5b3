//! Archive command requests.
//!
//! The archive protocol addresses a command as a URL path segment with its
//! parameters as query parameters: `http://host:port/RETRIEVE?file_id=...`.
//! The server streams file bytes back on success and a status document on
//! failure.

use thiserror::Error;
use url::Url;

/// Command name for fetching a stored file.
pub const RETRIEVE: &str = "RETRIEVE";

/// Command name for querying the server state.
pub const STATUS: &str = "STATUS";

/// Failure to assemble a command URL.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid server address http://{host}:{port}: {source}")]
    Address {
        host: String,
        port: u16,
        #[source]
        source: url::ParseError,
    },
}

/// One command to send to the archive server.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    command: String,
    params: Vec<(String, String)>,
    authorization: Option<String>,
}

impl CommandRequest {
    pub fn new(command: &str) -> Self {
        CommandRequest {
            command: command.to_string(),
            params: Vec::new(),
            authorization: None,
        }
    }

    /// `RETRIEVE` for the given file id.
    pub fn retrieve(file_id: &str) -> Self {
        CommandRequest::new(RETRIEVE).with_param("file_id", file_id)
    }

    /// `STATUS` with no parameters.
    pub fn server_status() -> Self {
        CommandRequest::new(STATUS)
    }

    /// Appends a query parameter. Values are percent-encoded when the URL is
    /// assembled.
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Requests a specific archived version of the file.
    pub fn with_file_version(self, version: u32) -> Self {
        self.with_param("file_version", &version.to_string())
    }

    /// Names a server-side processing plug-in to run on the file before it is
    /// sent back.
    pub fn with_processing(self, plugin: &str) -> Self {
        self.with_param("processing", plugin)
    }

    /// `Authorization` header value to send with the request.
    pub fn with_authorization(mut self, value: &str) -> Self {
        self.authorization = Some(value.to_string());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Assembles the full command URL for a server.
    pub fn url(&self, host: &str, port: u16) -> Result<String, RequestError> {
        let base = format!("http://{}:{}/{}", host, port, self.command);
        let mut url = Url::parse(&base).map_err(|source| RequestError::Address {
            host: host.to_string(),
            port,
            source,
        })?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.params {
                pairs.append_pair(name, value);
            }
        }
        Ok(url.into())
    }

    /// Extra request headers for this command, as `(name, value)` pairs.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.authorization
            .iter()
            .map(|value| ("Authorization".to_string(), value.clone()))
            .collect()
    }
}
