//! High-level archive client: builds command requests, runs the exchange,
//! and saves retrieved files to disk.

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::command::CommandRequest;
use crate::config::ClientConfig;
use crate::connection::CurlConnection;
use crate::naming;
use crate::response::Retrieval;
use crate::status::Status;
use crate::storage::{self, StorageWriter};

const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Client for one archive server.
pub struct ArchiveClient {
    host: String,
    port: u16,
    authorization: Option<String>,
    block_size: usize,
}

/// What a completed [`ArchiveClient::retrieve_to`] produced.
#[derive(Debug)]
pub struct RetrieveReport {
    /// Final path of the saved file.
    pub path: PathBuf,
    /// Bytes written.
    pub bytes: u64,
    /// Exchange outcome (success arm).
    pub status: Status,
}

impl ArchiveClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ArchiveClient {
            host: host.into(),
            port,
            authorization: None,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn from_config(cfg: &ClientConfig) -> Self {
        ArchiveClient {
            host: cfg.host.clone(),
            port: cfg.port,
            authorization: cfg.authorization.clone(),
            block_size: cfg.block_size,
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// Sends `request` and settles the response. The returned outcome carries
    /// either the body stream or the diagnostic status; HTTP-level rejection
    /// is not an `Err` here.
    pub fn send(&self, request: CommandRequest) -> Result<Retrieval<CurlConnection>> {
        let request = match &self.authorization {
            Some(value) => request.with_authorization(value),
            None => request,
        };
        let url = request.url(&self.host, self.port)?;
        tracing::debug!(%url, "sending archive command");
        let conn = CurlConnection::open(&url, &request.headers())
            .with_context(|| format!("failed to start transfer for {}", request.command()))?;
        Ok(Retrieval::begin(conn))
    }

    /// `RETRIEVE` for `file_id` (optionally a specific archived version),
    /// returning the settled outcome for the caller to stream or inspect.
    pub fn retrieve(
        &self,
        file_id: &str,
        file_version: Option<u32>,
    ) -> Result<Retrieval<CurlConnection>> {
        let mut request = CommandRequest::retrieve(file_id);
        if let Some(version) = file_version {
            request = request.with_file_version(version);
        }
        self.send(request)
    }

    /// Retrieves `file_id` into `dest_dir`.
    ///
    /// The body is written through a `.part` temp file (preallocated to the
    /// advertised `Content-Length` when known) and renamed into place once
    /// complete. A body that ends short of the advertised length is an error;
    /// the temp file is left behind for inspection.
    pub fn retrieve_to(
        &self,
        file_id: &str,
        file_version: Option<u32>,
        dest_dir: &Path,
    ) -> Result<RetrieveReport> {
        let mut stream = match self.retrieve(file_id, file_version)? {
            Retrieval::Success(stream) => stream,
            Retrieval::Failure(failure) => {
                let status = failure.status().clone();
                if let Some(document) = status.error_document() {
                    tracing::warn!(%document, "status document for rejected retrieve");
                }
                failure.close();
                bail!("RETRIEVE {} failed: {}", file_id, status);
            }
        };

        let filename = naming::derive_filename(
            file_id,
            stream.header("Content-Disposition").as_deref(),
        );
        let final_path = dest_dir.join(&filename);
        let temp_path = storage::temp_path(&final_path);

        let content_length = stream.status().content_length();
        let writer = StorageWriter::create(&temp_path, content_length)?;

        let mut offset = 0u64;
        let mut buf = vec![0u8; self.block_size];
        loop {
            let n = stream
                .read(&mut buf)
                .with_context(|| format!("error while reading body of {}", file_id))?;
            if n == 0 {
                break;
            }
            writer.write_at(offset, &buf[..n])?;
            offset += n as u64;
        }

        if let Some(expected) = content_length {
            if offset != expected {
                bail!(
                    "partial transfer of {}: wrote {} of {} bytes",
                    file_id,
                    offset,
                    expected
                );
            }
        }

        writer.sync()?;
        writer.finalize(&final_path)?;
        let status = stream.status().clone();
        stream.close();
        tracing::info!(path = %final_path.display(), bytes = offset, "retrieve complete");

        Ok(RetrieveReport {
            path: final_path,
            bytes: offset,
            status,
        })
    }

    /// Issues `STATUS` and returns the server status document text.
    pub fn server_status(&self) -> Result<String> {
        match self.send(CommandRequest::server_status())? {
            Retrieval::Success(mut stream) => {
                let mut document = String::new();
                stream
                    .read_to_string(&mut document)
                    .context("error while reading status document")?;
                stream.close();
                Ok(document)
            }
            Retrieval::Failure(failure) => {
                let status = failure.status().clone();
                failure.close();
                bail!("STATUS failed: {}", status);
            }
        }
    }
}
