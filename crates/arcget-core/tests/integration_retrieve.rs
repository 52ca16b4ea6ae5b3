//! Integration tests: end-to-end retrieves against a local archive server.
//!
//! Starts a minimal in-process server, retrieves through the real client
//! (curl transfer, response adapter, storage), and checks what lands on disk.

mod common;

use std::io::Read;
use std::net::TcpListener;

use arcget_core::client::ArchiveClient;
use arcget_core::response::Retrieval;
use common::archive_server::{self, ArchiveServerOptions};
use tempfile::tempdir;

fn served_body() -> Vec<u8> {
    (0u8..251).cycle().take(48 * 1024).collect()
}

#[test]
fn retrieve_to_saves_exact_bytes_named_by_file_id() {
    let body = served_body();
    let (host, port) = archive_server::start(body.clone(), ArchiveServerOptions::default());

    let dir = tempdir().unwrap();
    let client = ArchiveClient::new(host, port);
    let report = client.retrieve_to("obs-42.fits", None, dir.path()).unwrap();

    assert_eq!(report.path, dir.path().join("obs-42.fits"));
    assert_eq!(report.bytes, body.len() as u64);
    assert!(report.status.is_ok());
    assert_eq!(report.status.content_length(), Some(body.len() as u64));
    assert_eq!(std::fs::read(&report.path).unwrap(), body);
    assert!(!dir.path().join("obs-42.fits.part").exists());
}

#[test]
fn retrieve_to_honors_content_disposition() {
    let body = b"payload".to_vec();
    let (host, port) = archive_server::start(
        body.clone(),
        ArchiveServerOptions {
            advertised_filename: Some("from-header.fits".to_string()),
            ..Default::default()
        },
    );

    let dir = tempdir().unwrap();
    let client = ArchiveClient::new(host, port);
    let report = client.retrieve_to("obs-42.fits", None, dir.path()).unwrap();

    assert_eq!(report.path, dir.path().join("from-header.fits"));
    assert_eq!(std::fs::read(&report.path).unwrap(), body);
}

#[test]
fn retrieve_stream_reads_exact_bytes() {
    let body = served_body();
    let (host, port) = archive_server::start(body.clone(), ArchiveServerOptions::default());

    let client = ArchiveClient::new(host, port);
    match client.retrieve("obs-42.fits", None).unwrap() {
        Retrieval::Success(mut stream) => {
            assert_eq!(stream.status().code(), Some(200));
            assert_eq!(stream.status().content_length(), Some(body.len() as u64));
            let mut out = Vec::new();
            stream.read_to_end(&mut out).unwrap();
            assert_eq!(out, body);
        }
        Retrieval::Failure(failure) => panic!("unexpected failure: {}", failure.status()),
    }
}

#[test]
fn unknown_file_id_yields_failure_status_with_document() {
    let (host, port) = archive_server::start(b"irrelevant".to_vec(), ArchiveServerOptions::default());

    let client = ArchiveClient::new(host, port);
    match client.retrieve("no-such-file.fits", None).unwrap() {
        Retrieval::Failure(failure) => {
            let status = failure.status();
            assert_eq!(status.code(), Some(404));
            let document = status.error_document().expect("status document");
            assert!(document.contains("not found in archive"));
            assert!(document.ends_with('\n'));
            failure.close();
        }
        Retrieval::Success(_) => panic!("expected failure for unknown file id"),
    }
}

#[test]
fn retrieve_to_unknown_file_is_an_error() {
    let (host, port) = archive_server::start(b"irrelevant".to_vec(), ArchiveServerOptions::default());

    let dir = tempdir().unwrap();
    let client = ArchiveClient::new(host, port);
    let err = client
        .retrieve_to("no-such-file.fits", None, dir.path())
        .unwrap_err();
    assert!(err.to_string().contains("RETRIEVE"));
    assert!(err.to_string().contains("404"));
}

#[test]
fn server_status_returns_document() {
    let (host, port) = archive_server::start(Vec::new(), ArchiveServerOptions::default());

    let client = ArchiveClient::new(host, port);
    let document = client.server_status().unwrap();
    assert!(document.contains("ONLINE"));
}

#[test]
fn truncated_body_is_an_error() {
    let body = served_body();
    let (host, port) = archive_server::start(
        body,
        ArchiveServerOptions {
            truncate_after: Some(1024),
            ..Default::default()
        },
    );

    let dir = tempdir().unwrap();
    let client = ArchiveClient::new(host, port);
    let result = client.retrieve_to("obs-42.fits", None, dir.path());
    assert!(result.is_err(), "short body must not be reported as success");
    assert!(!dir.path().join("obs-42.fits").exists());
}

#[test]
fn unreachable_server_becomes_transport_failure() {
    // Grab a free port and release it so nothing is listening there.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = ArchiveClient::new("127.0.0.1", port);
    match client.retrieve("obs-42.fits", None).unwrap() {
        Retrieval::Failure(failure) => {
            let status = failure.status();
            assert!(!status.is_ok());
            assert!(status.code().is_none(), "transport failures carry no HTTP code");
        }
        Retrieval::Success(_) => panic!("expected transport failure"),
    }
}
