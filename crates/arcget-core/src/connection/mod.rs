//! HTTP connection abstraction over an in-flight archive exchange.
//!
//! The response adapter only needs response metadata and body readers, so it
//! consumes this trait rather than a concrete client. [`CurlConnection`] is
//! the real implementation (blocking transfer over libcurl); unit tests use
//! scripted doubles.

mod curl;

pub use self::curl::CurlConnection;

use std::io::{self, Read};

/// An established HTTP exchange: response metadata plus body readers.
///
/// The response line and headers may not have arrived yet when the handle is
/// created; the metadata accessors block until the server answers. Each body
/// accessor hands out the body reader at most once.
pub trait Connection {
    /// HTTP status code of the response. Blocks until the status line arrives.
    fn response_code(&mut self) -> io::Result<u32>;

    /// Reason phrase from the status line. Blocks like [`Self::response_code`].
    fn response_message(&mut self) -> io::Result<String>;

    /// Case-insensitive response header lookup. Returns `None` for headers the
    /// server did not send, or before the response metadata has been read.
    fn header(&self, name: &str) -> Option<String>;

    /// Reader over the response body of a rejected command.
    fn error_body(&mut self) -> io::Result<Box<dyn Read + Send>>;

    /// Reader over the response body of an accepted command.
    fn success_body(&mut self) -> io::Result<Box<dyn Read + Send>>;

    /// Tear down the underlying transfer. Idempotent.
    fn disconnect(&mut self);
}
