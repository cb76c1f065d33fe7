//! Transport boundary.
//!
//! The harness only needs two calls from a WebDAV client: store bytes at a
//! path and fetch them back. [`Connector`] opens one session per simulated
//! client; sessions never share state.

mod http;
#[cfg(test)]
pub(crate) mod scripted;

pub use http::{HttpConnector, HttpTransport};

use crate::config::Endpoint;
use crate::error::TransportError;

/// HTTP 200 OK.
pub const STATUS_OK: u16 = 200;
/// HTTP 201 Created.
pub const STATUS_CREATED: u16 = 201;

/// A single client session against a WebDAV endpoint.
pub trait Transport {
    /// Store `body` at `path`, returning the response status.
    fn put(&mut self, path: &str, body: &[u8]) -> Result<u16, TransportError>;

    /// Fetch `path`, returning the response status and body.
    fn get(&mut self, path: &str) -> Result<(u16, Vec<u8>), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn put(&mut self, path: &str, body: &[u8]) -> Result<u16, TransportError> {
        (**self).put(path, body)
    }

    fn get(&mut self, path: &str) -> Result<(u16, Vec<u8>), TransportError> {
        (**self).get(path)
    }
}

/// Opens transport sessions.
pub trait Connector {
    /// Establish a fresh session. Failing here skips every round of the session.
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Transport>, TransportError>;
}
