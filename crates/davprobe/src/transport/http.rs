//! Blocking HTTP transport built on `ureq`.

use super::{Connector, Transport};
use crate::config::Endpoint;
use crate::error::TransportError;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use ureq::Agent;

/// Opens one [`HttpTransport`] per session.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
    max_body: u64,
}

impl HttpConnector {
    /// `timeout` bounds session setup and every request; `max_body` caps how
    /// many response bytes a download may read.
    pub fn new(timeout: Duration, max_body: u64) -> Self {
        Self { timeout, max_body }
    }

    /// Check the endpoint accepts TCP connections within the timeout.
    fn probe(&self, endpoint: &Endpoint) -> Result<(), TransportError> {
        let host = endpoint.host.trim_start_matches('[').trim_end_matches(']');
        let addr = format!("{}:{}", endpoint.host, endpoint.port);

        let resolved = (host, endpoint.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;

        let mut last_error = None;
        for socket_addr in resolved {
            match TcpStream::connect_timeout(&socket_addr, self.timeout) {
                Ok(_) => return Ok(()),
                Err(e) => {
                    tracing::debug!(addr = %socket_addr, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(TransportError::Connect {
            addr,
            reason: last_error.map_or_else(|| "no addresses resolved".to_string(), |e| e.to_string()),
        })
    }
}

impl Connector for HttpConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Transport>, TransportError> {
        self.probe(endpoint)?;
        Ok(Box::new(HttpTransport::new(endpoint, self.timeout, self.max_body)))
    }
}

/// A WebDAV session over plain HTTP.
///
/// Each instance owns its own agent, so connection pools are never shared
/// between sessions.
pub struct HttpTransport {
    agent: Agent,
    endpoint: Endpoint,
    max_body: u64,
}

impl HttpTransport {
    pub fn new(endpoint: &Endpoint, timeout: Duration, max_body: u64) -> Self {
        // Status codes are data here, not errors
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            endpoint: endpoint.clone(),
            max_body,
        }
    }
}

impl Transport for HttpTransport {
    fn put(&mut self, path: &str, body: &[u8]) -> Result<u16, TransportError> {
        let url = self.endpoint.url_for(path);
        let response = self
            .agent
            .put(url.as_str())
            .send(body)
            .map_err(map_ureq_error)?;
        Ok(response.status().as_u16())
    }

    fn get(&mut self, path: &str) -> Result<(u16, Vec<u8>), TransportError> {
        let url = self.endpoint.url_for(path);
        let mut response = self.agent.get(url.as_str()).call().map_err(map_ureq_error)?;
        let status = response.status().as_u16();

        // One byte past the cap is enough to fail the checksum, so an
        // oversized body is reported as content, not as a transport error
        let mut body = Vec::new();
        response
            .body_mut()
            .as_reader()
            .take(self.max_body + 1)
            .read_to_end(&mut body)?;
        Ok((status, body))
    }
}

fn map_ureq_error(e: ureq::Error) -> TransportError {
    match e {
        ureq::Error::Timeout(_) => TransportError::Timeout(e.to_string()),
        ureq::Error::Io(io) => TransportError::Io(io),
        other => TransportError::Other(other.to_string()),
    }
}
