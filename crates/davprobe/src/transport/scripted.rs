//! In-memory transport for unit tests.

use super::{Connector, STATUS_CREATED, STATUS_OK, Transport};
use crate::config::Endpoint;
use crate::error::TransportError;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::rc::Rc;

/// Server-side state shared by every scripted session.
#[derive(Debug, Default)]
pub(crate) struct FakeServer {
    pub files: HashMap<String, Vec<u8>>,
    /// Status returned for every PUT instead of 201.
    pub put_status: Option<u16>,
    /// Status returned for every GET instead of 200/404.
    pub get_status: Option<u16>,
    /// Flip the first byte of every GET body.
    pub corrupt_reads: bool,
    pub put_times_out: bool,
    pub get_breaks: bool,
    /// 1-based session numbers whose connect fails.
    pub refuse_sessions: HashSet<usize>,
    pub sessions_opened: usize,
    pub puts: usize,
    pub gets: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedConnector {
    pub server: Rc<RefCell<FakeServer>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(configure: impl FnOnce(&mut FakeServer)) -> Self {
        let connector = Self::new();
        configure(&mut connector.server.borrow_mut());
        connector
    }

    pub fn transport(&self) -> ScriptedTransport {
        ScriptedTransport {
            server: Rc::clone(&self.server),
        }
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Transport>, TransportError> {
        let session = {
            let mut server = self.server.borrow_mut();
            server.sessions_opened += 1;
            server.sessions_opened
        };
        if self.server.borrow().refuse_sessions.contains(&session) {
            return Err(TransportError::Connect {
                addr: format!("{}:{}", endpoint.host, endpoint.port),
                reason: "connection refused".to_string(),
            });
        }
        Ok(Box::new(self.transport()))
    }
}

pub(crate) struct ScriptedTransport {
    server: Rc<RefCell<FakeServer>>,
}

impl Transport for ScriptedTransport {
    fn put(&mut self, path: &str, body: &[u8]) -> Result<u16, TransportError> {
        let mut server = self.server.borrow_mut();
        server.puts += 1;
        if server.put_times_out {
            return Err(TransportError::Timeout("scripted".to_string()));
        }
        let status = server.put_status.unwrap_or(STATUS_CREATED);
        if status == STATUS_CREATED {
            server.files.insert(path.to_string(), body.to_vec());
        }
        Ok(status)
    }

    fn get(&mut self, path: &str) -> Result<(u16, Vec<u8>), TransportError> {
        let mut server = self.server.borrow_mut();
        server.gets += 1;
        if server.get_breaks {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "scripted").into());
        }
        let stored = server.files.get(path).cloned();
        let status = server
            .get_status
            .unwrap_or(if stored.is_some() { STATUS_OK } else { 404 });
        let mut body = stored.unwrap_or_default();
        if server.corrupt_reads
            && let Some(first) = body.first_mut()
        {
            *first ^= 0xFF;
        }
        Ok((status, body))
    }
}
