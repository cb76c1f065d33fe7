//! In-process WebDAV server for end-to-end tests.
//!
//! Serves an in-memory filesystem on an ephemeral localhost port from a
//! tokio runtime owned by the server. The harness under test is blocking,
//! so tests call it directly from the test thread.

#![allow(dead_code)]

use dav_server::{DavHandler, fakels::FakeLs, memfs::MemFs};
use davprobe::Endpoint;
use hyper::Request;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;

pub struct TestServer {
    addr: SocketAddr,
    // Dropping the runtime stops the accept loop
    _runtime: Runtime,
}

impl TestServer {
    pub fn start() -> Self {
        let runtime = Runtime::new().expect("Failed to create tokio runtime");

        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("No local address");

        let handler = Arc::new(
            DavHandler::builder()
                .filesystem(MemFs::new())
                .locksystem(FakeLs::new())
                .build_handler(),
        );

        runtime.spawn(serve(listener, handler));

        Self {
            addr,
            _runtime: runtime,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Endpoint pointing at this server with the given path template.
    pub fn endpoint(&self, path_template: &str) -> Endpoint {
        Endpoint::new("127.0.0.1", self.port(), path_template)
    }
}

async fn serve(listener: TcpListener, handler: Arc<DavHandler>) {
    while let Ok((stream, _)) = listener.accept().await {
        let handler = handler.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req: Request<Incoming>| {
                let handler = handler.clone();
                async move { Ok::<_, Infallible>(handler.handle(req).await) }
            });
            let _ = auto::Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await;
        });
    }
}

/// A port nothing is listening on.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    listener.local_addr().expect("No local address").port()
}
