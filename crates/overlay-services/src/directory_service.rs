//! Directory service: answers `REGISTER` and `DISCONNECT` on the well-known port.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use overlay_core::config::ProtocolConfig;
use overlay_core::{DirectoryReply, Request};

use crate::directory::{DirectoryRegistry, Outcome};
use crate::server::{serve, RequestHandler};

pub struct DirectoryHandler {
    registry: Arc<DirectoryRegistry>,
}

impl DirectoryHandler {
    pub fn new(registry: Arc<DirectoryRegistry>) -> Self {
        Self { registry }
    }
}

impl RequestHandler for DirectoryHandler {
    fn role(&self) -> &'static str {
        "directory"
    }

    fn handle(&self, request: Request, source: IpAddr) -> Option<String> {
        match request {
            Request::Register { .. } => {
                let reply = match self.registry.register(request.sender(source)) {
                    Outcome::Founder => DirectoryReply::Confirm,
                    Outcome::Introduce(peer) => DirectoryReply::Introduce(peer),
                };
                Some(reply.to_string())
            }
            Request::Disconnect { ref name, port } => {
                tracing::info!(node = %name, %source, port, "node departed");
                self.registry.deregister(source, port);
                None
            }
            Request::RequestConnect { .. } => {
                tracing::warn!(%source, request = %request, "directory does not accept links, ignoring");
                None
            }
        }
    }
}

/// A running directory: the registry plus its accept loop.
pub struct Directory {
    registry: Arc<DirectoryRegistry>,
    local_addr: SocketAddr,
    task: JoinHandle<Result<()>>,
}

impl Directory {
    /// Bind `addr` and start serving.
    pub async fn start(
        addr: SocketAddr,
        registry: Arc<DirectoryRegistry>,
        protocol: ProtocolConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind directory on {addr}"))?;
        let local_addr = listener.local_addr()?;

        let handler = Arc::new(DirectoryHandler::new(registry.clone()));
        let task = tokio::spawn(serve(listener, handler, protocol, shutdown));

        Ok(Self {
            registry,
            local_addr,
            task,
        })
    }

    pub fn registry(&self) -> &Arc<DirectoryRegistry> {
        &self.registry
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the accept loop to finish.
    pub async fn wait(self) -> Result<()> {
        self.task.await.context("directory task panicked")?
    }
}
