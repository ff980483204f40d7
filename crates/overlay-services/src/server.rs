//! Inbound line server shared by the directory and every node.
//!
//! One task per accepted connection, capped by a semaphore. Each task reads
//! one line, hands the parsed request to the role's `RequestHandler`, writes
//! the reply if there is one, and closes.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Semaphore};

use overlay_core::config::ProtocolConfig;
use overlay_core::{ProtocolError, Request};

use crate::transport::{read_line, write_line};

/// Role-specific request handling.
///
/// Handlers only touch in-memory state; all network I/O stays in the
/// server loop. Returning `None` means the request gets no reply line.
pub trait RequestHandler: Send + Sync + 'static {
    /// Short role name used in log fields.
    fn role(&self) -> &'static str;

    /// Handle one request from `source` (the transport peer address).
    fn handle(&self, request: Request, source: IpAddr) -> Option<String>;
}

/// Accept connections until `shutdown` fires.
pub async fn serve<H: RequestHandler>(
    listener: TcpListener,
    handler: Arc<H>,
    protocol: ProtocolConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let permits = Arc::new(Semaphore::new(protocol.max_concurrent_handlers.max(1)));
    let local = listener.local_addr()?;
    tracing::info!(role = handler.role(), addr = %local, "listening");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!(role = handler.role(), "listener shutting down");
                return Ok(());
            }

            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(role = handler.role(), error = %e, "accept failed");
                        continue;
                    }
                };

                let permit = match permits.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return Ok(()), // semaphore closed
                };

                let handler = handler.clone();
                let protocol = protocol.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer, handler.as_ref(), &protocol).await {
                        tracing::warn!(role = handler.role(), %peer, error = %e, "connection aborted");
                    }
                    drop(permit);
                });
            }
        }
    }
}

async fn handle_connection<H: RequestHandler>(
    stream: TcpStream,
    peer: SocketAddr,
    handler: &H,
    protocol: &ProtocolConfig,
) -> Result<(), ProtocolError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let line = read_line(&mut reader, protocol.read_timeout()).await?;
    let request = Request::parse(&line)?;
    tracing::debug!(role = handler.role(), %peer, request = %request, "request received");

    if let Some(reply) = handler.handle(request, peer.ip().to_canonical()) {
        write_line(&mut write_half, &reply).await?;
    }
    Ok(())
}
