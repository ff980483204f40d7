//! Overlay node: listener, registration, link negotiation, departure.
//!
//! Startup order: bind the listener (so the port we advertise is real and
//! early connect-requests queue in the backlog), register with the
//! directory, start accepting, then negotiate a link if we were introduced.

use std::net::{IpAddr, SocketAddr};
use std::ops::Range;
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::Rng;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use overlay_core::config::ProtocolConfig;
use overlay_core::{LinkReply, NodeIdentity, Request};

use crate::departure::{depart, DepartureReport};
use crate::negotiation::{LinkError, LinkNegotiator};
use crate::neighbor::{Admission, NeighborTable};
use crate::registration::{register, Registration, RegistrationError};
use crate::server::{serve, RequestHandler};

/// Ports a node picks from when none is configured.
pub const EPHEMERAL_PORTS: Range<u16> = 10_000..20_000;

const PORT_PICK_ATTEMPTS: usize = 16;

// ── Acceptor ──────────────────────────────────────────────────────────────────

/// Inbound side of a node: connect-requests and departures from peers.
pub struct NodeHandler {
    identity: NodeIdentity,
    table: Arc<NeighborTable>,
}

impl NodeHandler {
    pub fn new(identity: NodeIdentity, table: Arc<NeighborTable>) -> Self {
        Self { identity, table }
    }
}

impl RequestHandler for NodeHandler {
    fn role(&self) -> &'static str {
        "node"
    }

    fn handle(&self, request: Request, source: IpAddr) -> Option<String> {
        let sender = request.sender(source);
        match request {
            Request::RequestConnect { .. } => {
                if sender == self.identity {
                    tracing::warn!(peer = %sender, "refusing connect-request from ourselves");
                    return None;
                }
                let reply = match self.table.admit(sender.clone()) {
                    Admission::Accepted => {
                        tracing::info!(peer = %sender, neighbors = self.table.len(), "accepted new neighbor");
                        LinkReply::Accept
                    }
                    Admission::AlreadyLinked => {
                        tracing::debug!(peer = %sender, "already linked, accepting again");
                        LinkReply::Accept
                    }
                    Admission::Redirect(target) => {
                        tracing::info!(peer = %sender, to = %target, "table full, redirecting");
                        LinkReply::Redirect(target)
                    }
                };
                Some(reply.to_string())
            }
            Request::Disconnect { .. } => {
                if self.table.remove(sender.address(), sender.port()) {
                    tracing::info!(peer = %sender, neighbors = self.table.len(), "neighbor departed");
                } else {
                    tracing::debug!(peer = %sender, "departure from non-neighbor");
                }
                None
            }
            Request::Register { .. } => {
                tracing::warn!(peer = %sender, "nodes do not take registrations, ignoring");
                None
            }
        }
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NodeOptions {
    pub name: String,
    pub directory: SocketAddr,
    pub bind: IpAddr,
    /// `None` picks a free port from `EPHEMERAL_PORTS`. `Some(0)` lets the OS choose.
    pub port: Option<u16>,
    pub max_neighbors: usize,
    pub protocol: ProtocolConfig,
}

/// How joining the overlay went.
#[derive(Debug)]
pub enum JoinOutcome {
    /// First member; nothing to link to.
    Founder,
    /// Linked to this node.
    Linked(NodeIdentity),
    /// Registered and listening, but no link could be made.
    Isolated(LinkError),
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind node listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

struct NodeInner {
    identity: NodeIdentity,
    directory: SocketAddr,
    table: Arc<NeighborTable>,
    protocol: ProtocolConfig,
}

/// Shared handle to a running node's state.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Bring a node up and into the overlay.
    ///
    /// Fails only if the listener cannot be bound or registration fails;
    /// a failed link negotiation is reported through `JoinOutcome`.
    pub async fn start(
        options: NodeOptions,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<RunningNode, StartupError> {
        let listener = bind_listener(options.bind, options.port)
            .await
            .map_err(StartupError::Bind)?;
        let port = listener.local_addr().map_err(StartupError::Bind)?.port();

        let registration =
            register(options.directory, &options.name, port, &options.protocol).await?;

        let identity = NodeIdentity::new(options.name, registration.local_addr(), port);
        let table = Arc::new(NeighborTable::new(options.max_neighbors));
        tracing::info!(node = %identity, capacity = table.capacity(), "node identity");

        let handler = Arc::new(NodeHandler::new(identity.clone(), table.clone()));
        let task = tokio::spawn(serve(listener, handler, options.protocol.clone(), shutdown));

        let node = Node {
            inner: Arc::new(NodeInner {
                identity,
                directory: options.directory,
                table,
                protocol: options.protocol,
            }),
        };

        let joined = match registration {
            Registration::Founder { .. } => JoinOutcome::Founder,
            Registration::Introduced { peer, .. } => match node.link(peer).await {
                Ok(linked) => JoinOutcome::Linked(linked),
                Err(e) => {
                    tracing::warn!(error = %e, "could not link into the overlay");
                    JoinOutcome::Isolated(e)
                }
            },
        };

        Ok(RunningNode { node, joined, task })
    }

    /// Negotiate a link starting at `peer`, following redirects.
    pub async fn link(&self, peer: NodeIdentity) -> Result<NodeIdentity, LinkError> {
        let inner = &self.inner;
        LinkNegotiator::new(&inner.identity, &inner.table, &inner.protocol)
            .negotiate(peer)
            .await
    }

    /// Tell the directory and every neighbor we are leaving.
    pub async fn depart(&self) -> DepartureReport {
        let inner = &self.inner;
        depart(&inner.identity, inner.directory, &inner.table, &inner.protocol).await
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.inner.identity
    }

    pub fn directory(&self) -> SocketAddr {
        self.inner.directory
    }

    pub fn table(&self) -> &Arc<NeighborTable> {
        &self.inner.table
    }

    pub fn neighbors(&self) -> Vec<NodeIdentity> {
        self.inner.table.snapshot()
    }
}

/// A started node plus its accept loop.
pub struct RunningNode {
    node: Node,
    joined: JoinOutcome,
    task: JoinHandle<Result<()>>,
}

impl RunningNode {
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn joined(&self) -> &JoinOutcome {
        &self.joined
    }

    /// Wait for the accept loop to stop (after the shutdown signal).
    pub async fn wait(self) -> Result<()> {
        self.task.await.context("node listener task panicked")?
    }
}

/// Bind the node listener on a fixed port, or on a random free one.
async fn bind_listener(bind: IpAddr, port: Option<u16>) -> std::io::Result<TcpListener> {
    if let Some(port) = port {
        return TcpListener::bind(SocketAddr::new(bind, port)).await;
    }

    let mut last_err = None;
    for _ in 0..PORT_PICK_ATTEMPTS {
        let port = rand::thread_rng().gen_range(EPHEMERAL_PORTS);
        match TcpListener::bind(SocketAddr::new(bind, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => last_err = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::AddrInUse)))
}
