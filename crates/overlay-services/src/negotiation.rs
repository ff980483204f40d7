//! Link negotiation: walk redirects until some node accepts us.
//!
//! Each hop is its own connection: connect, send `REQUEST_CONNECT`, read
//! one reply, close. A full node answers with one of its own neighbors and
//! we try that one next. The walk is bounded by `max_redirect_hops` and by
//! a visited set, so it always terminates.

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use overlay_core::config::ProtocolConfig;
use overlay_core::{LinkReply, NodeIdentity, ProtocolError, Request};

use crate::neighbor::NeighborTable;
use crate::transport::{notify, Connection};

/// Why the walk ended without a link.
#[derive(Debug)]
pub enum UnreachableReason {
    /// A hop could not be completed.
    Transport {
        target: NodeIdentity,
        source: ProtocolError,
    },
    /// A redirect pointed back at a node already tried (or at ourselves).
    Cycle(NodeIdentity),
    /// Redirects kept coming after the hop bound.
    HopLimit(usize),
}

impl fmt::Display for UnreachableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnreachableReason::Transport { target, source } => {
                write!(f, "{target} failed: {source}")
            }
            UnreachableReason::Cycle(target) => write!(f, "redirected back to {target}"),
            UnreachableReason::HopLimit(limit) => write!(f, "more than {limit} redirects"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("no node with spare capacity reached after {attempts} attempt(s): {reason}")]
    Unreachable {
        attempts: usize,
        reason: UnreachableReason,
    },
    /// `peer` accepted, but our own table filled up in the meantime.
    #[error("{peer} accepted but the local neighbor table is full")]
    LocalTableFull { peer: NodeIdentity },
}

pub struct LinkNegotiator<'a> {
    local: &'a NodeIdentity,
    table: &'a NeighborTable,
    protocol: &'a ProtocolConfig,
}

impl<'a> LinkNegotiator<'a> {
    pub fn new(
        local: &'a NodeIdentity,
        table: &'a NeighborTable,
        protocol: &'a ProtocolConfig,
    ) -> Self {
        Self {
            local,
            table,
            protocol,
        }
    }

    /// Negotiate a link starting at `first`. On success the accepting node
    /// is in our table and we are in theirs.
    pub async fn negotiate(&self, first: NodeIdentity) -> Result<NodeIdentity, LinkError> {
        let mut visited: HashSet<SocketAddr> = HashSet::new();
        visited.insert(self.local.socket_addr());

        let max_hops = self.protocol.max_redirect_hops;
        let mut target = first;
        let mut attempts = 0;

        loop {
            if !visited.insert(target.socket_addr()) {
                return Err(LinkError::Unreachable {
                    attempts,
                    reason: UnreachableReason::Cycle(target),
                });
            }

            attempts += 1;
            tracing::debug!(peer = %target, attempt = attempts, "requesting link");

            let reply = match self.request_link(&target).await {
                Ok(reply) => reply,
                Err(source) => {
                    if source.is_unreachable() {
                        tracing::warn!(peer = %target, error = %source, "link target unreachable");
                    } else {
                        tracing::warn!(peer = %target, error = %source, "link exchange failed");
                    }
                    return Err(LinkError::Unreachable {
                        attempts,
                        reason: UnreachableReason::Transport { target, source },
                    });
                }
            };

            match reply {
                LinkReply::Accept => return self.record_accept(target).await,
                LinkReply::Redirect(next) => {
                    tracing::info!(from = %target, to = %next, "redirected");
                    // following this redirect would be hop number `attempts`
                    if attempts > max_hops {
                        return Err(LinkError::Unreachable {
                            attempts,
                            reason: UnreachableReason::HopLimit(max_hops),
                        });
                    }
                    target = next;
                }
            }
        }
    }

    async fn request_link(&self, target: &NodeIdentity) -> Result<LinkReply, ProtocolError> {
        let mut conn = Connection::open(target.socket_addr(), self.protocol).await?;
        let request = Request::RequestConnect {
            name: self.local.name().to_string(),
            port: self.local.port(),
        };
        conn.send(&request.to_string()).await?;
        let line = conn.recv().await?;
        conn.close().await;
        Ok(LinkReply::parse(&line)?)
    }

    async fn record_accept(&self, peer: NodeIdentity) -> Result<NodeIdentity, LinkError> {
        if self.table.try_insert(peer.clone()) {
            tracing::info!(peer = %peer, neighbors = self.table.len(), "linked");
            return Ok(peer);
        }

        // The acceptor already holds its half of the link; take it back.
        let bye = Request::Disconnect {
            name: self.local.name().to_string(),
            port: self.local.port(),
        };
        if let Err(e) = notify(peer.socket_addr(), &bye.to_string(), self.protocol).await {
            tracing::debug!(peer = %peer, error = %e, "failed to withdraw half-open link");
        }
        tracing::warn!(peer = %peer, "accepted, but local table filled up meanwhile");
        Err(LinkError::LocalTableFull { peer })
    }
}
