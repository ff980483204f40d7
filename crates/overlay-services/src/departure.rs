//! Departure: best-effort goodbye to the directory and every neighbor.
//!
//! Nothing here is acknowledged or retried, and no failure reaches the
//! caller. The directory is told first, then all neighbors at once.

use std::net::SocketAddr;

use futures::future::join_all;

use overlay_core::config::ProtocolConfig;
use overlay_core::{NodeIdentity, Request};

use crate::neighbor::NeighborTable;
use crate::transport::notify;

/// What got delivered, for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepartureReport {
    pub directory_notified: bool,
    pub neighbors_notified: usize,
    pub neighbors_failed: usize,
}

pub async fn depart(
    local: &NodeIdentity,
    directory: SocketAddr,
    table: &NeighborTable,
    protocol: &ProtocolConfig,
) -> DepartureReport {
    let line = Request::Disconnect {
        name: local.name().to_string(),
        port: local.port(),
    }
    .to_string();

    let mut report = DepartureReport::default();

    match notify(directory, &line, protocol).await {
        Ok(()) => report.directory_notified = true,
        Err(e) => tracing::debug!(%directory, error = %e, "directory unreachable on departure"),
    }

    let neighbors = table.snapshot();
    let results = join_all(
        neighbors
            .iter()
            .map(|peer| notify(peer.socket_addr(), &line, protocol)),
    )
    .await;

    for (peer, result) in neighbors.iter().zip(results) {
        match result {
            Ok(()) => report.neighbors_notified += 1,
            Err(e) => {
                report.neighbors_failed += 1;
                tracing::debug!(peer = %peer, error = %e, "neighbor unreachable on departure");
            }
        }
    }

    tracing::info!(
        directory = report.directory_notified,
        notified = report.neighbors_notified,
        failed = report.neighbors_failed,
        "departure sent"
    );
    report
}
