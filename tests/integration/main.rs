//! Overlay integration test harness.
//!
//! Every test runs a real directory and real nodes over loopback TCP in
//! one process. Listeners bind port 0, so tests can run in parallel.
//! Each test owns its `Overlay` and everything started from it.

mod capacity;
mod departure;
mod join;
mod robustness;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use overlay_core::config::ProtocolConfig;
use overlay_core::NodeIdentity;
use overlay_services::{Directory, DirectoryRegistry, Node, NodeOptions, RunningNode};

// ── Harness ───────────────────────────────────────────────────────────────────

pub const LO: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// A directory plus the nodes started against it.
pub struct Overlay {
    pub directory: Directory,
    pub protocol: ProtocolConfig,
    shutdown: broadcast::Sender<()>,
}

impl Overlay {
    pub async fn start() -> Self {
        Self::with_protocol(fast_protocol()).await
    }

    pub async fn with_protocol(protocol: ProtocolConfig) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        let directory = Directory::start(
            SocketAddr::new(LO, 0),
            Arc::new(DirectoryRegistry::new()),
            protocol.clone(),
            shutdown.subscribe(),
        )
        .await
        .expect("directory should start");
        Self {
            directory,
            protocol,
            shutdown,
        }
    }

    pub fn options(&self, name: &str) -> NodeOptions {
        NodeOptions {
            name: name.to_string(),
            directory: self.directory.local_addr(),
            bind: LO,
            port: Some(0),
            max_neighbors: 3,
            protocol: self.protocol.clone(),
        }
    }

    /// Start a node with K = 3 and wait for it to finish joining.
    pub async fn join(&self, name: &str) -> RunningNode {
        self.join_with(self.options(name)).await
    }

    pub async fn join_with(&self, options: NodeOptions) -> RunningNode {
        Node::start(options, self.shutdown.subscribe())
            .await
            .expect("node should start")
    }

    pub fn registry(&self) -> &Arc<DirectoryRegistry> {
        self.directory.registry()
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// Short timeouts so failing paths finish quickly.
pub fn fast_protocol() -> ProtocolConfig {
    ProtocolConfig {
        connect_timeout_ms: 1_000,
        read_timeout_ms: 1_000,
        ..ProtocolConfig::default()
    }
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub fn holds(node: &Node, peer: &NodeIdentity) -> bool {
    node.table().contains(peer.address(), peer.port())
}

/// An address nothing is listening on.
pub async fn dead_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind((LO, 0)).await.unwrap();
    listener.local_addr().unwrap()
}
