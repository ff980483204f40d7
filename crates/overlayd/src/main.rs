//! overlayd: overlay directory and node daemon.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use overlay_api::{ApiState, OverlayView};
use overlay_core::config::{OverlayConfig, DEFAULT_DIRECTORY_PORT};
use overlay_services::{Directory, DirectoryRegistry, JoinOutcome, Node, NodeOptions};

mod cli;
mod console;
mod shutdown;

use cli::Role;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = OverlayConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = OverlayConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        OverlayConfig::default()
    });
    let role = cli::parse(std::env::args().skip(1), &mut config)?;
    config.validate()?;

    // ── Shutdown channels ────────────────────────────────────────────────────
    // `quit` collects requests (signal, console, API); `stop` ends the listener.
    let (quit_tx, mut quit_rx) = broadcast::channel::<()>(4);
    let (stop_tx, _) = broadcast::channel::<()>(1);

    {
        let quit = quit_tx.clone();
        tokio::spawn(async move {
            shutdown::shutdown_signal().await;
            let _ = quit.send(());
        });
    }

    match role {
        Role::Directory => {
            let registry = Arc::new(DirectoryRegistry::new());
            let addr = SocketAddr::new(config.directory.bind, config.directory.port);
            let directory = Directory::start(
                addr,
                registry.clone(),
                config.protocol.clone(),
                stop_tx.subscribe(),
            )
            .await?;
            tracing::info!(addr = %directory.local_addr(), "directory started");

            start_frontends(&config, OverlayView::Directory(registry), &quit_tx);

            let _ = quit_rx.recv().await;
            tracing::info!("shutting down");
            let _ = stop_tx.send(());
            directory.wait().await
        }
        Role::Node => {
            let directory = resolve_directory(&config.node.directory).await?;
            let options = NodeOptions {
                name: config.node.resolved_name(),
                directory,
                bind: config.node.bind,
                port: config.node.fixed_port(),
                max_neighbors: config.node.max_neighbors,
                protocol: config.protocol.clone(),
            };
            let running = Node::start(options, stop_tx.subscribe())
                .await
                .context("node startup failed")?;

            let node = running.node().clone();
            match running.joined() {
                JoinOutcome::Founder => {
                    tracing::info!(node = %node.identity(), "started a new overlay")
                }
                JoinOutcome::Linked(peer) => {
                    tracing::info!(node = %node.identity(), peer = %peer, "joined the overlay")
                }
                JoinOutcome::Isolated(_) => {
                    tracing::warn!(node = %node.identity(), "running without neighbors")
                }
            }

            start_frontends(&config, OverlayView::Node(node.clone()), &quit_tx);

            let _ = quit_rx.recv().await;
            tracing::info!("shutting down");
            node.depart().await;
            let _ = stop_tx.send(());
            running.wait().await
        }
    }
}

/// Console on stdin, plus the HTTP API when a port is configured.
fn start_frontends(config: &OverlayConfig, view: OverlayView, quit: &broadcast::Sender<()>) {
    tokio::spawn(console::run(view.clone(), quit.clone()));

    let port = config.api.port;
    if port == 0 {
        return;
    }
    let state = ApiState {
        view,
        shutdown_tx: quit.clone(),
    };
    tokio::spawn(async move {
        if let Err(e) = overlay_api::serve(state, port).await {
            tracing::error!(error = %e, "API server failed");
        }
    });
}

/// Resolve `host[:port]`, defaulting to the well-known directory port.
async fn resolve_directory(target: &str) -> Result<SocketAddr> {
    let with_port = if target.contains(':') {
        target.to_string()
    } else {
        format!("{target}:{DEFAULT_DIRECTORY_PORT}")
    };
    let addr = tokio::net::lookup_host(&with_port)
        .await
        .with_context(|| format!("failed to resolve directory {target}"))?
        .next()
        .with_context(|| format!("directory {target} resolved to no addresses"));
    addr
}
