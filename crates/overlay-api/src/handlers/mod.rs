//! HTTP API handlers: exposes overlay membership as JSON.

pub mod members;
pub mod status;

use std::sync::Arc;

use serde::Serialize;

use overlay_core::NodeIdentity;
use overlay_services::{DirectoryRegistry, Node};

/// Which role this daemon runs, and a handle on its state.
#[derive(Clone)]
pub enum OverlayView {
    Directory(Arc<DirectoryRegistry>),
    Node(Node),
}

impl OverlayView {
    pub fn role(&self) -> &'static str {
        match self {
            OverlayView::Directory(_) => "directory",
            OverlayView::Node(_) => "node",
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub view: OverlayView,
    /// Requests a graceful daemon shutdown (departure first, for nodes).
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

// ── Shared types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MemberInfo {
    pub name: String,
    pub address: String,
    pub port: u16,
}

impl From<&NodeIdentity> for MemberInfo {
    fn from(id: &NodeIdentity) -> Self {
        Self {
            name: id.name().to_string(),
            address: id.address().to_string(),
            port: id.port(),
        }
    }
}

pub use members::{handle_members, handle_neighbors};
pub use status::{handle_shutdown, handle_status};
