//! /status and /shutdown handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::{ApiState, MemberInfo, OverlayView};

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub role: &'static str,
    /// This node's identity; absent on the directory.
    pub node: Option<MemberInfo>,
    pub members: Option<usize>,
    pub neighbors: Option<usize>,
    pub max_neighbors: Option<usize>,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let role = state.view.role();
    let resp = match &state.view {
        OverlayView::Directory(registry) => StatusResponse {
            role,
            node: None,
            members: Some(registry.len()),
            neighbors: None,
            max_neighbors: None,
        },
        OverlayView::Node(node) => StatusResponse {
            role,
            node: Some(node.identity().into()),
            members: None,
            neighbors: Some(node.table().len()),
            max_neighbors: Some(node.table().capacity()),
        },
    };
    Json(resp)
}

// ── /shutdown ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    let _ = state.shutdown_tx.send(());

    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}
