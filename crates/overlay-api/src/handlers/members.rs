//! /members (directory) and /neighbors (node) handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::{ApiState, MemberInfo, OverlayView};

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub members: Vec<MemberInfo>,
}

pub async fn handle_members(
    State(state): State<ApiState>,
) -> Result<Json<MembersResponse>, (StatusCode, String)> {
    let OverlayView::Directory(registry) = &state.view else {
        return Err((
            StatusCode::NOT_FOUND,
            "members are only known to the directory".to_string(),
        ));
    };
    let members = registry.snapshot().iter().map(MemberInfo::from).collect();
    Ok(Json(MembersResponse { members }))
}

#[derive(Debug, Serialize)]
pub struct NeighborsResponse {
    pub capacity: usize,
    pub neighbors: Vec<MemberInfo>,
}

pub async fn handle_neighbors(
    State(state): State<ApiState>,
) -> Result<Json<NeighborsResponse>, (StatusCode, String)> {
    let OverlayView::Node(node) = &state.view else {
        return Err((
            StatusCode::NOT_FOUND,
            "the directory has no neighbors".to_string(),
        ));
    };
    let neighbors = node.neighbors().iter().map(MemberInfo::from).collect();
    Ok(Json(NeighborsResponse {
        capacity: node.table().capacity(),
        neighbors,
    }))
}
