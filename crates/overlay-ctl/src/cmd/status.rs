//! Daemon status and shutdown commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};
use super::members::MemberInfo;

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusResponse {
    role: String,
    node: Option<MemberInfo>,
    members: Option<usize>,
    neighbors: Option<usize>,
    max_neighbors: Option<usize>,
}

#[derive(Deserialize)]
struct ShutdownResponse {
    message: String,
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Overlay Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Role      : {}", resp.role);
    if let Some(node) = &resp.node {
        println!("  Identity  : {}", node);
    }
    if let Some(members) = resp.members {
        println!("  Members   : {}", members);
    }
    if let (Some(n), Some(max)) = (resp.neighbors, resp.max_neighbors) {
        println!("  Neighbors : {}/{}", n, max);
    }

    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    let resp: ShutdownResponse = post_json(&format!("{}/shutdown", base_url(port))).await?;
    println!("{}", resp.message);
    Ok(())
}
