//! Membership listings: directory members, node neighbors.

use std::fmt;

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
pub struct MemberInfo {
    pub name: String,
    pub address: String,
    pub port: u16,
}

impl fmt::Display for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address.contains(':') {
            write!(f, "{}/[{}]:{}", self.name, self.address, self.port)
        } else {
            write!(f, "{}/{}:{}", self.name, self.address, self.port)
        }
    }
}

#[derive(Deserialize)]
struct MembersResponse {
    members: Vec<MemberInfo>,
}

#[derive(Deserialize)]
struct NeighborsResponse {
    capacity: usize,
    neighbors: Vec<MemberInfo>,
}

pub async fn cmd_members(port: u16) -> Result<()> {
    let resp: MembersResponse = get_json(&format!("{}/members", base_url(port))).await?;

    if resp.members.is_empty() {
        println!("No members registered.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Members ({})", resp.members.len());
    println!("═══════════════════════════════════════");
    for m in &resp.members {
        println!("  {}", m);
    }
    Ok(())
}

pub async fn cmd_neighbors(port: u16) -> Result<()> {
    let resp: NeighborsResponse = get_json(&format!("{}/neighbors", base_url(port))).await?;

    if resp.neighbors.is_empty() {
        println!("No neighbors connected.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Neighbors ({}/{})", resp.neighbors.len(), resp.capacity);
    println!("═══════════════════════════════════════");
    for n in &resp.neighbors {
        println!("  {}", n);
    }
    Ok(())
}
