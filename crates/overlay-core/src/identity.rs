//! Node identity: who a node is, as far as the overlay is concerned.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// (name, address, port) triple identifying an overlay node.
///
/// Equality and hashing only consider `(address, port)`. The display name is
/// informational: two identities with different names but the same endpoint
/// are the same node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeIdentity {
    name: String,
    address: IpAddr,
    port: u16,
}

impl NodeIdentity {
    /// Build an identity. IPv4-mapped IPv6 addresses are stored as IPv4 so
    /// that a node reached over a dual-stack socket compares equal to the
    /// same node reached over IPv4.
    pub fn new(name: impl Into<String>, address: IpAddr, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.to_canonical(),
            port,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The listening endpoint of this node.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Does this identity live at `(address, port)`?
    pub fn matches(&self, address: IpAddr, port: u16) -> bool {
        self.address == address.to_canonical() && self.port == port
    }
}

impl PartialEq for NodeIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.port == other.port
    }
}

impl Eq for NodeIdentity {}

impl Hash for NodeIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.socket_addr())
    }
}

/// Check that a display name can travel inside a colon-delimited line.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(':') && !name.contains(['\n', '\r'])
}
