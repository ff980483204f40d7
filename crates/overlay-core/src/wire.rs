//! Overlay wire format: one text line per message, colon-delimited fields.
//!
//! | Line                              | Sender          | Reply                                   |
//! |-----------------------------------|-----------------|-----------------------------------------|
//! | `REGISTER:<name>:<port>`          | node → directory| `CONFIRM` or `<name>:<address>:<port>`  |
//! | `DISCONNECT:<name>:<port>`        | node → any      | none                                    |
//! | `REQUEST_CONNECT:<name>:<port>`   | node → node     | `ACCEPT` or `REDIRECT:<name>:<address>:<port>` |
//!
//! Requests never carry the sender's address; the receiver takes it from the
//! transport connection. Lines are written without the trailing newline by
//! the `Display` impls here; the transport adds it.
//!
//! Replies may carry IPv6 addresses, which contain colons. An identity field
//! group is therefore split as: name = up to the first colon, port = after
//! the last colon, address = everything in between.

use std::fmt;
use std::net::IpAddr;

use crate::identity::{is_valid_name, NodeIdentity};

pub const VERB_REGISTER: &str = "REGISTER";
pub const VERB_DISCONNECT: &str = "DISCONNECT";
pub const VERB_REQUEST_CONNECT: &str = "REQUEST_CONNECT";
pub const REPLY_CONFIRM: &str = "CONFIRM";
pub const REPLY_ACCEPT: &str = "ACCEPT";
pub const REPLY_REDIRECT: &str = "REDIRECT";

/// Longest line either side will read. Anything longer is malformed.
pub const MAX_LINE_LEN: usize = 1024;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("empty message")]
    Empty,
    #[error("unknown message kind {0:?}")]
    UnknownVerb(String),
    #[error("missing {0} field")]
    MissingField(&'static str),
    #[error("invalid port {0:?}")]
    BadPort(String),
    #[error("invalid address {0:?}")]
    BadAddress(String),
    #[error("invalid node name {0:?}")]
    BadName(String),
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// A request line. `name`/`port` always describe the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Register { name: String, port: u16 },
    Disconnect { name: String, port: u16 },
    RequestConnect { name: String, port: u16 },
}

impl Request {
    pub fn parse(line: &str) -> Result<Self, WireError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(WireError::Empty);
        }
        let (verb, rest) = line
            .split_once(':')
            .ok_or_else(|| WireError::UnknownVerb(line.to_string()))?;

        let build: fn(String, u16) -> Request = match verb {
            VERB_REGISTER => |name, port| Request::Register { name, port },
            VERB_DISCONNECT => |name, port| Request::Disconnect { name, port },
            VERB_REQUEST_CONNECT => |name, port| Request::RequestConnect { name, port },
            other => return Err(WireError::UnknownVerb(other.to_string())),
        };

        let (name, port) = rest
            .rsplit_once(':')
            .ok_or(WireError::MissingField("port"))?;
        let name = parse_name(name)?;
        let port = parse_port(port)?;
        Ok(build(name, port))
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Request::Register { .. } => VERB_REGISTER,
            Request::Disconnect { .. } => VERB_DISCONNECT,
            Request::RequestConnect { .. } => VERB_REQUEST_CONNECT,
        }
    }

    /// Sender's display name.
    pub fn name(&self) -> &str {
        match self {
            Request::Register { name, .. }
            | Request::Disconnect { name, .. }
            | Request::RequestConnect { name, .. } => name,
        }
    }

    /// Sender's listening port.
    pub fn port(&self) -> u16 {
        match self {
            Request::Register { port, .. }
            | Request::Disconnect { port, .. }
            | Request::RequestConnect { port, .. } => *port,
        }
    }

    /// Combine the advertised name/port with the transport source address.
    pub fn sender(&self, source: IpAddr) -> NodeIdentity {
        NodeIdentity::new(self.name(), source, self.port())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.verb(), self.name(), self.port())
    }
}

// ── Replies ───────────────────────────────────────────────────────────────────

/// Directory's answer to `REGISTER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryReply {
    /// The registry was empty: the sender founds the network.
    Confirm,
    /// An existing member the sender should link to.
    Introduce(NodeIdentity),
}

impl DirectoryReply {
    pub fn parse(line: &str) -> Result<Self, WireError> {
        let line = line.trim_end_matches(['\r', '\n']);
        match line {
            "" => Err(WireError::Empty),
            REPLY_CONFIRM => Ok(DirectoryReply::Confirm),
            other => parse_identity(other).map(DirectoryReply::Introduce),
        }
    }
}

impl fmt::Display for DirectoryReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryReply::Confirm => f.write_str(REPLY_CONFIRM),
            DirectoryReply::Introduce(peer) => write_identity(f, peer),
        }
    }
}

/// A node's answer to `REQUEST_CONNECT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkReply {
    Accept,
    /// The responder is full; try this neighbor of theirs instead.
    Redirect(NodeIdentity),
}

impl LinkReply {
    pub fn parse(line: &str) -> Result<Self, WireError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(WireError::Empty);
        }
        if line == REPLY_ACCEPT {
            return Ok(LinkReply::Accept);
        }
        match line.split_once(':') {
            Some((REPLY_REDIRECT, rest)) => parse_identity(rest).map(LinkReply::Redirect),
            Some((verb, _)) => Err(WireError::UnknownVerb(verb.to_string())),
            None => Err(WireError::UnknownVerb(line.to_string())),
        }
    }
}

impl fmt::Display for LinkReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkReply::Accept => f.write_str(REPLY_ACCEPT),
            LinkReply::Redirect(peer) => {
                write!(f, "{}:", REPLY_REDIRECT)?;
                write_identity(f, peer)
            }
        }
    }
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn write_identity(f: &mut fmt::Formatter<'_>, id: &NodeIdentity) -> fmt::Result {
    write!(f, "{}:{}:{}", id.name(), id.address(), id.port())
}

/// `<name>:<address>:<port>`, where the address may itself contain colons.
fn parse_identity(fields: &str) -> Result<NodeIdentity, WireError> {
    let (name, rest) = fields
        .split_once(':')
        .ok_or(WireError::MissingField("address"))?;
    let (address, port) = rest
        .rsplit_once(':')
        .ok_or(WireError::MissingField("port"))?;

    let name = parse_name(name)?;
    let address: IpAddr = address
        .parse()
        .map_err(|_| WireError::BadAddress(address.to_string()))?;
    let port = parse_port(port)?;
    Ok(NodeIdentity::new(name, address, port))
}

fn parse_name(name: &str) -> Result<String, WireError> {
    if is_valid_name(name) {
        Ok(name.to_string())
    } else if name.is_empty() {
        Err(WireError::MissingField("name"))
    } else {
        Err(WireError::BadName(name.to_string()))
    }
}

fn parse_port(port: &str) -> Result<u16, WireError> {
    match port.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(WireError::BadPort(port.to_string())),
        Ok(p) => Ok(p),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
