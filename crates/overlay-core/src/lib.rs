//! overlay-core: node identity, line-protocol wire format, and configuration.
//! All other overlay crates depend on this one.

pub mod config;
pub mod error;
pub mod identity;
pub mod wire;

pub use error::ProtocolError;
pub use identity::NodeIdentity;
pub use wire::{DirectoryReply, LinkReply, Request, WireError};
