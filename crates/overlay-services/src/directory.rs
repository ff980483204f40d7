//! Directory registry: the bootstrap service's view of overlay membership.
//!
//! Every registration inserts the caller, so the next arrival can be
//! introduced to it. The pick of which member to introduce and the insert
//! happen under one lock: two concurrent registrations always see each other
//! in some order, never neither.

use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use overlay_core::NodeIdentity;

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No other member existed; the caller founds the network.
    Founder,
    /// Link to this existing member.
    Introduce(NodeIdentity),
}

struct Inner {
    entries: Vec<NodeIdentity>,
    rng: StdRng,
}

/// Authoritative set of registered nodes, at most one entry per
/// `(address, port)`.
pub struct DirectoryRegistry {
    inner: Mutex<Inner>,
}

impl Default for DirectoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryRegistry {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Registry with a reproducible introduction order.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                rng,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `identity` and decide whom it should link to.
    ///
    /// A repeated registration from the same `(address, port)` replaces the
    /// earlier entry, and the caller is never introduced to itself.
    pub fn register(&self, identity: NodeIdentity) -> Outcome {
        let mut inner = self.lock();
        let Inner { entries, rng } = &mut *inner;

        let replaced = match entries.iter().position(|e| *e == identity) {
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => false,
        };

        let outcome = match entries.choose(rng) {
            Some(existing) => Outcome::Introduce(existing.clone()),
            None => Outcome::Founder,
        };

        tracing::info!(
            node = %identity,
            replaced,
            members = entries.len() + 1,
            founder = matches!(outcome, Outcome::Founder),
            "node registered"
        );
        entries.push(identity);
        outcome
    }

    /// Remove every entry at `(address, port)`. Returns how many were removed;
    /// zero is not an error.
    pub fn deregister(&self, address: IpAddr, port: u16) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|e| !e.matches(address, port));
        let removed = before - inner.entries.len();
        if removed > 0 {
            tracing::info!(%address, port, members = inner.entries.len(), "node deregistered");
        } else {
            tracing::debug!(%address, port, "deregister for unknown node");
        }
        removed
    }

    /// Point-in-time copy of the membership, in registration order.
    pub fn snapshot(&self) -> Vec<NodeIdentity> {
        self.lock().entries.clone()
    }

    pub fn contains(&self, address: IpAddr, port: u16) -> bool {
        self.lock().entries.iter().any(|e| e.matches(address, port))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
