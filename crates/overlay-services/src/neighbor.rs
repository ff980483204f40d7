//! Neighbor table: a node's bounded set of direct links.
//!
//! Admission is check-and-insert under a single lock, so concurrent
//! connect-requests can never push the table past its capacity.

use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use overlay_core::NodeIdentity;

/// How the table answered a connect-request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Requester inserted.
    Accepted,
    /// Requester was already a neighbor; nothing changed.
    AlreadyLinked,
    /// Table full; requester should try this neighbor instead.
    Redirect(NodeIdentity),
}

impl Admission {
    pub fn is_accept(&self) -> bool {
        matches!(self, Admission::Accepted | Admission::AlreadyLinked)
    }
}

pub struct NeighborTable {
    capacity: usize,
    entries: Mutex<Vec<NodeIdentity>>,
}

impl NeighborTable {
    /// `capacity` is clamped to at least one so a full table always has a
    /// redirect candidate.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<NodeIdentity>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acceptor side of link negotiation.
    ///
    /// When full, the redirect names the first neighbor in table order
    /// (oldest link first), which keeps the choice deterministic.
    pub fn admit(&self, requester: NodeIdentity) -> Admission {
        let mut entries = self.lock();
        if entries.contains(&requester) {
            return Admission::AlreadyLinked;
        }
        if entries.len() < self.capacity {
            entries.push(requester);
            return Admission::Accepted;
        }
        // capacity >= 1 and the table is full, so index 0 exists
        Admission::Redirect(entries[0].clone())
    }

    /// Initiator side: record an accepted link if there is still room.
    /// Returns false only when the table is full and `peer` is not in it.
    pub fn try_insert(&self, peer: NodeIdentity) -> bool {
        let mut entries = self.lock();
        if entries.contains(&peer) {
            return true;
        }
        if entries.len() >= self.capacity {
            return false;
        }
        entries.push(peer);
        true
    }

    /// Drop the neighbor at `(address, port)`. Returns whether one was removed.
    pub fn remove(&self, address: IpAddr, port: u16) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|e| !e.matches(address, port));
        entries.len() != before
    }

    pub fn contains(&self, address: IpAddr, port: u16) -> bool {
        self.lock().iter().any(|e| e.matches(address, port))
    }

    pub fn snapshot(&self) -> Vec<NodeIdentity> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    const LO: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn node(name: &str, port: u16) -> NodeIdentity {
        NodeIdentity::new(name, LO, port)
    }

    #[test]
    fn admits_until_full_then_redirects_to_first() {
        let table = NeighborTable::new(3);
        assert_eq!(table.admit(node("p1", 10001)), Admission::Accepted);
        assert_eq!(table.admit(node("p2", 10002)), Admission::Accepted);
        assert_eq!(table.admit(node("p3", 10003)), Admission::Accepted);
        assert!(table.is_full());

        assert_eq!(
            table.admit(node("e", 10010)),
            Admission::Redirect(node("p1", 10001))
        );
        assert_eq!(
            table.snapshot(),
            vec![node("p1", 10001), node("p2", 10002), node("p3", 10003)]
        );
    }

    #[test]
    fn redirect_names_a_current_neighbor() {
        let table = NeighborTable::new(2);
        table.admit(node("a", 10001));
        table.admit(node("b", 10002));
        table.remove(LO, 10001);
        table.admit(node("c", 10003));

        match table.admit(node("x", 10099)) {
            Admission::Redirect(target) => assert!(table.snapshot().contains(&target)),
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn repeated_request_is_idempotent() {
        let table = NeighborTable::new(1);
        assert_eq!(table.admit(node("a", 10001)), Admission::Accepted);
        assert_eq!(table.admit(node("a", 10001)), Admission::AlreadyLinked);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn try_insert_respects_capacity() {
        let table = NeighborTable::new(1);
        assert!(table.try_insert(node("a", 10001)));
        assert!(table.try_insert(node("a", 10001)));
        assert!(!table.try_insert(node("b", 10002)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_by_endpoint() {
        let table = NeighborTable::new(3);
        table.admit(node("g", 10001));
        table.admit(node("h", 10002));
        assert!(table.remove(LO, 10001));
        assert!(!table.remove(LO, 10001));
        assert!(!table.contains(LO, 10001));
        assert!(table.contains(LO, 10002));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let table = NeighborTable::new(0);
        assert_eq!(table.capacity(), 1);
        assert_eq!(table.admit(node("a", 10001)), Admission::Accepted);
    }

    #[test]
    fn concurrent_admission_never_exceeds_capacity() {
        let table = Arc::new(NeighborTable::new(3));
        let handles: Vec<_> = (0..32u16)
            .map(|i| {
                let table = table.clone();
                std::thread::spawn(move || table.admit(node("r", 13000 + i)))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let accepted = results.iter().filter(|a| a.is_accept()).count();
        assert_eq!(accepted, 3);
        assert_eq!(table.len(), 3);

        let members = table.snapshot();
        for result in results {
            if let Admission::Redirect(target) = result {
                assert!(members.contains(&target));
            }
        }
    }
}
