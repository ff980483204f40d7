//! Departure: the directory and every neighbor forget the leaving node.

use std::time::Duration;

use crate::*;

#[tokio::test]
async fn departing_node_is_forgotten_everywhere() {
    let overlay = Overlay::start().await;
    let f = overlay.join("f").await;
    let g = overlay.join("g").await;
    let h = overlay.join("h").await;

    let f_id = f.node().identity().clone();
    // H was introduced to a random member; make sure it is linked to F.
    if !holds(h.node(), &f_id) {
        h.node().link(f_id.clone()).await.expect("f has room for h");
    }
    assert!(holds(g.node(), &f_id));
    assert!(holds(h.node(), &f_id));

    let report = f.node().depart().await;
    assert!(report.directory_notified);
    assert_eq!(report.neighbors_failed, 0);
    assert_eq!(report.neighbors_notified, f.node().neighbors().len());

    let gone = wait_until(Duration::from_secs(2), || {
        !overlay.registry().contains(LO, f_id.port())
            && !holds(g.node(), &f_id)
            && !holds(h.node(), &f_id)
    })
    .await;
    assert!(gone, "f should be removed from the directory and both neighbors");
    assert_eq!(overlay.registry().len(), 2);
}

#[tokio::test]
async fn unreachable_neighbor_does_not_block_departure() {
    let overlay = Overlay::start().await;
    let f = overlay.join("f").await;
    let g = overlay.join("g").await;

    let dead = dead_addr().await;
    f.node()
        .table()
        .try_insert(NodeIdentity::new("gone", LO, dead.port()));

    let report = f.node().depart().await;
    assert!(report.directory_notified);
    assert_eq!(report.neighbors_notified, 1);
    assert_eq!(report.neighbors_failed, 1);

    let f_id = f.node().identity().clone();
    let g_node = g.node().clone();
    assert!(wait_until(Duration::from_secs(2), || !holds(&g_node, &f_id)).await);
}
