//! Joining: founding, linking, redirects.

use overlay_services::JoinOutcome;

use crate::*;

#[tokio::test]
async fn first_node_founds_the_overlay() {
    let overlay = Overlay::start().await;
    let a = overlay.join("a").await;

    assert!(matches!(a.joined(), JoinOutcome::Founder));
    assert!(a.node().neighbors().is_empty());
    assert_eq!(overlay.registry().len(), 1);

    let id = a.node().identity();
    assert_eq!(id.address(), LO);
    assert!(overlay.registry().contains(LO, id.port()));
}

#[tokio::test]
async fn second_node_links_to_the_first() {
    let overlay = Overlay::start().await;
    let a = overlay.join("a").await;
    let b = overlay.join("b").await;

    let a_id = a.node().identity().clone();
    let b_id = b.node().identity().clone();
    match b.joined() {
        JoinOutcome::Linked(peer) => assert_eq!(peer, &a_id),
        other => panic!("expected link to a, got {other:?}"),
    }

    assert_eq!(b.node().neighbors(), vec![a_id]);
    assert_eq!(a.node().neighbors(), vec![b_id]);
    assert_eq!(overlay.registry().len(), 2);
}

#[tokio::test]
async fn full_node_redirects_to_its_first_neighbor() {
    // X, Y and Z live in a separate overlay so the main directory only knows D.
    let side = Overlay::start().await;
    let x = side.join("x").await;
    let y = side.join("y").await;
    let z = side.join("z").await;

    let overlay = Overlay::start().await;
    let d = overlay.join("d").await;
    for peer in [&x, &y, &z] {
        assert!(d.node().table().try_insert(peer.node().identity().clone()));
    }
    let before = d.node().neighbors();

    let e = overlay.join("e").await;
    let x_id = x.node().identity().clone();
    let e_id = e.node().identity().clone();
    match e.joined() {
        JoinOutcome::Linked(peer) => assert_eq!(peer, &x_id),
        other => panic!("expected redirect to x, got {other:?}"),
    }

    assert_eq!(d.node().neighbors(), before);
    assert!(!holds(d.node(), &e_id));
    assert!(holds(x.node(), &e_id));
    assert!(holds(e.node(), &x_id));
}

#[tokio::test]
async fn isolated_node_still_registers_and_listens() {
    // Single-slot nodes that can only redirect back to each other.
    let overlay = Overlay::start().await;
    let a = overlay.join_with(NodeOptions {
        max_neighbors: 1,
        ..overlay.options("a")
    })
    .await;
    let b = overlay.join_with(NodeOptions {
        max_neighbors: 1,
        ..overlay.options("b")
    })
    .await;
    assert!(matches!(b.joined(), JoinOutcome::Linked(_)));
    assert!(a.node().table().is_full());

    let c = overlay.join_with(NodeOptions {
        max_neighbors: 1,
        ..overlay.options("c")
    })
    .await;
    assert!(matches!(c.joined(), JoinOutcome::Isolated(_)));
    assert!(c.node().neighbors().is_empty());
    assert!(overlay.registry().contains(LO, c.node().identity().port()));
    assert_eq!(a.node().table().len(), 1);
    assert_eq!(b.node().table().len(), 1);
}
