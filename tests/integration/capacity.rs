//! Degree cap under concurrent joins.

use futures::future::join_all;

use overlay_services::JoinOutcome;

use crate::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_never_exceed_the_cap() {
    let overlay = Overlay::start().await;
    let founder = overlay.join("n0").await;

    let names: Vec<String> = (1..=12).map(|i| format!("n{i}")).collect();
    let joined = join_all(names.iter().map(|n| overlay.join(n))).await;

    let mut everyone = vec![founder];
    everyone.extend(joined);

    for running in &everyone {
        let node = running.node();
        assert!(
            node.table().len() <= 3,
            "{} has {} neighbors",
            node.identity(),
            node.table().len()
        );
    }

    // Every reported link is held on both ends.
    for running in &everyone {
        if let JoinOutcome::Linked(peer) = running.joined() {
            let acceptor = everyone
                .iter()
                .find(|r| r.node().identity() == peer)
                .expect("acceptor is one of ours");
            assert!(holds(acceptor.node(), running.node().identity()));
            assert!(holds(running.node(), peer));
        }
    }
    assert_eq!(overlay.registry().len(), 13);
}

#[tokio::test]
async fn sequential_joins_fill_then_redirect() {
    let overlay = Overlay::start().await;
    let mut nodes = Vec::new();
    for i in 0..8 {
        nodes.push(overlay.join(&format!("s{i}")).await);
    }

    let linked = nodes
        .iter()
        .filter(|n| matches!(n.joined(), JoinOutcome::Linked(_)))
        .count();
    assert!(linked >= 1);
    for n in &nodes {
        assert!(n.node().table().len() <= 3);
    }
}
