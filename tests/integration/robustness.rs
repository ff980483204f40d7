//! Bad input and unreachable peers.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use overlay_core::wire::MAX_LINE_LEN;
use overlay_services::{JoinOutcome, LinkError, RegistrationError, StartupError};

use crate::*;

/// Send raw bytes, then return whatever single line comes back (if any).
async fn exchange(addr: SocketAddr, bytes: &[u8]) -> Option<String> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(bytes).await.unwrap();
    let mut line = String::new();
    let read = tokio::time::timeout(
        Duration::from_secs(3),
        BufReader::new(stream).read_line(&mut line),
    )
    .await;
    match read {
        Ok(Ok(n)) if n > 0 => Some(line),
        _ => None,
    }
}

#[tokio::test]
async fn malformed_lines_do_not_disturb_the_directory() {
    let overlay = Overlay::start().await;
    let addr = overlay.directory.local_addr();

    assert_eq!(exchange(addr, b"HELLO\n").await, None);
    assert_eq!(exchange(addr, b"REGISTER:nameonly\n").await, None);
    assert_eq!(exchange(addr, b"REGISTER:a:notaport\n").await, None);
    let oversized = vec![b'x'; MAX_LINE_LEN * 2];
    assert_eq!(exchange(addr, &oversized).await, None);
    assert!(overlay.registry().is_empty());

    // The directory still serves well-formed requests.
    assert_eq!(
        exchange(addr, b"REGISTER:a:10001\n").await.as_deref(),
        Some("CONFIRM\n")
    );
    assert_eq!(overlay.registry().len(), 1);
}

#[tokio::test]
async fn malformed_connect_request_leaves_node_table_alone() {
    let overlay = Overlay::start().await;
    let a = overlay.join("a").await;
    let addr = a.node().identity().socket_addr();

    assert_eq!(exchange(addr, b"REQUEST_CONNECT:b\n").await, None);
    assert_eq!(exchange(addr, b"REQUEST_CONNECT:b:0\n").await, None);
    assert!(a.node().neighbors().is_empty());

    assert_eq!(
        exchange(addr, b"REQUEST_CONNECT:b:10002\n").await.as_deref(),
        Some("ACCEPT\n")
    );
    assert_eq!(a.node().table().len(), 1);
}

#[tokio::test]
async fn unreachable_directory_is_a_startup_error() {
    let protocol = fast_protocol();
    let (shutdown, _) = tokio::sync::broadcast::channel(1);
    let options = NodeOptions {
        name: "lonely".into(),
        directory: dead_addr().await,
        bind: LO,
        port: Some(0),
        max_neighbors: 3,
        protocol,
    };

    let result = Node::start(options, shutdown.subscribe()).await;
    assert!(matches!(
        result,
        Err(StartupError::Registration(RegistrationError::Unreachable { .. }))
    ));
}

#[tokio::test]
async fn introduced_peer_that_died_leaves_node_isolated() {
    let overlay = Overlay::start().await;
    // A member that registered and vanished without departing.
    let dead = dead_addr().await;
    overlay
        .registry()
        .register(NodeIdentity::new("ghost", LO, dead.port()));

    let b = overlay.join("b").await;
    match b.joined() {
        JoinOutcome::Isolated(LinkError::Unreachable { attempts, .. }) => {
            assert_eq!(*attempts, 1)
        }
        other => panic!("expected isolation, got {other:?}"),
    }
    assert!(overlay.registry().contains(LO, b.node().identity().port()));
}

#[tokio::test]
async fn redirect_walk_is_bounded() {
    let overlay = Overlay::with_protocol(ProtocolConfig {
        max_redirect_hops: 1,
        ..fast_protocol()
    })
    .await;

    // Three full single-slot nodes in a chain that never accepts.
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
    assert!(a.node().table().is_full() && b.node().table().is_full());

    let c = overlay.join_with(NodeOptions {
        max_neighbors: 1,
        ..overlay.options("c")
    })
    .await;
    match c.joined() {
        JoinOutcome::Isolated(LinkError::Unreachable { attempts, .. }) => {
            assert!(*attempts <= 2, "took {attempts} attempts")
        }
        other => panic!("expected bounded failure, got {other:?}"),
    }
}
