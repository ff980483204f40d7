//! Registration: the one-shot exchange between a joining node and the directory.

use std::net::{IpAddr, SocketAddr};

use overlay_core::config::ProtocolConfig;
use overlay_core::{DirectoryReply, NodeIdentity, ProtocolError, Request};

use crate::transport::Connection;

/// What the directory told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// We are the first member.
    Founder { local_addr: IpAddr },
    /// Link to `peer` next.
    Introduced { local_addr: IpAddr, peer: NodeIdentity },
}

impl Registration {
    /// The address the directory saw us connect from.
    pub fn local_addr(&self) -> IpAddr {
        match self {
            Registration::Founder { local_addr } | Registration::Introduced { local_addr, .. } => {
                *local_addr
            }
        }
    }
}

/// Startup cannot proceed without a completed registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("directory at {directory} is unreachable: {source}")]
    Unreachable {
        directory: SocketAddr,
        #[source]
        source: ProtocolError,
    },
    #[error("registration with {directory} failed: {source}")]
    Exchange {
        directory: SocketAddr,
        #[source]
        source: ProtocolError,
    },
}

/// Register `name` listening on `port` with the directory at `directory`.
///
/// Not retried: any failure is returned to the caller as fatal.
pub async fn register(
    directory: SocketAddr,
    name: &str,
    port: u16,
    protocol: &ProtocolConfig,
) -> Result<Registration, RegistrationError> {
    let mut conn = Connection::open(directory, protocol)
        .await
        .map_err(|source| RegistrationError::Unreachable { directory, source })?;
    let local_addr = conn.local_addr().ip().to_canonical();

    let request = Request::Register {
        name: name.to_string(),
        port,
    };
    let exchange = async {
        conn.send(&request.to_string()).await?;
        let line = conn.recv().await?;
        Ok::<_, ProtocolError>(DirectoryReply::parse(&line)?)
    };
    let reply = exchange
        .await
        .map_err(|source| RegistrationError::Exchange { directory, source })?;
    conn.close().await;

    Ok(match reply {
        DirectoryReply::Confirm => {
            tracing::info!(%directory, "no existing members, founding a new overlay");
            Registration::Founder { local_addr }
        }
        DirectoryReply::Introduce(peer) => {
            tracing::info!(%directory, peer = %peer, "registered, introduced to existing member");
            Registration::Introduced { local_addr, peer }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// One-connection fake directory that replies with `reply`.
    async fn fake_directory(reply: &'static str) -> (SocketAddr, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (r, mut w) = stream.into_split();
            let mut line = String::new();
            BufReader::new(r).read_line(&mut line).await.unwrap();
            w.write_all(reply.as_bytes()).await.unwrap();
            line
        });
        (addr, task)
    }

    #[tokio::test]
    async fn founder_on_confirm() {
        let (addr, seen) = fake_directory("CONFIRM\n").await;
        let reg = register(addr, "alpha", 10500, &ProtocolConfig::default())
            .await
            .unwrap();
        assert!(matches!(reg, Registration::Founder { .. }));
        assert_eq!(reg.local_addr(), "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(seen.await.unwrap(), "REGISTER:alpha:10500\n");
    }

    #[tokio::test]
    async fn introduced_peer_is_parsed() {
        let (addr, _) = fake_directory("a:127.0.0.1:10001\n").await;
        let reg = register(addr, "b", 10002, &ProtocolConfig::default())
            .await
            .unwrap();
        match reg {
            Registration::Introduced { peer, .. } => {
                assert_eq!(peer.name(), "a");
                assert_eq!(peer.port(), 10001);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_reply_is_an_exchange_error() {
        let (addr, _) = fake_directory("WELCOME\n").await;
        let err = register(addr, "b", 10002, &ProtocolConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Exchange {
                source: ProtocolError::Malformed(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_directory_is_unreachable() {
        let addr = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap()
        };
        let err = register(addr, "b", 10002, &ProtocolConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Unreachable { .. }));
    }
}
