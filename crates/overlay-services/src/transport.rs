//! Line transport: one request per TCP connection.
//!
//! Open, write one line, optionally read one line back, close. Every read
//! is bounded by the configured read timeout and by `MAX_LINE_LEN`.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use overlay_core::config::ProtocolConfig;
use overlay_core::wire::MAX_LINE_LEN;
use overlay_core::ProtocolError;

/// Read one newline-terminated line, without the terminator.
///
/// A final line cut short by EOF is accepted as long as it is non-empty.
pub async fn read_line<R>(reader: &mut R, timeout: Duration) -> Result<String, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(64);
    let read = async {
        let mut limited = reader.take(MAX_LINE_LEN as u64 + 1);
        limited.read_until(b'\n', &mut buf).await
    };
    let n = tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| ProtocolError::ReadTimeout(timeout))??;

    if n == 0 {
        return Err(ProtocolError::Closed);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if n > MAX_LINE_LEN {
        return Err(ProtocolError::LineTooLong);
    }
    if buf.len() > MAX_LINE_LEN {
        return Err(ProtocolError::LineTooLong);
    }

    String::from_utf8(buf).map_err(|e| {
        ProtocolError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

/// Write `line` plus the terminator and flush.
pub async fn write_line<W>(writer: &mut W, line: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut out = Vec::with_capacity(line.len() + 1);
    out.extend_from_slice(line.as_bytes());
    out.push(b'\n');
    writer.write_all(&out).await?;
    writer.flush().await?;
    Ok(())
}

/// An outbound single-exchange connection.
pub struct Connection {
    peer: SocketAddr,
    local: SocketAddr,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    read_timeout: Duration,
}

impl Connection {
    pub async fn open(addr: SocketAddr, protocol: &ProtocolConfig) -> Result<Self, ProtocolError> {
        let after = protocol.connect_timeout();
        let stream = tokio::time::timeout(after, TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::ConnectTimeout { addr, after })?
            .map_err(|source| ProtocolError::Connect { addr, source })?;
        let local = stream.local_addr()?;
        let (read_half, writer) = stream.into_split();

        Ok(Self {
            peer: addr,
            local,
            reader: BufReader::new(read_half),
            writer,
            read_timeout: protocol.read_timeout(),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Our end of the connection, i.e. the address the peer sees us at.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub async fn send(&mut self, line: &str) -> Result<(), ProtocolError> {
        write_line(&mut self.writer, line).await
    }

    pub async fn recv(&mut self) -> Result<String, ProtocolError> {
        read_line(&mut self.reader, self.read_timeout).await
    }

    /// Half-close and drop. Errors are irrelevant once the exchange is done.
    pub async fn close(mut self) {
        let _ = self.writer.shutdown().await;
    }
}

/// Send a line that expects no reply.
pub async fn notify(
    addr: SocketAddr,
    line: &str,
    protocol: &ProtocolConfig,
) -> Result<(), ProtocolError> {
    let mut conn = Connection::open(addr, protocol).await?;
    conn.send(line).await?;
    conn.close().await;
    Ok(())
}
