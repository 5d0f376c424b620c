//! Per-session I/O task.
//!
//! Each interval the task reads whatever arrived (waiting briefly), applies
//! every complete frame in arrival order, then writes out the session's
//! outbound queue. It exits once the session is marked dead, after one last
//! best-effort flush so kick and shutdown reasons reach the client.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{MissedTickBehavior, timeout};

use super::handler;
use crate::protocol::Outbound;
use crate::protocol::inbound::next_frame;
use crate::server::Server;
use crate::session::Session;

/// Pace of the receive → apply → send cycle.
pub const SESSION_INTERVAL: Duration = Duration::from_millis(20);
/// Longest a session waits for inbound bytes per interval.
pub const READ_WAIT: Duration = Duration::from_millis(5);
/// A write that takes longer than this kills the session.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 4096;

/// Serve one admitted session until it is marked dead.
pub async fn run(server: Arc<Server>, session: Arc<Session>, stream: TcpStream) {
    let (mut reader, mut writer) = stream.into_split();
    let mut inbound = BytesMut::with_capacity(READ_CHUNK);
    let mut interval = tokio::time::interval(SESSION_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while session.is_alive() {
        interval.tick().await;

        if let Err(e) = receive(&mut reader, &mut inbound).await {
            tracing::debug!("Receive from {} failed: {}", session.peer(), e);
            session.mark_dead();
        }

        while session.is_alive() {
            let Some(packet) = next_frame(&mut inbound) else {
                break;
            };
            handler::handle(&server, &session, packet).await;
        }

        if let Err(e) = flush(&session, &mut writer).await {
            tracing::debug!("Send to {} failed: {}", session.peer(), e);
            session.mark_dead();
        }
    }

    if let Err(e) = flush(&session, &mut writer).await {
        tracing::debug!("Final flush to {} failed: {}", session.peer(), e);
    }
    let _ = writer.shutdown().await;
    tracing::debug!("Session task for {} finished", session.id());
}

/// Read whatever is available within [`READ_WAIT`]. Nothing arriving is not
/// an error; end-of-stream is.
async fn receive(reader: &mut OwnedReadHalf, buf: &mut BytesMut) -> io::Result<()> {
    buf.reserve(READ_CHUNK);
    match timeout(READ_WAIT, reader.read_buf(buf)).await {
        Err(_) => Ok(()),
        Ok(Ok(0)) => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "peer closed the connection",
        )),
        Ok(Ok(n)) => {
            tracing::trace!("read {} bytes", n);
            Ok(())
        }
        Ok(Err(e)) => Err(e),
    }
}

/// Encode and write the session's outbound queue in order.
async fn flush(session: &Session, writer: &mut OwnedWriteHalf) -> io::Result<()> {
    let packets = session.drain_outbound();
    if packets.is_empty() {
        return Ok(());
    }
    let mut out = BytesMut::new();
    for packet in &packets {
        packet.encode(&mut out);
    }
    write_bounded(writer, &out).await
}

async fn write_bounded<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    match timeout(WRITE_TIMEOUT, writer.write_all(bytes)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
    }
}

/// Turn away a connection that could not be registered.
pub async fn reject(mut stream: TcpStream, reason: &'static str) {
    let packet = Outbound::Disconnect {
        reason: reason.to_owned(),
    };
    if let Err(e) = write_bounded(&mut stream, &packet.to_bytes()).await {
        tracing::debug!("Could not send rejection: {}", e);
    }
    let _ = stream.shutdown().await;
}
