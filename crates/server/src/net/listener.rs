use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};

use super::{connection, handler};
use crate::server::Server;

/// Bind `bind_addr` and accept clients until the server stops.
pub async fn run(server: Arc<Server>, bind_addr: &str) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    serve(server, listener).await;
    Ok(())
}

/// Accept loop over an already-bound listener. Returns once a stop has been
/// requested.
pub async fn serve(server: Arc<Server>, listener: TcpListener) {
    let mut shutdown = server.shutdown_signal();
    loop {
        if *shutdown.borrow_and_update() {
            break;
        }
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => admit(&server, stream, addr),
                // Per-connection failures (resets, fd exhaustion) must not
                // take the listener down.
                Err(e) => tracing::warn!("Accept failed: {}", e),
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    tracing::info!("Listener stopped");
}

fn admit(server: &Arc<Server>, stream: TcpStream, addr: SocketAddr) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("set_nodelay failed for {}: {}", addr, e);
    }
    let Some(session) = server.registry().admit(addr) else {
        tracing::warn!("Rejecting {}: server full", addr);
        tokio::spawn(connection::reject(stream, handler::SERVER_FULL));
        return;
    };
    tracing::info!("Connection from {} as {}", addr, session.id());
    let task = tokio::spawn(connection::run(
        Arc::clone(server),
        Arc::clone(&session),
        stream,
    ));
    server.registry().attach_task(session.id(), task);
}
