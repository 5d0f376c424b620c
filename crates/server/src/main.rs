use std::sync::Arc;

use anyhow::{Context, Result};

use classic_server::config::ServerConfig;
use classic_server::net;
use classic_server::persistence;
use classic_server::server::{Collaborators, Server};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = ServerConfig::from_args(&args).context("reading configuration")?;
    tracing::info!("{} -- classic protocol server", config.name);

    let collab = Collaborators::from_config(&config)?;
    let server = Server::open(config.clone(), collab)?;

    // ── Periodic autosave ────────────────────────────────────────────────
    let autosave = persistence::spawn_autosave(
        Arc::clone(&server),
        config.world_file.clone(),
        config.autosave_interval(),
    );

    // ── Listener ─────────────────────────────────────────────────────────
    let listen_server = Arc::clone(&server);
    let bind_addr = config.bind.clone();
    let listener = tokio::spawn(async move {
        if let Err(e) = net::listener::run(Arc::clone(&listen_server), &bind_addr).await {
            tracing::error!("Listener error: {:#}", e);
            listen_server.request_stop("&cServer error");
        }
    });

    // ── Tick loop with graceful shutdown ─────────────────────────────────
    let run = server.run();
    tokio::pin!(run);
    tokio::select! {
        _ = &mut run => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down...");
            server.request_stop("&cServer is shutting down");
            run.await;
        }
    }

    if let Err(e) = listener.await {
        tracing::warn!("Listener task failed: {}", e);
    }
    if let Err(e) = autosave.await {
        tracing::warn!("Autosave task failed: {}", e);
    }

    // ── Save on shutdown ─────────────────────────────────────────────────
    tracing::info!("Saving world before exit...");
    let snapshot = server.world_snapshot();
    persistence::save_grid(&snapshot, &config.world_file)
        .with_context(|| format!("saving {}", config.world_file.display()))?;
    Ok(())
}
