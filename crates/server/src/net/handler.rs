//! Applying decoded client packets to session, world, and server state.

use std::sync::Arc;

use classic_engine::world::block::BlockId;
use classic_engine::world::position::BlockPos;

use crate::level;
use crate::player_registry::ClaimError;
use crate::protocol::{
    CONSOLE_ID, Inbound, Orientation, Outbound, PROTOCOL_VERSION, Position, SELF_ID,
    USER_TYPE_NORMAL, USER_TYPE_OP,
};
use crate::server::Server;
use crate::session::{Phase, Player, Session};

pub const NOT_VERIFIED: &str = "&dYou are not verified!";
pub const INVALID_USERNAME: &str = "&4Invalid username!";
pub const BANNED: &str = "&4You are banned!";
pub const DUPLICATE_LOGIN: &str = "&4You have joined in another session!";
pub const SERVER_FULL: &str = "&cServer is full!";
const LEVEL_FAILED: &str = "&cCould not send the level";

/// Apply one packet. Identification is only honoured while connecting;
/// everything else only once the session is active.
pub async fn handle(server: &Arc<Server>, session: &Arc<Session>, packet: Inbound) {
    let phase = session.phase();
    match packet {
        Inbound::Identification {
            protocol_version,
            username,
            verify_key,
            ..
        } if phase == Phase::Connecting => {
            if protocol_version != PROTOCOL_VERSION {
                tracing::debug!(
                    "{} speaks protocol {}, expected {}",
                    session.peer(),
                    protocol_version,
                    PROTOCOL_VERSION
                );
            }
            identify(server, session, username, &verify_key).await;
        }
        packet if phase != Phase::Active => {
            tracing::debug!("Ignoring {:?} from {} in {:?}", packet.kind(), session.peer(), phase);
        }
        Inbound::Message { text, .. } => chat(server, session, &text),
        Inbound::PositionOrientation {
            position,
            orientation,
            ..
        } => movement(server, session, position, orientation),
        Inbound::SetBlock {
            x,
            y,
            z,
            mode,
            block,
        } => {
            let pos = BlockPos::new(x as i32, y as i32, z as i32);
            let result = server.with_world(|w| w.player_edit(pos, mode, BlockId(block)));
            if result.is_none() {
                tracing::debug!("{} edited outside the world at {:?}", session.id(), pos);
            }
        }
        Inbound::Identification { .. } => {
            tracing::debug!("Duplicate identification from {}", session.peer());
        }
    }
}

/// Run the login checks and, if they pass, the join sequence.
async fn identify(server: &Arc<Server>, session: &Arc<Session>, username: String, key: &str) {
    session.set_phase(Phase::Identified);
    let config = server.config();

    if !config.verify_key.is_empty() && key != config.verify_key {
        session.kick(NOT_VERIFIED);
        return;
    }
    if username.is_empty() {
        session.kick(INVALID_USERNAME);
        return;
    }
    if server.bans().is_banned(&username) {
        session.kick(BANNED);
        return;
    }

    let operator = server.ops().is_operator(&username);
    let mut player = Player::new(username, operator);
    player.position = server.with_world(|w| w.spawn_position());

    match server.registry().claim_name(session.id(), player.clone()) {
        Ok(()) => {}
        Err(ClaimError::Duplicate) => {
            session.kick(DUPLICATE_LOGIN);
            return;
        }
        Err(ClaimError::Gone) => {
            session.mark_dead();
            return;
        }
    }

    let compressed = {
        let server = Arc::clone(server);
        tokio::task::spawn_blocking(move || server.compressed_level()).await
    };
    let data = match compressed {
        Ok(Ok(data)) => data,
        Ok(Err(e)) => {
            tracing::error!("Compressing level for {} failed: {}", player.name, e);
            session.kick(LEVEL_FAILED);
            return;
        }
        Err(e) => {
            tracing::error!("Level compression task failed: {}", e);
            session.kick(LEVEL_FAILED);
            return;
        }
    };

    let dims = server.with_world(|w| w.dimensions());
    let id = session.id();

    session.send(Outbound::ServerIdentification {
        protocol_version: PROTOCOL_VERSION,
        name: config.name.clone(),
        motd: config.motd.clone(),
        user_type: if operator { USER_TYPE_OP } else { USER_TYPE_NORMAL },
    });
    session.send(Outbound::LevelInitialize);
    session.send_all(level::chunk_packets(&data));
    session.send_all([
        Outbound::LevelFinalize {
            size_x: dims.x as i16,
            size_y: dims.y as i16,
            size_z: dims.z as i16,
        },
        Outbound::Message {
            player_id: CONSOLE_ID,
            text: format!("&eWelcome to {}, {}!", config.name, player.name),
        },
        player.spawn_packet(SELF_ID),
    ]);

    let registry = server.registry();
    if !registry.activate(id, &player.spawn_packet(id.wire())) {
        tracing::debug!("{} left before joining", player.name);
        return;
    }
    registry.broadcast(
        &Outbound::Message {
            player_id: CONSOLE_ID,
            text: format!("&e{} joined the game", player.name),
        },
        None,
    );
    tracing::info!("{} joined the game as {} from {}", player.name, id, session.peer());
}

/// Chat goes to everyone as `<name>: <text>`; lines starting with `/` go to
/// the command handler instead.
fn chat(server: &Server, session: &Session, text: &str) {
    let name = session.name().unwrap_or_default();
    if text.starts_with('/') {
        server
            .commands()
            .process(server, text, session.is_operator(), &name);
        return;
    }
    let line = format!("{}: {}", name, text);
    tracing::info!("[chat] {}", line);
    server.registry().broadcast(
        &Outbound::Message {
            player_id: session.id().wire(),
            text: line,
        },
        None,
    );
}

/// The client's own player id field is ignored; the session id is
/// authoritative.
fn movement(server: &Server, session: &Session, position: Position, orientation: Orientation) {
    session.update_position(position, orientation);
    server.registry().broadcast(
        &Outbound::PlayerTeleport {
            player_id: session.id().wire(),
            position,
            orientation,
        },
        None,
    );
}
