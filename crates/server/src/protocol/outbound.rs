//! Server → client packets.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::wire::{self, WireError};
use super::{ARRAY_LENGTH, Orientation, Position};

pub const SERVER_IDENTIFICATION: u8 = 0x00;
pub const PING: u8 = 0x01;
pub const LEVEL_INITIALIZE: u8 = 0x02;
pub const LEVEL_DATA_CHUNK: u8 = 0x03;
pub const LEVEL_FINALIZE: u8 = 0x04;
pub const SET_BLOCK: u8 = 0x06;
pub const SPAWN_PLAYER: u8 = 0x07;
pub const PLAYER_TELEPORT: u8 = 0x08;
pub const DESPAWN_PLAYER: u8 = 0x0c;
pub const MESSAGE: u8 = 0x0d;
pub const DISCONNECT: u8 = 0x0e;
pub const UPDATE_USER_TYPE: u8 = 0x0f;

/// Total frame length (type byte included) for each outbound packet kind.
pub fn packet_length(kind: u8) -> Option<usize> {
    match kind {
        SERVER_IDENTIFICATION => Some(131),
        PING => Some(1),
        LEVEL_INITIALIZE => Some(1),
        LEVEL_DATA_CHUNK => Some(1028),
        LEVEL_FINALIZE => Some(7),
        SET_BLOCK => Some(8),
        SPAWN_PLAYER => Some(74),
        PLAYER_TELEPORT => Some(10),
        DESPAWN_PLAYER => Some(2),
        MESSAGE => Some(66),
        DISCONNECT => Some(65),
        UPDATE_USER_TYPE => Some(2),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    ServerIdentification {
        protocol_version: u8,
        name: String,
        motd: String,
        user_type: u8,
    },
    /// Keep-alive; carries no payload.
    Ping,
    LevelInitialize,
    /// One slice of the compressed level. `data` holds at most
    /// [`ARRAY_LENGTH`] bytes; the wire field is zero-padded to that width.
    LevelDataChunk {
        data: Bytes,
        percent: u8,
    },
    LevelFinalize {
        size_x: i16,
        size_y: i16,
        size_z: i16,
    },
    SetBlock {
        x: i16,
        y: i16,
        z: i16,
        block: u8,
    },
    SpawnPlayer {
        player_id: i8,
        name: String,
        position: Position,
        orientation: Orientation,
    },
    PlayerTeleport {
        player_id: i8,
        position: Position,
        orientation: Orientation,
    },
    DespawnPlayer {
        player_id: i8,
    },
    Message {
        player_id: i8,
        text: String,
    },
    Disconnect {
        reason: String,
    },
    UpdateUserType {
        user_type: u8,
    },
    /// A kind this codec has no layout for; only the id byte is written.
    Unsupported(u8),
}

impl Outbound {
    pub fn kind(&self) -> u8 {
        match self {
            Outbound::ServerIdentification { .. } => SERVER_IDENTIFICATION,
            Outbound::Ping => PING,
            Outbound::LevelInitialize => LEVEL_INITIALIZE,
            Outbound::LevelDataChunk { .. } => LEVEL_DATA_CHUNK,
            Outbound::LevelFinalize { .. } => LEVEL_FINALIZE,
            Outbound::SetBlock { .. } => SET_BLOCK,
            Outbound::SpawnPlayer { .. } => SPAWN_PLAYER,
            Outbound::PlayerTeleport { .. } => PLAYER_TELEPORT,
            Outbound::DespawnPlayer { .. } => DESPAWN_PLAYER,
            Outbound::Message { .. } => MESSAGE,
            Outbound::Disconnect { .. } => DISCONNECT,
            Outbound::UpdateUserType { .. } => UPDATE_USER_TYPE,
            Outbound::Unsupported(kind) => *kind,
        }
    }

    /// The player a movement packet describes. Broadcasts never echo such a
    /// packet back to the player it describes.
    pub fn origin_player(&self) -> Option<i8> {
        match self {
            Outbound::PlayerTeleport { player_id, .. } => Some(*player_id),
            _ => None,
        }
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u8(self.kind());
        match self {
            Outbound::ServerIdentification {
                protocol_version,
                name,
                motd,
                user_type,
            } => {
                out.put_u8(*protocol_version);
                wire::put_string(out, name);
                wire::put_string(out, motd);
                out.put_u8(*user_type);
            }
            Outbound::Ping | Outbound::LevelInitialize | Outbound::Unsupported(_) => {}
            Outbound::LevelDataChunk { data, percent } => {
                let len = data.len().min(ARRAY_LENGTH);
                out.put_i16(len as i16);
                out.put_slice(&data[..len]);
                out.put_bytes(0, ARRAY_LENGTH - len);
                out.put_u8(*percent);
            }
            Outbound::LevelFinalize {
                size_x,
                size_y,
                size_z,
            } => {
                out.put_i16(*size_x);
                out.put_i16(*size_y);
                out.put_i16(*size_z);
            }
            Outbound::SetBlock { x, y, z, block } => {
                out.put_i16(*x);
                out.put_i16(*y);
                out.put_i16(*z);
                out.put_u8(*block);
            }
            Outbound::SpawnPlayer {
                player_id,
                name,
                position,
                orientation,
            } => {
                out.put_i8(*player_id);
                wire::put_string(out, name);
                wire::put_position(out, *position);
                wire::put_orientation(out, *orientation);
            }
            Outbound::PlayerTeleport {
                player_id,
                position,
                orientation,
            } => {
                out.put_i8(*player_id);
                wire::put_position(out, *position);
                wire::put_orientation(out, *orientation);
            }
            Outbound::DespawnPlayer { player_id } => out.put_i8(*player_id),
            Outbound::Message { player_id, text } => {
                out.put_i8(*player_id);
                wire::put_string(out, text);
            }
            Outbound::Disconnect { reason } => wire::put_string(out, reason),
            Outbound::UpdateUserType { user_type } => out.put_u8(*user_type),
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(packet_length(self.kind()).unwrap_or(1));
        self.encode(&mut out);
        out.freeze()
    }

    /// Decode one packet from the front of `buf`. Nothing is consumed on error.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        let (kind, _) = wire::frame_header(buf, packet_length)?;
        buf.advance(1);
        let packet = match kind {
            SERVER_IDENTIFICATION => Outbound::ServerIdentification {
                protocol_version: buf.get_u8(),
                name: wire::get_text(buf),
                motd: wire::get_text(buf),
                user_type: buf.get_u8(),
            },
            PING => Outbound::Ping,
            LEVEL_INITIALIZE => Outbound::LevelInitialize,
            LEVEL_DATA_CHUNK => {
                let len = (buf.get_i16().max(0) as usize).min(ARRAY_LENGTH);
                let mut field = buf.copy_to_bytes(ARRAY_LENGTH);
                field.truncate(len);
                Outbound::LevelDataChunk {
                    data: field,
                    percent: buf.get_u8(),
                }
            }
            LEVEL_FINALIZE => Outbound::LevelFinalize {
                size_x: buf.get_i16(),
                size_y: buf.get_i16(),
                size_z: buf.get_i16(),
            },
            SET_BLOCK => Outbound::SetBlock {
                x: buf.get_i16(),
                y: buf.get_i16(),
                z: buf.get_i16(),
                block: buf.get_u8(),
            },
            SPAWN_PLAYER => Outbound::SpawnPlayer {
                player_id: buf.get_i8(),
                name: wire::get_token(buf),
                position: wire::get_position(buf),
                orientation: wire::get_orientation(buf),
            },
            PLAYER_TELEPORT => Outbound::PlayerTeleport {
                player_id: buf.get_i8(),
                position: wire::get_position(buf),
                orientation: wire::get_orientation(buf),
            },
            DESPAWN_PLAYER => Outbound::DespawnPlayer {
                player_id: buf.get_i8(),
            },
            MESSAGE => Outbound::Message {
                player_id: buf.get_i8(),
                text: wire::get_text(buf),
            },
            DISCONNECT => Outbound::Disconnect {
                reason: wire::get_text(buf),
            },
            UPDATE_USER_TYPE => Outbound::UpdateUserType {
                user_type: buf.get_u8(),
            },
            other => return Err(WireError::UnknownPacketKind(other)),
        };
        Ok(packet)
    }
}
