//! Client → server packets.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::wire::{self, WireError};
use super::{Orientation, Position};

pub const IDENTIFICATION: u8 = 0x00;
pub const SET_BLOCK: u8 = 0x05;
pub const POSITION_ORIENTATION: u8 = 0x08;
pub const MESSAGE: u8 = 0x0d;

/// Total frame length (type byte included) for each inbound packet kind.
pub fn packet_length(kind: u8) -> Option<usize> {
    match kind {
        IDENTIFICATION => Some(131),
        SET_BLOCK => Some(9),
        POSITION_ORIENTATION => Some(10),
        MESSAGE => Some(66),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Identification {
        protocol_version: u8,
        username: String,
        verify_key: String,
        unused: u8,
    },
    SetBlock {
        x: i16,
        y: i16,
        z: i16,
        /// 0 = destroy, 1 = create.
        mode: u8,
        block: u8,
    },
    PositionOrientation {
        player_id: u8,
        position: Position,
        orientation: Orientation,
    },
    Message {
        unused: u8,
        text: String,
    },
}

impl Inbound {
    pub fn kind(&self) -> u8 {
        match self {
            Inbound::Identification { .. } => IDENTIFICATION,
            Inbound::SetBlock { .. } => SET_BLOCK,
            Inbound::PositionOrientation { .. } => POSITION_ORIENTATION,
            Inbound::Message { .. } => MESSAGE,
        }
    }

    /// Decode one packet from the front of `buf`.
    ///
    /// Nothing is consumed on error: an unknown leading byte or a short
    /// buffer leaves `buf` untouched so the caller decides what to drop.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        let (kind, _) = wire::frame_header(buf, packet_length)?;
        buf.advance(1);
        let packet = match kind {
            IDENTIFICATION => Inbound::Identification {
                protocol_version: buf.get_u8(),
                username: wire::get_token(buf),
                verify_key: wire::get_token(buf),
                unused: buf.get_u8(),
            },
            SET_BLOCK => Inbound::SetBlock {
                x: buf.get_i16(),
                y: buf.get_i16(),
                z: buf.get_i16(),
                mode: buf.get_u8(),
                block: buf.get_u8(),
            },
            POSITION_ORIENTATION => Inbound::PositionOrientation {
                player_id: buf.get_u8(),
                position: wire::get_position(buf),
                orientation: wire::get_orientation(buf),
            },
            MESSAGE => Inbound::Message {
                unused: buf.get_u8(),
                text: wire::get_text(buf),
            },
            other => return Err(WireError::UnknownPacketKind(other)),
        };
        Ok(packet)
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u8(self.kind());
        match self {
            Inbound::Identification {
                protocol_version,
                username,
                verify_key,
                unused,
            } => {
                out.put_u8(*protocol_version);
                wire::put_string(out, username);
                wire::put_string(out, verify_key);
                out.put_u8(*unused);
            }
            Inbound::SetBlock {
                x,
                y,
                z,
                mode,
                block,
            } => {
                out.put_i16(*x);
                out.put_i16(*y);
                out.put_i16(*z);
                out.put_u8(*mode);
                out.put_u8(*block);
            }
            Inbound::PositionOrientation {
                player_id,
                position,
                orientation,
            } => {
                out.put_u8(*player_id);
                wire::put_position(out, *position);
                wire::put_orientation(out, *orientation);
            }
            Inbound::Message { unused, text } => {
                out.put_u8(*unused);
                wire::put_string(out, text);
            }
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(packet_length(self.kind()).unwrap_or(0));
        self.encode(&mut out);
        out.freeze()
    }
}

/// Pull the next complete packet off an accumulating receive buffer.
///
/// Leading bytes that do not name a known packet are discarded one at a time.
/// Returns `None` when the buffer is empty or holds only part of a frame; the
/// partial frame stays buffered until more bytes arrive.
pub fn next_frame(buf: &mut BytesMut) -> Option<Inbound> {
    loop {
        let &kind = buf.first()?;
        let Some(len) = packet_length(kind) else {
            tracing::debug!("dropping unknown leading byte 0x{:02x}", kind);
            buf.advance(1);
            continue;
        };
        if buf.len() < len {
            return None;
        }
        let mut frame = buf.split_to(len);
        match Inbound::decode(&mut frame) {
            Ok(packet) => return Some(packet),
            Err(e) => tracing::debug!("dropping malformed frame: {}", e),
        }
    }
}
