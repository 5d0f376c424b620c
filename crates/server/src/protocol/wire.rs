//! Field-level helpers shared by the inbound and outbound codecs.

use bytes::{Buf, BufMut};
use thiserror::Error;

use super::{Orientation, Position, STRING_LENGTH};

/// Errors produced while decoding a packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("unknown packet kind 0x{0:02x}")]
    UnknownPacketKind(u8),
    #[error("packet 0x{kind:02x} needs {needed} bytes, only {available} available")]
    Truncated {
        kind: u8,
        needed: usize,
        available: usize,
    },
}

/// Check the leading byte against a length table without consuming anything.
/// Returns the packet id and its total length.
pub(crate) fn frame_header<B: Buf>(
    buf: &B,
    length_of: fn(u8) -> Option<usize>,
) -> Result<(u8, usize), WireError> {
    let Some(&kind) = buf.chunk().first() else {
        return Err(WireError::Truncated {
            kind: 0,
            needed: 1,
            available: 0,
        });
    };
    let needed = length_of(kind).ok_or(WireError::UnknownPacketKind(kind))?;
    if buf.remaining() < needed {
        return Err(WireError::Truncated {
            kind,
            needed,
            available: buf.remaining(),
        });
    }
    Ok((kind, needed))
}

/// Write a fixed-width string: non-ASCII becomes `?`, truncated to the field
/// width and padded with spaces. No terminator is written.
pub fn put_string<B: BufMut>(out: &mut B, s: &str) {
    let mut field = [b' '; STRING_LENGTH];
    for (slot, ch) in field.iter_mut().zip(s.chars()) {
        *slot = if ch.is_ascii() { ch as u8 } else { b'?' };
    }
    out.put_slice(&field);
}

fn take_field<B: Buf>(buf: &mut B) -> [u8; STRING_LENGTH] {
    let mut field = [0u8; STRING_LENGTH];
    buf.copy_to_slice(&mut field);
    field
}

/// Read a token field (username, key): everything up to the first space or NUL.
pub fn get_token<B: Buf>(buf: &mut B) -> String {
    let field = take_field(buf);
    let end = field
        .iter()
        .position(|&b| b == b' ' || b == 0)
        .unwrap_or(STRING_LENGTH);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Read a free-text field (chat, MOTD, reasons): up to the first NUL, with the
/// trailing space padding removed.
pub fn get_text<B: Buf>(buf: &mut B) -> String {
    let field = take_field(buf);
    let end = field.iter().position(|&b| b == 0).unwrap_or(STRING_LENGTH);
    String::from_utf8_lossy(&field[..end])
        .trim_end_matches(' ')
        .to_owned()
}

pub fn put_position<B: BufMut>(out: &mut B, p: Position) {
    out.put_i16(p.x);
    out.put_i16(p.y);
    out.put_i16(p.z);
}

pub fn get_position<B: Buf>(buf: &mut B) -> Position {
    Position {
        x: buf.get_i16(),
        y: buf.get_i16(),
        z: buf.get_i16(),
    }
}

pub fn put_orientation<B: BufMut>(out: &mut B, o: Orientation) {
    out.put_u8(o.yaw);
    out.put_u8(o.pitch);
}

pub fn get_orientation<B: Buf>(buf: &mut B) -> Orientation {
    Orientation {
        yaw: buf.get_u8(),
        pitch: buf.get_u8(),
    }
}
