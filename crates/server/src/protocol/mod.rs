//! Classic protocol (version 7) packet definitions and codec.
//!
//! Packets carry no length prefix: the leading type byte determines the total
//! frame length. All multi-byte integers are big-endian. Everything here is
//! pure; no sockets are involved, so every packet can be exercised in tests.

pub mod inbound;
pub mod outbound;
pub mod wire;

pub use inbound::Inbound;
pub use outbound::Outbound;
pub use wire::WireError;

/// Protocol version sent in `ServerIdentification`.
pub const PROTOCOL_VERSION: u8 = 0x07;

/// Width of every fixed-size string field.
pub const STRING_LENGTH: usize = 64;

/// Width of the level data chunk payload.
pub const ARRAY_LENGTH: usize = 1024;

/// `userType` value granting operator abilities on the client.
pub const USER_TYPE_OP: u8 = 0x64;
pub const USER_TYPE_NORMAL: u8 = 0x00;

/// Player id a client uses to refer to itself.
pub const SELF_ID: i8 = -1;

/// Sender id on chat lines that come from the server rather than a player.
pub const CONSOLE_ID: i8 = 0;

/// Player position in fixed-point units of 1/32 block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Position {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }
}

/// Heading and pitch, each a full turn in 256 steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    pub yaw: u8,
    pub pitch: u8,
}

impl Orientation {
    pub const fn new(yaw: u8, pitch: u8) -> Self {
        Self { yaw, pitch }
    }
}
