//! Level transfer: the gzip-compressed grid sent to a freshly identified client.

use std::io::{self, Write};

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::protocol::{ARRAY_LENGTH, Outbound};

/// Gzip the header-prefixed grid buffer at the highest compression level.
pub fn compress(raw: &[u8]) -> io::Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 8), Compression::best());
    encoder.write_all(raw)?;
    Ok(Bytes::from(encoder.finish()?))
}

/// Split a compressed level into `LevelDataChunk` packets of at most
/// [`ARRAY_LENGTH`] bytes. Each chunk reports how much of the level has been
/// sent once it arrives, so the last one always says 100.
pub fn chunk_packets(compressed: &Bytes) -> Vec<Outbound> {
    let total = compressed.len();
    let mut packets = Vec::with_capacity(total.div_ceil(ARRAY_LENGTH));
    let mut sent = 0;
    while sent < total {
        let end = (sent + ARRAY_LENGTH).min(total);
        let data = compressed.slice(sent..end);
        sent = end;
        packets.push(Outbound::LevelDataChunk {
            data,
            percent: (sent * 100 / total) as u8,
        });
    }
    packets
}
