use super::block::BlockId;
use super::position::{BlockPos, Dimensions};

/// Size of the big-endian volume header that prefixes the cell bytes.
pub const HEADER_LEN: usize = 4;

/// The entire block world as one flat byte buffer.
///
/// Layout: `[u32 BE volume][cells...]`, one byte per cell, indexed
/// `y*Z*X + z*X + x + 4` (x varies fastest, y slowest). The header makes the
/// buffer self-describing for level transfer, which compresses it verbatim.
///
/// All access goes through bounds-checked accessors; a position outside the
/// cuboid has no index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelGrid {
    dims: Dimensions,
    data: Vec<u8>,
}

impl VoxelGrid {
    /// An all-air grid of the given size.
    pub fn new(dims: Dimensions) -> Self {
        let mut data = vec![0u8; HEADER_LEN + dims.volume()];
        write_header(&mut data, dims);
        Self { dims, data }
    }

    /// Build a grid from raw cell bytes (no header). Returns `None` if the
    /// payload length does not match the dimensions.
    pub fn from_payload(dims: Dimensions, payload: &[u8]) -> Option<Self> {
        if payload.len() != dims.volume() {
            return None;
        }
        let mut data = Vec::with_capacity(HEADER_LEN + payload.len());
        data.extend_from_slice(&[0; HEADER_LEN]);
        data.extend_from_slice(payload);
        write_header(&mut data, dims);
        Some(Self { dims, data })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Buffer offset of a cell, or `None` when `pos` is outside the world.
    #[inline]
    pub fn index(&self, pos: BlockPos) -> Option<usize> {
        if !self.dims.contains(pos) {
            return None;
        }
        let (x, y, z) = (pos.x as usize, pos.y as usize, pos.z as usize);
        Some(y * self.dims.z * self.dims.x + z * self.dims.x + x + HEADER_LEN)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.dims.contains(pos)
    }

    #[inline]
    pub fn get(&self, pos: BlockPos) -> Option<BlockId> {
        self.index(pos).map(|i| BlockId(self.data[i]))
    }

    /// Write a cell. Returns `false` (and writes nothing) out of bounds.
    #[inline]
    pub fn set(&mut self, pos: BlockPos, block: BlockId) -> bool {
        match self.index(pos) {
            Some(i) => {
                self.data[i] = block.0;
                true
            }
            None => false,
        }
    }

    /// Set every cell to `block`, leaving the header intact.
    pub fn fill(&mut self, block: BlockId) {
        self.data[HEADER_LEN..].fill(block.0);
    }

    /// Reset every cell to air.
    pub fn clear(&mut self) {
        self.fill(BlockId::AIR);
    }

    /// Cell bytes only, in grid order.
    pub fn payload(&self) -> &[u8] {
        &self.data[HEADER_LEN..]
    }

    /// Header followed by the cells: the exact buffer sent during level transfer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Iterate every position in the grid, x fastest.
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + use<> {
        let Dimensions { x, y, z } = self.dims;
        (0..y).flat_map(move |py| {
            (0..z).flat_map(move |pz| {
                (0..x).map(move |px| BlockPos::new(px as i32, py as i32, pz as i32))
            })
        })
    }
}

fn write_header(data: &mut [u8], dims: Dimensions) {
    let volume = dims.volume() as u32;
    data[..HEADER_LEN].copy_from_slice(&volume.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_big_endian_volume() {
        let grid = VoxelGrid::new(Dimensions::new(4, 2, 3).unwrap());
        assert_eq!(&grid.as_bytes()[..4], &24u32.to_be_bytes());
        assert_eq!(grid.payload().len(), 24);
    }

    #[test]
    fn set_out_of_bounds_is_rejected() {
        let mut grid = VoxelGrid::new(Dimensions::new(2, 2, 2).unwrap());
        assert!(!grid.set(BlockPos::new(2, 0, 0), BlockId(1)));
        assert!(!grid.set(BlockPos::new(0, -1, 0), BlockId(1)));
        assert!(grid.payload().iter().all(|&b| b == 0));
    }

    #[test]
    fn from_payload_checks_length() {
        let dims = Dimensions::new(2, 2, 2).unwrap();
        assert!(VoxelGrid::from_payload(dims, &[0; 7]).is_none());
        let grid = VoxelGrid::from_payload(dims, &[3; 8]).unwrap();
        assert_eq!(grid.get(BlockPos::new(1, 1, 1)), Some(BlockId(3)));
        assert_eq!(&grid.as_bytes()[..4], &8u32.to_be_bytes());
    }
}
