/// Absolute block position in the world.
///
/// Signed so that neighbour arithmetic at the world edge yields a position
/// the grid can reject instead of wrapping around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn above(&self) -> BlockPos {
        Self::new(self.x, self.y + 1, self.z)
    }

    pub const fn below(&self) -> BlockPos {
        Self::new(self.x, self.y - 1, self.z)
    }

    /// The six cardinal neighbors.
    pub const fn neighbors(&self) -> [BlockPos; 6] {
        [
            Self::new(self.x + 1, self.y, self.z),
            Self::new(self.x - 1, self.y, self.z),
            Self::new(self.x, self.y + 1, self.z),
            Self::new(self.x, self.y - 1, self.z),
            Self::new(self.x, self.y, self.z + 1),
            Self::new(self.x, self.y, self.z - 1),
        ]
    }

    /// The four horizontal neighbors (±X, ±Z).
    pub const fn horizontal_neighbors(&self) -> [BlockPos; 4] {
        [
            Self::new(self.x - 1, self.y, self.z),
            Self::new(self.x + 1, self.y, self.z),
            Self::new(self.x, self.y, self.z + 1),
            Self::new(self.x, self.y, self.z - 1),
        ]
    }
}

/// Extents of a world along each axis, in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Dimensions {
    /// Largest extent accepted along any axis.
    pub const MAX_AXIS: usize = 1024;

    /// The fixed size of legacy (version 1) worlds.
    pub const LEGACY: Dimensions = Dimensions {
        x: 256,
        y: 64,
        z: 256,
    };

    /// Validated constructor: every axis must lie in `1..=MAX_AXIS`.
    pub fn new(x: usize, y: usize, z: usize) -> Option<Self> {
        let ok = |v: usize| (1..=Self::MAX_AXIS).contains(&v);
        (ok(x) && ok(y) && ok(z)).then_some(Self { x, y, z })
    }

    /// Number of cells in the cuboid.
    pub const fn volume(&self) -> usize {
        self.x * self.y * self.z
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && (pos.x as usize) < self.x
            && (pos.y as usize) < self.y
            && (pos.z as usize) < self.z
    }
}
