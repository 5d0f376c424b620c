//! Small constructors and lookups shared by rule implementations.

use classic_engine::rules::Edit;
use classic_engine::world::block::BlockId;
use classic_engine::world::grid::VoxelGrid;
use classic_engine::world::position::BlockPos;

/// Positions a flowing fluid may spread into: below, then the four sides.
pub fn spread_targets(pos: BlockPos) -> [BlockPos; 5] {
    let [a, b, c, d] = pos.horizontal_neighbors();
    [pos.below(), a, b, c, d]
}

/// Create an `Edit` writing `block` at `pos`.
pub fn set(pos: BlockPos, block: BlockId) -> Edit {
    Edit::new(pos, block)
}

/// Is the in-bounds cell at `pos` air? Out-of-bounds cells never are.
pub fn is_air(grid: &VoxelGrid, pos: BlockPos) -> bool {
    grid.get(pos) == Some(BlockId::AIR)
}
