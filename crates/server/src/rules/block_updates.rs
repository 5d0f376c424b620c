//! Block-update rules: fluid spread, plant support, and gravity.
//!
//! Each public function has the signature `fn(&VoxelGrid, BlockPos) -> Vec<Edit>`
//! so it can be registered directly as a `RuleFn`.

use classic_engine::rules::Edit;
use classic_engine::world::block::BlockId;
use classic_engine::world::grid::VoxelGrid;
use classic_engine::world::position::BlockPos;

use super::helpers::{is_air, set, spread_targets};
use crate::block;

// ── Fluids ───────────────────────────────────────────────────────────────

/// Flowing water or lava converts adjacent air (below and the four sides)
/// into more of itself. Fluids never climb.
pub fn fluid_spread(grid: &VoxelGrid, pos: BlockPos) -> Vec<Edit> {
    let Some(fluid) = grid.get(pos) else {
        return Vec::new();
    };
    if !block::is_flowing(fluid) {
        return Vec::new();
    }

    spread_targets(pos)
        .into_iter()
        .filter(|n| is_air(grid, *n))
        .map(|n| set(n, fluid))
        .collect()
}

// ── Plants ───────────────────────────────────────────────────────────────

/// A sapling, flower, or mushroom whose support block is no longer legal
/// turns into air. Cells on the bottom layer have nothing to check.
pub fn plant_support(grid: &VoxelGrid, pos: BlockPos) -> Vec<Edit> {
    let Some(plant) = grid.get(pos) else {
        return Vec::new();
    };
    if !block::is_plant(plant) && !block::is_mushroom(plant) {
        return Vec::new();
    }

    match grid.get(pos.below()) {
        Some(below) if !block::is_supported(plant, Some(below)) => vec![set(pos, BlockId::AIR)],
        _ => Vec::new(),
    }
}

// ── Gravity ──────────────────────────────────────────────────────────────

/// Gravity rule: sand or gravel with air or fluid directly below moves down
/// one cell. The vacated cell is written first, then the landing cell.
pub fn gravity(grid: &VoxelGrid, pos: BlockPos) -> Vec<Edit> {
    let Some(falling) = grid.get(pos) else {
        return Vec::new();
    };
    if !block::has_gravity(falling) {
        return Vec::new();
    }

    let below = pos.below();
    match grid.get(below) {
        Some(under) if under == BlockId::AIR || block::is_fluid(under) => {
            vec![set(pos, BlockId::AIR), set(below, falling)]
        }
        _ => Vec::new(),
    }
}
