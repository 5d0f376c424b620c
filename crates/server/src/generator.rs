//! Terrain generation and tree growth.
//!
//! The world only talks to a [`Generator`]: `fill` runs once when no save
//! file could be loaded, `grow_tree` runs whenever a sapling gets a random tick.

use classic_engine::rules::Edit;
use classic_engine::world::grid::VoxelGrid;
use classic_engine::world::position::BlockPos;
use rand::Rng;
use rand::rngs::StdRng;

use crate::block;

pub trait Generator: Send + Sync {
    /// Populate a freshly allocated (all-air) grid.
    fn fill(&self, grid: &mut VoxelGrid);

    /// Edits that turn the sapling at `base` into a tree. Empty when there is
    /// no room to grow.
    fn grow_tree(&self, grid: &VoxelGrid, base: BlockPos, rng: &mut StdRng) -> Vec<Edit>;
}

/// Flat terrain: a bedrock floor, stone, three layers of dirt, and a grass
/// surface at half the world height.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGenerator;

impl FlatGenerator {
    /// Y coordinate of the grass surface for a world `height` blocks tall.
    pub fn surface(height: usize) -> usize {
        (height / 2).max(1) - 1
    }
}

impl Generator for FlatGenerator {
    fn fill(&self, grid: &mut VoxelGrid) {
        let dims = grid.dimensions();
        let surface = Self::surface(dims.y);
        for pos in grid.positions() {
            let y = pos.y as usize;
            let id = if y == 0 {
                block::BEDROCK
            } else if y == surface {
                block::GRASS
            } else if y + 3 >= surface && y < surface {
                block::DIRT
            } else if y < surface {
                block::STONE
            } else {
                continue;
            };
            grid.set(pos, id);
        }
        tracing::info!(
            "Generated flat world {}x{}x{} (surface at y={})",
            dims.x,
            dims.y,
            dims.z,
            surface
        );
    }

    fn grow_tree(&self, grid: &VoxelGrid, base: BlockPos, rng: &mut StdRng) -> Vec<Edit> {
        let height = rng.gen_range(4..=6);
        let top = base.y + height - 1;

        // The trunk needs open air all the way up, and the crown must fit.
        let trunk_clear = (1..height).all(|dy| {
            grid.get(BlockPos::new(base.x, base.y + dy, base.z)) == Some(block::AIR)
        });
        if !trunk_clear || !grid.contains(BlockPos::new(base.x, top + 1, base.z)) {
            return Vec::new();
        }

        let mut edits = Vec::new();
        let mut leaf = |pos: BlockPos| {
            if grid.get(pos) == Some(block::AIR) {
                edits.push(Edit::new(pos, block::LEAVES));
            }
        };

        // Two wide layers, one narrow layer at the top of the trunk, a cap above.
        for y in top - 2..=top {
            let radius: i32 = if y == top { 1 } else { 2 };
            for dx in -radius..=radius {
                for dz in -radius..=radius {
                    if (dx, dz) == (0, 0) {
                        continue;
                    }
                    // Corners of the wide layers are trimmed at random.
                    if radius == 2 && dx.abs() == 2 && dz.abs() == 2 && rng.gen_range(0..2) == 0 {
                        continue;
                    }
                    leaf(BlockPos::new(base.x + dx, y, base.z + dz));
                }
            }
        }
        for (dx, dz) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
            leaf(BlockPos::new(base.x + dx, top + 1, base.z + dz));
        }

        for dy in 0..height {
            edits.push(Edit::new(BlockPos::new(base.x, base.y + dy, base.z), block::LOG));
        }
        edits
    }
}
