//! The authoritative game world: grid, physics scheduling, and block-change
//! emission.
//!
//! Every write goes through [`World::set_block`], which is also the only
//! place a `SetBlock` packet is produced. Packets land in the shared
//! [`BroadcastQueue`] and reach clients on the next server tick.

use std::sync::Arc;

use classic_engine::rules::{Edit, RuleSet};
use classic_engine::updates::UpdateQueue;
use classic_engine::world::block::BlockId;
use classic_engine::world::grid::VoxelGrid;
use classic_engine::world::position::{BlockPos, Dimensions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::block;
use crate::event_bus::BroadcastQueue;
use crate::generator::Generator;
use crate::protocol::{Outbound, Position};

/// Random ticks run on every n-th world tick.
pub const RANDOM_TICK_INTERVAL: u64 = 5;
/// Cells sampled per random-tick pass.
pub const RANDOM_TICK_SAMPLES: usize = 256;

/// Columns tried by the spawn search before falling back to the centre.
const SPAWN_ATTEMPTS: usize = 30;
const SPAWN_RADIUS: i32 = 32;

pub struct World {
    grid: VoxelGrid,
    rules: RuleSet,
    pending: UpdateQueue,
    rng: StdRng,
    ticks: u64,
    revision: u64,
    generator: Arc<dyn Generator>,
    outbox: Arc<BroadcastQueue>,
}

impl World {
    /// Wrap an existing grid (loaded from disk or built by hand).
    pub fn from_grid(
        grid: VoxelGrid,
        generator: Arc<dyn Generator>,
        outbox: Arc<BroadcastQueue>,
    ) -> Self {
        let dims = grid.dimensions();
        Self {
            grid,
            rules: crate::rules::standard(),
            pending: UpdateQueue::new(dims),
            rng: StdRng::from_entropy(),
            ticks: 0,
            revision: 0,
            generator,
            outbox,
        }
    }

    /// Allocate a grid of `dims` and let the generator fill it.
    pub fn generate(
        dims: Dimensions,
        generator: Arc<dyn Generator>,
        outbox: Arc<BroadcastQueue>,
    ) -> Self {
        let mut grid = VoxelGrid::new(dims);
        generator.fill(&mut grid);
        Self::from_grid(grid, generator, outbox)
    }

    /// Replace the random source with a seeded one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn dimensions(&self) -> Dimensions {
        self.grid.dimensions()
    }

    pub fn get(&self, pos: BlockPos) -> Option<BlockId> {
        self.grid.get(pos)
    }

    /// Bumped on every write; lets callers tell whether a cached copy of the
    /// grid is stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of cells waiting for re-evaluation on the next tick.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    // ── Edits ────────────────────────────────────────────────────────────

    /// Write one cell, schedule it and its neighbours, and emit a `SetBlock`
    /// packet. The packet goes out even when the value does not change.
    /// Returns `false` for positions outside the world.
    pub fn set_block(&mut self, pos: BlockPos, id: BlockId) -> bool {
        if !self.grid.set(pos, id) {
            return false;
        }
        self.revision += 1;
        self.pending.schedule_around(pos);
        self.outbox.push(set_block_packet(pos, id));
        true
    }

    /// Apply a client's edit. Mode 0 removes the block; any other mode places
    /// `id`, subject to [`block::can_place`]. A rejected placement leaves the
    /// grid untouched and echoes the block that is actually there.
    ///
    /// Returns the block now at `pos`, or `None` if `pos` is outside the world.
    pub fn player_edit(&mut self, pos: BlockPos, mode: u8, id: BlockId) -> Option<BlockId> {
        let current = self.grid.get(pos)?;
        if mode == 0 {
            self.set_block(pos, block::AIR);
            return Some(block::AIR);
        }
        let below = self.grid.get(pos.below());
        if !block::can_place(id, below) {
            tracing::debug!("rejected placement of {:?} at {:?} (below: {:?})", id, pos, below);
            self.outbox.push(set_block_packet(pos, current));
            return Some(current);
        }
        self.set_block(pos, id);
        Some(id)
    }

    fn apply(&mut self, edits: Vec<Edit>) {
        for edit in edits {
            self.set_block(edit.pos, edit.block);
        }
    }

    // ── Ticking ──────────────────────────────────────────────────────────

    /// Advance one world tick: drain the pending queue through the rule set,
    /// and on every [`RANDOM_TICK_INTERVAL`]-th call run a random-tick pass.
    ///
    /// Cells scheduled while the batch is processed wait for the next tick.
    pub fn tick(&mut self) {
        self.ticks += 1;
        if self.ticks % RANDOM_TICK_INTERVAL == 0 {
            self.random_tick();
        }

        for pos in self.pending.take() {
            let edits = self.rules.evaluate(&self.grid, pos);
            self.apply(edits);
        }
    }

    /// Sample [`RANDOM_TICK_SAMPLES`] cells uniformly and apply the growth
    /// and light rules to each.
    pub fn random_tick(&mut self) {
        let dims = self.grid.dimensions();
        for _ in 0..RANDOM_TICK_SAMPLES {
            let pos = BlockPos::new(
                self.rng.gen_range(0..dims.x) as i32,
                self.rng.gen_range(0..dims.y) as i32,
                self.rng.gen_range(0..dims.z) as i32,
            );
            self.random_tick_at(pos);
        }
    }

    /// Random-tick a single cell.
    ///
    /// - sapling with open sky: grows into a tree
    /// - flower in darkness: dies
    /// - mushroom in light: dies
    /// - dirt under a light-passing block: becomes grass; grass under an
    ///   opaque block: becomes dirt
    pub fn random_tick_at(&mut self, pos: BlockPos) {
        let Some(id) = self.grid.get(pos) else {
            return;
        };

        if id == block::SAPLING {
            if !self.is_shaded(pos) {
                let edits = self.generator.grow_tree(&self.grid, pos, &mut self.rng);
                if !edits.is_empty() {
                    tracing::debug!("sapling at {:?} grew into a tree", pos);
                }
                self.apply(edits);
            }
        } else if block::is_flower(id) {
            if self.is_shaded(pos) {
                self.set_block(pos, block::AIR);
            }
        } else if block::is_mushroom(id) {
            if !self.is_shaded(pos) {
                self.set_block(pos, block::AIR);
            }
        } else if id == block::DIRT || id == block::GRASS {
            // The top layer has nothing above it to judge by.
            let Some(above) = self.grid.get(pos.above()) else {
                return;
            };
            let lit = block::lets_light_through(above);
            if id == block::DIRT && lit {
                self.set_block(pos, block::GRASS);
            } else if id == block::GRASS && !lit {
                self.set_block(pos, block::DIRT);
            }
        }
    }

    /// A cell is shaded when any block between it and the ceiling stops light.
    pub fn is_shaded(&self, pos: BlockPos) -> bool {
        let top = self.grid.dimensions().y as i32;
        (pos.y + 1..top).any(|y| {
            self.grid
                .get(BlockPos::new(pos.x, y, pos.z))
                .is_some_and(|id| !block::lets_light_through(id))
        })
    }

    // ── Spawning ─────────────────────────────────────────────────────────

    /// Look for solid ground near the centre of the world. Tries a bounded
    /// number of random columns, scanning each from the top down for the
    /// first cell that is neither air nor water.
    pub fn find_spawn(&mut self) -> Option<Position> {
        let dims = self.grid.dimensions();
        let (cx, cz) = (dims.x as i32 / 2, dims.z as i32 / 2);
        // Small worlds shrink the search square so it stays inside the grid.
        let (rx, rz) = (SPAWN_RADIUS.min(cx.max(1)), SPAWN_RADIUS.min(cz.max(1)));
        for _ in 0..SPAWN_ATTEMPTS {
            let x = cx + self.rng.gen_range(-rx..rx);
            let z = cz + self.rng.gen_range(-rz..rz);
            let ground = (0..dims.y as i32).rev().find(|&y| {
                self.grid
                    .get(BlockPos::new(x, y, z))
                    .is_some_and(|id| id != block::AIR && id != block::WATER)
            });
            if let Some(y) = ground {
                return Some(Position::new(
                    fixed(x * 32 + 16),
                    fixed((y + 1) * 32 + 51),
                    fixed(z * 32 + 16),
                ));
            }
        }
        None
    }

    /// [`find_spawn`](Self::find_spawn), falling back to the world centre
    /// a few blocks below the ceiling.
    pub fn spawn_position(&mut self) -> Position {
        self.find_spawn().unwrap_or_else(|| {
            let dims = self.grid.dimensions();
            let y = (dims.y as i32 - 4).max(0);
            Position::new(
                fixed(dims.x as i32 / 2 * 32),
                fixed(y * 32 + 51),
                fixed(dims.z as i32 / 2 * 32),
            )
        })
    }
}

fn set_block_packet(pos: BlockPos, id: BlockId) -> Outbound {
    Outbound::SetBlock {
        x: pos.x as i16,
        y: pos.y as i16,
        z: pos.z as i16,
        block: id.0,
    }
}

/// Clamp a fixed-point coordinate into the wire's i16 range.
fn fixed(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::FlatGenerator;

    fn world(x: usize, y: usize, z: usize) -> (World, Arc<BroadcastQueue>) {
        let outbox = Arc::new(BroadcastQueue::new());
        let grid = VoxelGrid::new(Dimensions::new(x, y, z).unwrap());
        let world =
            World::from_grid(grid, Arc::new(FlatGenerator), Arc::clone(&outbox)).with_seed(42);
        (world, outbox)
    }

    #[test]
    fn set_block_always_emits() {
        let (mut w, outbox) = world(4, 4, 4);
        let pos = BlockPos::new(1, 1, 1);
        assert!(w.set_block(pos, block::STONE));
        let after_one = w.grid().clone();
        assert!(w.set_block(pos, block::STONE));
        assert_eq!(w.grid(), &after_one);
        assert_eq!(outbox.len(), 2);
    }

    #[test]
    fn set_block_out_of_bounds_does_nothing() {
        let (mut w, outbox) = world(4, 4, 4);
        assert!(!w.set_block(BlockPos::new(4, 0, 0), block::STONE));
        assert!(outbox.is_empty());
        assert_eq!(w.pending_len(), 0);
    }

    #[test]
    fn set_block_schedules_neighbourhood() {
        let (mut w, _) = world(8, 8, 8);
        w.set_block(BlockPos::new(3, 3, 3), block::STONE);
        assert_eq!(w.pending_len(), 7);
        w.tick();
        assert_eq!(w.pending_len(), 0);
    }

    #[test]
    fn grass_turns_to_dirt_under_stone() {
        let (mut w, _) = world(4, 4, 4);
        let pos = BlockPos::new(1, 1, 1);
        w.set_block(pos, block::GRASS);
        w.set_block(pos.above(), block::STONE);
        w.random_tick_at(pos);
        assert_eq!(w.get(pos), Some(block::DIRT));

        w.set_block(pos.above(), block::AIR);
        w.random_tick_at(pos);
        assert_eq!(w.get(pos), Some(block::GRASS));
    }

    #[test]
    fn spawn_lands_above_ground() {
        let outbox = Arc::new(BroadcastQueue::new());
        let dims = Dimensions::new(64, 16, 64).unwrap();
        let mut w = World::generate(dims, Arc::new(FlatGenerator), outbox).with_seed(3);
        let spawn = w.find_spawn().expect("flat world has ground everywhere");
        // Surface at y=7, so feet at y=8.
        assert_eq!(spawn.y, 8 * 32 + 51);
    }

    #[test]
    fn empty_world_spawns_at_centre() {
        let (mut w, _) = world(16, 16, 16);
        assert_eq!(w.find_spawn(), None);
        let p = w.spawn_position();
        assert_eq!((p.x, p.z), (8 * 32, 8 * 32));
    }

    #[test]
    fn large_coordinates_clamp() {
        assert_eq!(fixed(1024 * 32 + 16), i16::MAX);
        assert_eq!(fixed(-5), -5);
    }
}
