//! Block rules driven through the world tick: placement checks, plant
//! survival, gravity, and fluid spread.

use std::sync::Arc;

use classic_engine::world::grid::VoxelGrid;
use classic_engine::world::position::{BlockPos, Dimensions};

use classic_server::block;
use classic_server::event_bus::BroadcastQueue;
use classic_server::generator::FlatGenerator;
use classic_server::protocol::Outbound;
use classic_server::world::World;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// An 8×8×8 world with a stone floor at y = 0.
fn stone_floor() -> (World, Arc<BroadcastQueue>) {
    let dims = Dimensions::new(8, 8, 8).unwrap();
    let mut grid = VoxelGrid::new(dims);
    for x in 0..8 {
        for z in 0..8 {
            grid.set(BlockPos::new(x, 0, z), block::STONE);
        }
    }
    let outbox = Arc::new(BroadcastQueue::new());
    let world = World::from_grid(grid, Arc::new(FlatGenerator), Arc::clone(&outbox)).with_seed(7);
    (world, outbox)
}

fn run_ticks(world: &mut World, n: usize) {
    for _ in 0..n {
        world.tick();
    }
}

fn emitted(outbox: &BroadcastQueue) -> Vec<Outbound> {
    outbox.drain().into_iter().map(|b| b.packet).collect()
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

#[test]
fn flower_on_stone_is_rejected_and_echoed() {
    let (mut world, outbox) = stone_floor();
    let pos = BlockPos::new(2, 1, 2);

    assert_eq!(world.player_edit(pos, 1, block::ROSE), Some(block::AIR));
    assert_eq!(world.get(pos), Some(block::AIR));
    assert_eq!(
        emitted(&outbox),
        vec![Outbound::SetBlock {
            x: 2,
            y: 1,
            z: 2,
            block: 0
        }]
    );
    assert_eq!(world.pending_len(), 0);
}

#[test]
fn flower_on_grass_is_placed() {
    let (mut world, outbox) = stone_floor();
    world.set_block(BlockPos::new(2, 1, 2), block::GRASS);
    outbox.drain();

    let pos = BlockPos::new(2, 2, 2);
    assert_eq!(world.player_edit(pos, 1, block::DANDELION), Some(block::DANDELION));
    assert_eq!(world.get(pos), Some(block::DANDELION));

    run_ticks(&mut world, 3);
    assert_eq!(world.get(pos), Some(block::DANDELION));
}

#[test]
fn destroy_mode_ignores_the_block_id() {
    let (mut world, _) = stone_floor();
    let pos = BlockPos::new(4, 0, 4);
    assert_eq!(world.player_edit(pos, 0, block::GOLD_BLOCK), Some(block::AIR));
    assert_eq!(world.get(pos), Some(block::AIR));
}

#[test]
fn edits_outside_the_world_do_nothing() {
    let (mut world, outbox) = stone_floor();
    assert_eq!(world.player_edit(BlockPos::new(8, 1, 0), 1, block::STONE), None);
    assert_eq!(world.player_edit(BlockPos::new(0, -1, 0), 0, block::AIR), None);
    assert!(outbox.is_empty());
}

#[test]
fn removing_the_soil_breaks_the_flower() {
    let (mut world, _) = stone_floor();
    let soil = BlockPos::new(3, 1, 3);
    let flower = soil.above();
    world.set_block(soil, block::DIRT);
    world.player_edit(flower, 1, block::ROSE);
    run_ticks(&mut world, 2);
    assert_eq!(world.get(flower), Some(block::ROSE));

    world.player_edit(soil, 0, block::AIR);
    world.tick();
    assert_eq!(world.get(flower), Some(block::AIR));
}

// ---------------------------------------------------------------------------
// Light
// ---------------------------------------------------------------------------

#[test]
fn mushroom_survives_only_in_shade() {
    let (mut world, _) = stone_floor();
    let covered = BlockPos::new(1, 1, 1);
    let open = BlockPos::new(5, 1, 5);
    world.set_block(covered, block::RED_MUSHROOM);
    world.set_block(BlockPos::new(1, 4, 1), block::STONE);
    world.set_block(open, block::BROWN_MUSHROOM);

    world.random_tick_at(covered);
    world.random_tick_at(open);

    assert_eq!(world.get(covered), Some(block::RED_MUSHROOM));
    assert_eq!(world.get(open), Some(block::AIR));
}

#[test]
fn flower_dies_in_shade() {
    let (mut world, _) = stone_floor();
    let soil = BlockPos::new(2, 1, 2);
    let flower = soil.above();
    world.set_block(soil, block::GRASS);
    world.set_block(flower, block::ROSE);

    world.random_tick_at(flower);
    assert_eq!(world.get(flower), Some(block::ROSE));

    world.set_block(BlockPos::new(2, 6, 2), block::GLASS);
    world.random_tick_at(flower);
    assert_eq!(world.get(flower), Some(block::AIR));
}

#[test]
fn leaves_let_grass_grow() {
    let (mut world, _) = stone_floor();
    let soil = BlockPos::new(6, 1, 6);
    world.set_block(soil, block::DIRT);
    world.set_block(soil.above(), block::LEAVES);
    world.random_tick_at(soil);
    assert_eq!(world.get(soil), Some(block::GRASS));
}

#[test]
fn sapling_in_open_sky_grows_a_trunk() {
    let dims = Dimensions::new(16, 16, 16).unwrap();
    let outbox = Arc::new(BroadcastQueue::new());
    let mut world = World::generate(dims, Arc::new(FlatGenerator), outbox).with_seed(3);
    let surface = FlatGenerator::surface(16) as i32;
    let sapling = BlockPos::new(8, surface + 1, 8);

    assert_eq!(world.player_edit(sapling, 1, block::SAPLING), Some(block::SAPLING));
    world.random_tick_at(sapling);

    assert_eq!(world.get(sapling), Some(block::LOG));
    assert_eq!(world.get(sapling.above()), Some(block::LOG));
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

#[test]
fn sand_falls_to_the_floor() {
    let (mut world, _) = stone_floor();
    world.set_block(BlockPos::new(1, 6, 1), block::SAND);
    run_ticks(&mut world, 10);

    assert_eq!(world.get(BlockPos::new(1, 1, 1)), Some(block::SAND));
    for y in 2..8 {
        assert_eq!(world.get(BlockPos::new(1, y, 1)), Some(block::AIR));
    }
}

#[test]
fn gravel_stack_settles_without_losing_blocks() {
    let (mut world, _) = stone_floor();
    world.set_block(BlockPos::new(3, 5, 3), block::GRAVEL);
    world.set_block(BlockPos::new(3, 6, 3), block::SAND);
    run_ticks(&mut world, 12);

    assert_eq!(world.get(BlockPos::new(3, 1, 3)), Some(block::GRAVEL));
    assert_eq!(world.get(BlockPos::new(3, 2, 3)), Some(block::SAND));
    assert_eq!(world.get(BlockPos::new(3, 3, 3)), Some(block::AIR));
}

#[test]
fn water_spreads_down_and_out_but_never_up() {
    let (mut world, _) = stone_floor();
    let source = BlockPos::new(3, 3, 3);
    world.set_block(source, block::WATER);

    world.tick();
    assert_eq!(world.get(source.below()), Some(block::WATER));
    assert_eq!(world.get(BlockPos::new(4, 3, 3)), Some(block::WATER));
    assert_eq!(world.get(source.above()), Some(block::AIR));

    run_ticks(&mut world, 40);
    assert_eq!(world.get(BlockPos::new(0, 1, 0)), Some(block::WATER));
    assert_eq!(world.get(BlockPos::new(7, 3, 7)), Some(block::WATER));
    assert_eq!(world.get(BlockPos::new(0, 4, 0)), Some(block::AIR));
    assert_eq!(world.pending_len(), 0);
}

#[test]
fn still_water_stays_put() {
    let (mut world, _) = stone_floor();
    let pool = BlockPos::new(3, 2, 3);
    world.set_block(pool, block::STILL_WATER);
    run_ticks(&mut world, 5);
    assert_eq!(world.get(pool.below()), Some(block::AIR));
}

#[test]
fn set_block_is_idempotent_on_the_grid() {
    let (mut world, outbox) = stone_floor();
    let pos = BlockPos::new(5, 3, 5);
    world.set_block(pos, block::BRICK);
    let once = world.grid().clone();
    world.set_block(pos, block::BRICK);
    assert_eq!(world.grid(), &once);
    assert_eq!(emitted(&outbox).len(), 2);
}
