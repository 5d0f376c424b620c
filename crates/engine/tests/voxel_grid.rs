//! Grid indexing and rule-set tests that exercise the engine without any
//! game-specific block semantics. All block values are opaque `BlockId`s.

use std::collections::HashSet;

use classic_engine::rules::{Edit, RuleSet};
use classic_engine::world::grid::HEADER_LEN;
use classic_engine::world::{BlockId, BlockPos, Dimensions, VoxelGrid};

// ---------------------------------------------------------------------------
// Indexing
// ---------------------------------------------------------------------------

#[test]
fn index_is_injective_over_the_cuboid() {
    let dims = Dimensions::new(7, 5, 3).unwrap();
    let grid = VoxelGrid::new(dims);

    let mut seen = HashSet::new();
    for pos in grid.positions() {
        let idx = grid.index(pos).expect("in-bounds position has an index");
        assert!(idx >= HEADER_LEN && idx < HEADER_LEN + dims.volume());
        assert!(seen.insert(idx), "index collision at {:?}", pos);
    }
    assert_eq!(seen.len(), dims.volume());
}

#[test]
fn index_matches_documented_layout() {
    let grid = VoxelGrid::new(Dimensions::new(16, 8, 4).unwrap());
    // y*Z*X + z*X + x + 4
    assert_eq!(grid.index(BlockPos::new(3, 2, 1)), Some(2 * 4 * 16 + 16 + 3 + 4));
}

#[test]
fn out_of_range_positions_have_no_index() {
    let grid = VoxelGrid::new(Dimensions::new(4, 4, 4).unwrap());
    for pos in [
        BlockPos::new(-1, 0, 0),
        BlockPos::new(0, -1, 0),
        BlockPos::new(0, 0, -1),
        BlockPos::new(4, 0, 0),
        BlockPos::new(0, 4, 0),
        BlockPos::new(0, 0, 4),
        BlockPos::new(i32::MAX, i32::MAX, i32::MAX),
    ] {
        assert_eq!(grid.index(pos), None, "{:?} should be rejected", pos);
        assert_eq!(grid.get(pos), None);
    }
}

#[test]
fn dimensions_reject_empty_and_oversized_axes() {
    assert!(Dimensions::new(0, 64, 256).is_none());
    assert!(Dimensions::new(256, 64, Dimensions::MAX_AXIS + 1).is_none());
    assert_eq!(Dimensions::new(256, 64, 256), Some(Dimensions::LEGACY));
}

#[test]
fn clear_keeps_header() {
    let dims = Dimensions::new(3, 3, 3).unwrap();
    let mut grid = VoxelGrid::new(dims);
    grid.fill(BlockId(5));
    assert!(grid.payload().iter().all(|&b| b == 5));
    grid.clear();
    assert!(grid.payload().iter().all(|&b| b == 0));
    assert_eq!(&grid.as_bytes()[..HEADER_LEN], &27u32.to_be_bytes());
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

fn copy_up(grid: &VoxelGrid, pos: BlockPos) -> Vec<Edit> {
    match grid.get(pos) {
        Some(b) if b != BlockId::AIR => vec![Edit::new(pos.above(), b)],
        _ => Vec::new(),
    }
}

fn mark_origin(_grid: &VoxelGrid, pos: BlockPos) -> Vec<Edit> {
    vec![Edit::new(pos, BlockId(9))]
}

#[test]
fn rules_are_evaluated_in_registration_order() {
    let mut grid = VoxelGrid::new(Dimensions::new(2, 2, 2).unwrap());
    grid.set(BlockPos::new(0, 0, 0), BlockId(1));

    let mut rules = RuleSet::new();
    rules.add(copy_up);
    rules.add(mark_origin);

    let edits = rules.evaluate(&grid, BlockPos::new(0, 0, 0));
    assert_eq!(
        edits,
        vec![
            Edit::new(BlockPos::new(0, 1, 0), BlockId(1)),
            Edit::new(BlockPos::new(0, 0, 0), BlockId(9)),
        ]
    );
}

#[test]
fn empty_rule_set_produces_nothing() {
    let grid = VoxelGrid::new(Dimensions::new(2, 2, 2).unwrap());
    assert!(RuleSet::new().evaluate(&grid, BlockPos::new(0, 0, 0)).is_empty());
}
