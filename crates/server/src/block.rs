//! Classic block type definitions and property lookups.
//!
//! BlockId values are the protocol's block bytes, so they can be used
//! directly in level data and SetBlock packets without any mapping layer.

use classic_engine::world::block::BlockId;

pub const AIR: BlockId = BlockId(0);
pub const STONE: BlockId = BlockId(1);
pub const GRASS: BlockId = BlockId(2);
pub const DIRT: BlockId = BlockId(3);
pub const COBBLESTONE: BlockId = BlockId(4);
pub const PLANKS: BlockId = BlockId(5);
pub const SAPLING: BlockId = BlockId(6);
pub const BEDROCK: BlockId = BlockId(7);
pub const WATER: BlockId = BlockId(8);
pub const STILL_WATER: BlockId = BlockId(9);
pub const LAVA: BlockId = BlockId(10);
pub const STILL_LAVA: BlockId = BlockId(11);
pub const SAND: BlockId = BlockId(12);
pub const GRAVEL: BlockId = BlockId(13);
pub const GOLD_ORE: BlockId = BlockId(14);
pub const IRON_ORE: BlockId = BlockId(15);
pub const COAL_ORE: BlockId = BlockId(16);
pub const LOG: BlockId = BlockId(17);
pub const LEAVES: BlockId = BlockId(18);
pub const SPONGE: BlockId = BlockId(19);
pub const GLASS: BlockId = BlockId(20);
// 21..=36 are the sixteen cloth colours.
pub const WHITE_CLOTH: BlockId = BlockId(36);
pub const DANDELION: BlockId = BlockId(37);
pub const ROSE: BlockId = BlockId(38);
pub const BROWN_MUSHROOM: BlockId = BlockId(39);
pub const RED_MUSHROOM: BlockId = BlockId(40);
pub const GOLD_BLOCK: BlockId = BlockId(41);
pub const IRON_BLOCK: BlockId = BlockId(42);
pub const DOUBLE_SLAB: BlockId = BlockId(43);
pub const SLAB: BlockId = BlockId(44);
pub const BRICK: BlockId = BlockId(45);
pub const TNT: BlockId = BlockId(46);
pub const BOOKSHELF: BlockId = BlockId(47);
pub const MOSSY_COBBLESTONE: BlockId = BlockId(48);
pub const OBSIDIAN: BlockId = BlockId(49);

/// Highest block id a classic client knows about.
pub const MAX_BLOCK: BlockId = OBSIDIAN;

/// Is this a block id the protocol defines?
pub fn is_valid(id: BlockId) -> bool {
    id.0 <= MAX_BLOCK.0
}

pub fn is_flower(id: BlockId) -> bool {
    id == DANDELION || id == ROSE
}

pub fn is_mushroom(id: BlockId) -> bool {
    id == BROWN_MUSHROOM || id == RED_MUSHROOM
}

/// Saplings and flowers: need grass or dirt underneath.
pub fn is_plant(id: BlockId) -> bool {
    id == SAPLING || is_flower(id)
}

/// Does this block fall under gravity?
pub fn has_gravity(id: BlockId) -> bool {
    id == SAND || id == GRAVEL
}

/// Any water or lava, flowing or still.
pub fn is_fluid(id: BlockId) -> bool {
    matches!(id, WATER | STILL_WATER | LAVA | STILL_LAVA)
}

/// Fluids that actively spread into neighbouring air.
pub fn is_flowing(id: BlockId) -> bool {
    id == WATER || id == LAVA
}

/// Does light pass through this block? A column is dark as soon as one
/// block above fails this test.
pub fn lets_light_through(id: BlockId) -> bool {
    id == AIR || is_plant(id) || is_mushroom(id) || id == LEAVES
}

pub fn can_support_plant(below: BlockId) -> bool {
    below == GRASS || below == DIRT
}

pub fn can_support_mushroom(below: BlockId) -> bool {
    below == STONE || below == COBBLESTONE || below == GRAVEL
}

/// Is `block` allowed to stand on `below`? `None` means there is no block
/// underneath (the bottom layer of the world).
pub fn is_supported(block: BlockId, below: Option<BlockId>) -> bool {
    if is_plant(block) {
        below.is_some_and(can_support_plant)
    } else if is_mushroom(block) {
        below.is_some_and(can_support_mushroom)
    } else {
        true
    }
}

/// Placement legality for player edits.
pub fn can_place(block: BlockId, below: Option<BlockId>) -> bool {
    is_valid(block) && is_supported(block, below)
}
