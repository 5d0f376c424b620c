//! Voxel substrate shared by the classic server.
//!
//! The engine knows nothing about specific block types: it stores opaque
//! [`world::block::BlockId`]s in a flat grid, tracks which cells need
//! re-evaluation, and runs pluggable rules over them.

pub mod rules;
pub mod updates;
pub mod world;
