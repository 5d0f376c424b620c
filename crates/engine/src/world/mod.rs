//! The spatial substrate: a fixed-size cuboid of block cells.
//!
//! Time lives elsewhere. Rules and the update queue decide *when* a cell is
//! looked at again; this module only answers "what is at (x, y, z)".

pub mod block;
pub mod grid;
pub mod position;

pub use block::BlockId;
pub use grid::VoxelGrid;
pub use position::{BlockPos, Dimensions};
