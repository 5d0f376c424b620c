use crate::world::block::BlockId;
use crate::world::grid::VoxelGrid;
use crate::world::position::BlockPos;

/// A single cell write requested by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub pos: BlockPos,
    pub block: BlockId,
}

impl Edit {
    pub const fn new(pos: BlockPos, block: BlockId) -> Self {
        Self { pos, block }
    }
}

/// A rule function: given the current grid and a cell that was scheduled for
/// re-evaluation, produce zero or more edits.
///
/// Rules must be **local**: they only read cells in a bounded neighborhood
/// of `pos`. They never write; the caller applies the edits in order.
pub type RuleFn = fn(&VoxelGrid, BlockPos) -> Vec<Edit>;

/// An ordered collection of rules. When a cell is re-evaluated, every rule
/// is consulted; their outputs are concatenated in registration order.
pub struct RuleSet {
    rules: Vec<RuleFn>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add(&mut self, rule: RuleFn) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn evaluate(&self, grid: &VoxelGrid, pos: BlockPos) -> Vec<Edit> {
        let mut out = Vec::new();
        for rule in &self.rules {
            out.extend(rule(grid, pos));
        }
        out
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}
