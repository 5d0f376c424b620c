pub mod block_updates;
pub mod helpers;

use classic_engine::rules::RuleSet;

/// The standard classic rule set: fluid spread, plant support, gravity.
pub fn standard() -> RuleSet {
    let mut rules = RuleSet::new();
    rules.add(block_updates::fluid_spread);
    rules.add(block_updates::plant_support);
    rules.add(block_updates::gravity);
    rules
}
