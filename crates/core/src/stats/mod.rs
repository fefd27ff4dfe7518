//! Layered stat system: sources, combine rules, and aggregation.
//!
//! A combatant's working stat set is assembled from four flat layers (base,
//! equipment, trained skills, named flat buffs) plus named percent buffs,
//! folded per stat key by a static rule table, then extended with derived
//! modifiers computed from attribute totals. The aggregator is pure and
//! idempotent; its output is the only stat shape the calculator reads.

mod aggregate;
pub mod keys;
mod rules;
mod source;

pub use aggregate::{AggregateInput, AggregatedStats, Buff, ItemKind, ItemSpec, StatValue, aggregate};
pub use rules::{CombineRule, MODIFIER_RULES, cap_for, rule_for};
pub use source::StatSourceData;
