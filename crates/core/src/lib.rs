//! Deterministic combat math shared by the runtime and offline tools.
//!
//! `rbc-core` defines the canonical rules of an exchange: body zones, tokens,
//! damage types, the layered stat aggregator, the ability registry, and the
//! hit-resolution pipeline. Everything here is pure - no I/O, no clocks, no
//! global state - and reproducible under a seeded [`rng::CombatRng`], so the
//! runtime can replay any exchange and tests can pin every roll.
pub mod abilities;
pub mod calc;
pub mod config;
pub mod damage;
pub mod rng;
pub mod stats;
pub mod tokens;
pub mod xp;
pub mod zones;

pub use abilities::{AbilityCost, AbilitySpec, PostHook, PreHook};
pub use calc::{AbilityFlags, BlockKind, HitResult, resolve_hit};
pub use config::CombatTables;
pub use damage::{DamageCategory, DamageType};
pub use rng::CombatRng;
pub use stats::{
    AggregateInput, AggregatedStats, Buff, CombineRule, ItemKind, ItemSpec, StatSourceData,
    StatValue, aggregate,
};
pub use tokens::{TokenCounts, TokenKind};
pub use xp::{OFFENCE_FAMILY, SHIELD_FAMILY, XpOutcome, xp_amount};
pub use zones::{BLOCK_PAIRS, ZONES, Zone, canonical_block_pair, is_valid_block_pair,
    random_attack_zone, random_block_pair};
