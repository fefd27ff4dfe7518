//! Skill XP outcomes and amounts.
//!
//! Each exchange registers at most one XP signal per skill family per side:
//! offence under the weapon family, defence under the struck armour's
//! subtype, and the shield family on a successful block. The runtime buffers
//! amounts per family and flushes the buffer to durable storage exactly once,
//! at finalization.

use strum::{Display, EnumString};

/// Family credited for attacking.
pub const OFFENCE_FAMILY: &str = "sword";

/// Family credited for a successful block.
pub const SHIELD_FAMILY: &str = "shield";

/// Outcome classification of one directional exchange result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum XpOutcome {
    /// Damage landed cleanly.
    Success,
    /// Damage landed but was blocked down.
    Partial,
    /// The attack was avoided entirely.
    Miss,
    /// A critical landed.
    Crit,
}

/// XP credited for one outcome.
pub fn xp_amount(outcome: XpOutcome) -> u32 {
    match outcome {
        XpOutcome::Success => 2,
        XpOutcome::Partial => 1,
        XpOutcome::Miss => 1,
        XpOutcome::Crit => 3,
    }
}
