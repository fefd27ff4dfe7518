//! Hit resolution output.

use crate::tokens::TokenCounts;

/// How a block came about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BlockKind {
    /// Probabilistic shield block; short-circuits the rest of the pipeline
    /// after its own damage reduction.
    Passive,
    /// Zone overlap between attack and block; demotes damage after the crit
    /// roll instead of short-circuiting.
    Geo,
}

/// Everything one directional hit resolution produced.
///
/// The calculator never mutates its inputs; the caller applies every field
/// of this record to session state.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitResult {
    /// Final damage after every stage.
    pub damage_total: i64,
    /// Portion absorbed by the defender's energy shield.
    pub shield_dmg: i64,
    /// Portion that reached hit points.
    pub hp_dmg: i64,
    pub is_crit: bool,
    pub is_blocked: bool,
    pub block: Option<BlockKind>,
    pub is_dodged: bool,
    pub is_parried: bool,
    pub is_counter: bool,
    /// HP returned to the attacker by vampirism.
    pub lifesteal: i64,
    /// Damage reflected onto the attacker.
    pub thorns_damage: i64,
    /// Five glyphs, one per zone head→feet, summarising the outcome.
    pub visual_bar: String,
    /// Tokens earned by the attacker.
    pub tokens_atk: TokenCounts,
    /// Tokens earned by the defender.
    pub tokens_def: TokenCounts,
    /// Free-form narration fragments for the combat log.
    pub logs: Vec<String>,
}

impl HitResult {
    /// Whether any damage landed on shield or HP.
    pub fn landed(&self) -> bool {
        self.shield_dmg + self.hp_dmg > 0
    }
}
