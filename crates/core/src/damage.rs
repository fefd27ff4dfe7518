//! Damage types and their stat-key prefixes.

use strum::{Display, EnumIter, EnumString};

/// Damage type carried by a move or forced by an ability.
///
/// Physical and magical are the two core types with their own full stat sets.
/// Every other type belongs to the magical category: where a type-specific
/// stat is absent, lookup falls back to the `magical_*` stat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DamageType {
    Physical,
    Magical,
    Fire,
    Cold,
    Lightning,
    Poison,
}

/// The two stat categories damage types roll up into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageCategory {
    Physical,
    Magical,
}

impl DamageType {
    pub fn is_physical(self) -> bool {
        self == DamageType::Physical
    }

    /// Category used for fallback stats and anti-crit lookup.
    pub fn category(self) -> DamageCategory {
        match self {
            DamageType::Physical => DamageCategory::Physical,
            _ => DamageCategory::Magical,
        }
    }

    /// Prefix for type-specific stat keys, e.g. `fire` in `fire_damage_power`.
    pub fn stat_prefix(self) -> &'static str {
        match self {
            DamageType::Physical => "physical",
            DamageType::Magical => "magical",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Poison => "poison",
        }
    }
}

impl DamageCategory {
    pub fn stat_prefix(self) -> &'static str {
        match self {
            DamageCategory::Physical => "physical",
            DamageCategory::Magical => "magical",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_core_types_are_magical_category() {
        assert_eq!(DamageType::Fire.category(), DamageCategory::Magical);
        assert_eq!(DamageType::Poison.category(), DamageCategory::Magical);
        assert_eq!(DamageType::Physical.category(), DamageCategory::Physical);
    }

    #[test]
    fn prefixes_match_wire_names() {
        assert_eq!(DamageType::Lightning.stat_prefix(), "lightning");
        assert_eq!("fire".parse::<DamageType>().unwrap(), DamageType::Fire);
    }
}
