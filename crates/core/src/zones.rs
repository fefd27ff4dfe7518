//! Body zones for attack targeting and blocking.

use strum::{Display, EnumIter, EnumString};

use crate::rng::CombatRng;

/// A body zone that can be attacked or covered by a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Zone {
    Head,
    Chest,
    Belly,
    Legs,
    Feet,
}

/// All zones in top-to-bottom order. Also the glyph order of the visual bar.
pub const ZONES: [Zone; 5] = [Zone::Head, Zone::Chest, Zone::Belly, Zone::Legs, Zone::Feet];

/// The five valid block pairs: adjacent zones on the body ring.
pub const BLOCK_PAIRS: [[Zone; 2]; 5] = [
    [Zone::Head, Zone::Chest],
    [Zone::Chest, Zone::Belly],
    [Zone::Belly, Zone::Legs],
    [Zone::Legs, Zone::Feet],
    [Zone::Feet, Zone::Head],
];

/// Check that a manually specified block is one of the five valid pairs.
///
/// Order within the pair does not matter.
pub fn is_valid_block_pair(zones: &[Zone]) -> bool {
    if zones.len() != 2 || zones[0] == zones[1] {
        return false;
    }
    BLOCK_PAIRS
        .iter()
        .any(|pair| pair.contains(&zones[0]) && pair.contains(&zones[1]))
}

/// The conservative pair substituted for invalid blocks and forced passives.
pub fn canonical_block_pair() -> [Zone; 2] {
    [Zone::Head, Zone::Chest]
}

/// Pick one attack zone uniformly.
pub fn random_attack_zone(rng: &mut CombatRng) -> Zone {
    ZONES[rng.pick_index(ZONES.len())]
}

/// Pick one of the five valid block pairs uniformly.
pub fn random_block_pair(rng: &mut CombatRng) -> [Zone; 2] {
    BLOCK_PAIRS[rng.pick_index(BLOCK_PAIRS.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_five_valid_pairs() {
        for pair in BLOCK_PAIRS {
            assert!(is_valid_block_pair(&pair));
            // order-insensitive
            assert!(is_valid_block_pair(&[pair[1], pair[0]]));
        }
    }

    #[test]
    fn rejects_non_adjacent_and_malformed() {
        assert!(!is_valid_block_pair(&[Zone::Head, Zone::Belly]));
        assert!(!is_valid_block_pair(&[Zone::Chest, Zone::Feet]));
        assert!(!is_valid_block_pair(&[Zone::Head, Zone::Head]));
        assert!(!is_valid_block_pair(&[Zone::Head]));
        assert!(!is_valid_block_pair(&[Zone::Head, Zone::Chest, Zone::Belly]));
    }

    #[test]
    fn random_picks_stay_in_domain() {
        let mut rng = CombatRng::new(11);
        for _ in 0..50 {
            assert!(ZONES.contains(&random_attack_zone(&mut rng)));
            assert!(is_valid_block_pair(&random_block_pair(&mut rng)));
        }
    }

    #[test]
    fn zone_names_are_snake_case() {
        assert_eq!(Zone::Head.to_string(), "head");
        assert_eq!("feet".parse::<Zone>().unwrap(), Zone::Feet);
    }
}
