//! Per-stat source layers.

use std::collections::BTreeMap;

use super::rules::CombineRule;

/// Contribution layers for one stat key.
///
/// Four flat layers plus named percent bonuses. How the layers fold into a
/// total depends on the stat's [`CombineRule`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StatSourceData {
    /// Persisted character stat.
    pub base: f64,
    /// Per-item contributions, keyed by item name.
    pub equipment: BTreeMap<String, f64>,
    /// Contribution from trained abilities.
    pub skills: f64,
    /// Named transient additive bonuses.
    pub buffs_flat: BTreeMap<String, f64>,
    /// Named transient multiplicative bonuses (fractions).
    pub buffs_percent: BTreeMap<String, f64>,
}

impl StatSourceData {
    /// Sum of the four flat layers.
    pub fn flat_sum(&self) -> f64 {
        self.base
            + self.equipment.values().sum::<f64>()
            + self.skills
            + self.buffs_flat.values().sum::<f64>()
    }

    /// Fold the layers into a total according to the stat's rule.
    pub fn combine(&self, rule: CombineRule) -> f64 {
        let flat = self.flat_sum();
        match rule {
            CombineRule::Flat => flat,
            CombineRule::Additive => {
                flat * (1.0 + self.buffs_percent.values().sum::<f64>())
            }
            CombineRule::Multiplicative => self
                .buffs_percent
                .values()
                .fold(flat, |acc, pct| acc * (1.0 + pct)),
        }
    }

    /// Flatten every contributing layer into label → amount, for the
    /// `sources` breakdown of the aggregated map.
    pub fn labelled_sources(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        if self.base != 0.0 {
            out.insert("base".to_string(), self.base);
        }
        for (item, amount) in &self.equipment {
            out.insert(item.clone(), *amount);
        }
        if self.skills != 0.0 {
            out.insert("skills".to_string(), self.skills);
        }
        for (name, amount) in &self.buffs_flat {
            out.insert(name.clone(), *amount);
        }
        out
    }
}
