//! Combat tokens: per-fight markers earned on specific outcomes.
//!
//! Tokens are minted only by the hit calculator and spent only by abilities,
//! so the sum of emitted deltas always equals the sum applied to containers.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Marker kinds a combatant can earn during a fight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TokenKind {
    Hit,
    Crit,
    Block,
    Parry,
    Counter,
}

/// Per-kind token counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TokenCounts {
    pub hit: u32,
    pub crit: u32,
    pub block: u32,
    pub parry: u32,
    pub counter: u32,
}

impl TokenCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: TokenKind) -> u32 {
        match kind {
            TokenKind::Hit => self.hit,
            TokenKind::Crit => self.crit,
            TokenKind::Block => self.block,
            TokenKind::Parry => self.parry,
            TokenKind::Counter => self.counter,
        }
    }

    pub fn add(&mut self, kind: TokenKind, count: u32) {
        let slot = match kind {
            TokenKind::Hit => &mut self.hit,
            TokenKind::Crit => &mut self.crit,
            TokenKind::Block => &mut self.block,
            TokenKind::Parry => &mut self.parry,
            TokenKind::Counter => &mut self.counter,
        };
        *slot += count;
    }

    /// Remove `count` tokens of `kind`; false if the stock is short.
    pub fn spend(&mut self, kind: TokenKind, count: u32) -> bool {
        let slot = match kind {
            TokenKind::Hit => &mut self.hit,
            TokenKind::Crit => &mut self.crit,
            TokenKind::Block => &mut self.block,
            TokenKind::Parry => &mut self.parry,
            TokenKind::Counter => &mut self.counter,
        };
        if *slot < count {
            return false;
        }
        *slot -= count;
        true
    }

    /// Fold another delta into this one.
    pub fn merge(&mut self, other: &TokenCounts) {
        for kind in TokenKind::iter() {
            self.add(kind, other.get(kind));
        }
    }

    pub fn total(&self) -> u32 {
        TokenKind::iter().map(|k| self.get(k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
