//! Unit types and instances.
//!
//! A unit's stat block and traits live in the injected catalogue keyed by
//! [`UnitTypeId`]; the board only carries [`UnitInstance`] values. Instance
//! identity is structural (side + type + instance number), never by
//! reference: two independently constructed instances with equal fields
//! denote the same unit.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerSide {
    Red,
    Blue,
}

/// Both sides, red first.
pub const ALL_SIDES: [PlayerSide; 2] = [PlayerSide::Red, PlayerSide::Blue];

impl PlayerSide {
    /// Returns the other side.
    pub const fn opponent(self) -> PlayerSide {
        match self {
            PlayerSide::Red => PlayerSide::Blue,
            PlayerSide::Blue => PlayerSide::Red,
        }
    }
}

impl fmt::Display for PlayerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerSide::Red => write!(f, "red"),
            PlayerSide::Blue => write!(f, "blue"),
        }
    }
}

/// A pair of per-side values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub red: T,
    pub blue: T,
}

impl<T> PerSide<T> {
    pub fn new(red: T, blue: T) -> Self {
        PerSide { red, blue }
    }

    /// Builds both entries from the same constructor.
    pub fn from_fn(mut f: impl FnMut(PlayerSide) -> T) -> Self {
        PerSide {
            red: f(PlayerSide::Red),
            blue: f(PlayerSide::Blue),
        }
    }

    pub fn get(&self, side: PlayerSide) -> &T {
        match side {
            PlayerSide::Red => &self.red,
            PlayerSide::Blue => &self.blue,
        }
    }

    pub fn get_mut(&mut self, side: PlayerSide) -> &mut T {
        match side {
            PlayerSide::Red => &mut self.red,
            PlayerSide::Blue => &mut self.blue,
        }
    }
}

/// A combat-relevant trait a unit type can carry; restriction lists on card
/// modifiers match against these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitTrait {
    Infantry,
    Cavalry,
    Missile,
    Shielded,
    Skirmish,
}

/// Catalogue key for a unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitTypeId(pub u16);

impl fmt::Display for UnitTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// A ranged attack profile: attack value and maximum range in spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangedProfile {
    pub value: u8,
    pub range: u8,
}

/// Base stat block for a unit type. The rout/retreat/reverse values are the
/// attack thresholds at which each consequence triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    pub attack: u8,
    pub ranged: Option<RangedProfile>,
    pub speed: u8,
    pub flexibility: u8,
    pub rout: u8,
    pub retreat: u8,
    pub reverse: u8,
}

/// A unit type definition as stored in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTypeDef {
    pub name: String,
    pub stats: UnitStats,
    pub traits: Vec<UnitTrait>,
}

impl UnitTypeDef {
    pub fn has_trait(&self, t: UnitTrait) -> bool {
        self.traits.contains(&t)
    }
}

/// A specific unit on the board. Equality and hashing are derived, so value
/// identity holds across independently constructed copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitInstance {
    pub side: PlayerSide,
    pub unit_type: UnitTypeId,
    pub number: u8,
}

impl UnitInstance {
    pub const fn new(side: PlayerSide, unit_type: UnitTypeId, number: u8) -> Self {
        UnitInstance {
            side,
            unit_type,
            number,
        }
    }
}

impl fmt::Display for UnitInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.side, self.unit_type, self.number)
    }
}
