//! Spaces and unit presence.
//!
//! A space carries static terrain data (terrain kind, four corner
//! elevations, per-edge water cover) plus the dynamic unit presence and the
//! set of commanders standing in it. Terrain does not yet modify stats.

use serde::{Deserialize, Serialize};

use super::facing::Facing;
use super::unit::{PlayerSide, UnitInstance};

/// Terrain kind of a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Terrain {
    Plains,
    Forest,
    Hill,
    Marsh,
}

/// The four edges of a space, used for water-cover flags.
/// Order in the per-edge arrays: north, east, south, west.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Edge {
    North,
    East,
    South,
    West,
}

impl Edge {
    const fn index(self) -> usize {
        match self {
            Edge::North => 0,
            Edge::East => 1,
            Edge::South => 2,
            Edge::West => 3,
        }
    }
}

/// What stands in a space.
///
/// The engaged variant stores only the primary unit's facing; the
/// secondary's facing is always the exact opposite and is derived, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitPresence {
    Empty,
    Single {
        unit: UnitInstance,
        facing: Facing,
    },
    Engaged {
        primary: UnitInstance,
        primary_facing: Facing,
        secondary: UnitInstance,
    },
}

impl UnitPresence {
    /// The secondary unit's effective facing in an engagement.
    pub fn secondary_facing(&self) -> Option<Facing> {
        match self {
            UnitPresence::Engaged { primary_facing, .. } => Some(primary_facing.opposite()),
            _ => None,
        }
    }

    /// Returns the single occupant, if any.
    pub fn single(&self) -> Option<(UnitInstance, Facing)> {
        match self {
            UnitPresence::Single { unit, facing } => Some((*unit, *facing)),
            _ => None,
        }
    }

    /// Returns true when the space holds no unit at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, UnitPresence::Empty)
    }

    /// Returns true when the given unit stands here (alone or engaged).
    pub fn contains(&self, unit: &UnitInstance) -> bool {
        match self {
            UnitPresence::Empty => false,
            UnitPresence::Single { unit: u, .. } => u == unit,
            UnitPresence::Engaged {
                primary, secondary, ..
            } => primary == unit || secondary == unit,
        }
    }
}

/// One board space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub terrain: Terrain,
    /// Corner elevations 0-5, clockwise from north-west.
    pub elevation: [u8; 4],
    /// Water cover per edge, indexed north/east/south/west.
    pub water_edges: [bool; 4],
    pub presence: UnitPresence,
    /// Commanders standing in this space.
    pub commanders: Vec<PlayerSide>,
}

impl Space {
    /// A flat, dry, empty plains space.
    pub fn open() -> Space {
        Space {
            terrain: Terrain::Plains,
            elevation: [0; 4],
            water_edges: [false; 4],
            presence: UnitPresence::Empty,
            commanders: Vec::new(),
        }
    }

    pub fn has_water_on(&self, edge: Edge) -> bool {
        self.water_edges[edge.index()]
    }

    pub fn has_commander(&self, side: PlayerSide) -> bool {
        self.commanders.contains(&side)
    }
}
