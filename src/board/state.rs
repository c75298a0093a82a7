//! Board state.
//!
//! An immutable snapshot of every space on the board. Mutation helpers
//! return a new board, rewriting only the affected coordinate entries; the
//! untouched spaces are carried over unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::coord::{BoardSize, Coordinate};
use super::facing::Facing;
use super::geometry;
use super::space::{Space, UnitPresence};
use super::unit::{PlayerSide, UnitInstance};
use crate::error::EngineError;

/// A unit's position and orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub coord: Coordinate,
    pub facing: Facing,
}

impl Placement {
    pub const fn new(coord: Coordinate, facing: Facing) -> Self {
        Placement { coord, facing }
    }
}

/// Complete board snapshot: one [`Space`] per coordinate of the board size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    size: BoardSize,
    spaces: HashMap<Coordinate, Space>,
}

impl BoardState {
    /// Creates a board of the given size with open plains everywhere.
    pub fn empty(size: BoardSize) -> BoardState {
        let spaces = size
            .all_coords()
            .into_iter()
            .map(|c| (c, Space::open()))
            .collect();
        BoardState { size, spaces }
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    /// Looks up a space, or errors when the coordinate is off this board.
    pub fn space(&self, coord: Coordinate) -> Result<&Space, EngineError> {
        self.spaces.get(&coord).ok_or(EngineError::OffBoard(coord))
    }

    /// The unit presence at a coordinate.
    pub fn presence(&self, coord: Coordinate) -> Result<&UnitPresence, EngineError> {
        Ok(&self.space(coord)?.presence)
    }

    /// Returns a new board with the space at `coord` replaced.
    pub fn with_space(&self, coord: Coordinate, space: Space) -> Result<BoardState, EngineError> {
        if !self.size.contains(coord) {
            return Err(EngineError::OffBoard(coord));
        }
        let mut next = self.clone();
        next.spaces.insert(coord, space);
        Ok(next)
    }

    /// Returns a new board with the presence at `coord` replaced.
    pub fn with_presence(
        &self,
        coord: Coordinate,
        presence: UnitPresence,
    ) -> Result<BoardState, EngineError> {
        let mut space = self.space(coord)?.clone();
        space.presence = presence;
        self.with_space(coord, space)
    }

    /// Places a lone unit. Errors if the space is not empty.
    pub fn place_unit(
        &self,
        coord: Coordinate,
        unit: UnitInstance,
        facing: Facing,
    ) -> Result<BoardState, EngineError> {
        if !self.presence(coord)?.is_empty() {
            return Err(EngineError::Inconsistent("placing a unit on an occupied space"));
        }
        self.with_presence(coord, UnitPresence::Single { unit, facing })
    }

    /// Removes a unit from the board. An engaged partner is left standing
    /// alone with its effective facing.
    pub fn remove_unit(&self, unit: &UnitInstance) -> Result<BoardState, EngineError> {
        let placement = self.find_unit(unit).ok_or(EngineError::UnitNotFound(*unit))?;
        let next = match self.presence(placement.coord)? {
            UnitPresence::Single { .. } => UnitPresence::Empty,
            UnitPresence::Engaged {
                primary,
                primary_facing,
                secondary,
            } => {
                if primary == unit {
                    UnitPresence::Single {
                        unit: *secondary,
                        facing: primary_facing.opposite(),
                    }
                } else {
                    UnitPresence::Single {
                        unit: *primary,
                        facing: *primary_facing,
                    }
                }
            }
            UnitPresence::Empty => {
                return Err(EngineError::Inconsistent("removing from an empty space"))
            }
        };
        self.with_presence(placement.coord, next)
    }

    /// Adds a commander marker to a space.
    pub fn with_commander(
        &self,
        coord: Coordinate,
        side: PlayerSide,
    ) -> Result<BoardState, EngineError> {
        let mut space = self.space(coord)?.clone();
        space.commanders.push(side);
        self.with_space(coord, space)
    }

    /// Moves one commander of `side` between spaces.
    pub fn move_commander(
        &self,
        side: PlayerSide,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<BoardState, EngineError> {
        let mut origin = self.space(from)?.clone();
        let pos = origin
            .commanders
            .iter()
            .position(|s| *s == side)
            .ok_or(EngineError::Inconsistent("no such commander to move"))?;
        origin.commanders.remove(pos);
        let mut dest = self.space(to)?.clone();
        dest.commanders.push(side);
        let mut next = self.clone();
        next.spaces.insert(from, origin);
        next.spaces.insert(to, dest);
        Ok(next)
    }

    /// Finds a unit's placement. An engaged secondary reports its derived
    /// facing.
    pub fn find_unit(&self, unit: &UnitInstance) -> Option<Placement> {
        for (coord, space) in &self.spaces {
            match &space.presence {
                UnitPresence::Single { unit: u, facing } if u == unit => {
                    return Some(Placement::new(*coord, *facing));
                }
                UnitPresence::Engaged {
                    primary,
                    primary_facing,
                    secondary,
                } => {
                    if primary == unit {
                        return Some(Placement::new(*coord, *primary_facing));
                    }
                    if secondary == unit {
                        return Some(Placement::new(*coord, primary_facing.opposite()));
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// All units of one side with their placements, row-major order.
    pub fn units_of(&self, side: PlayerSide) -> Vec<(UnitInstance, Placement)> {
        let mut out = Vec::new();
        for coord in self.size.all_coords() {
            let space = &self.spaces[&coord];
            match &space.presence {
                UnitPresence::Single { unit, facing } if unit.side == side => {
                    out.push((*unit, Placement::new(coord, *facing)));
                }
                UnitPresence::Engaged {
                    primary,
                    primary_facing,
                    secondary,
                } => {
                    if primary.side == side {
                        out.push((*primary, Placement::new(coord, *primary_facing)));
                    }
                    if secondary.side == side {
                        out.push((*secondary, Placement::new(coord, primary_facing.opposite())));
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// All engaged coordinates, row-major order.
    pub fn engaged_coords(&self) -> Vec<Coordinate> {
        self.size
            .all_coords()
            .into_iter()
            .filter(|c| matches!(self.spaces[c].presence, UnitPresence::Engaged { .. }))
            .collect()
    }

    /// Positions of every commander marker of one side.
    pub fn commander_coords(&self, side: PlayerSide) -> Vec<Coordinate> {
        let mut out = Vec::new();
        for coord in self.size.all_coords() {
            for s in &self.spaces[&coord].commanders {
                if *s == side {
                    out.push(coord);
                }
            }
        }
        out
    }

    /// Chebyshev distance from a coordinate to the nearest commander of the
    /// side, or `None` when the side has no commander on the board.
    pub fn distance_to_commander(&self, side: PlayerSide, coord: Coordinate) -> Option<u8> {
        self.commander_coords(side)
            .into_iter()
            .map(|c| geometry::distance(coord, c))
            .min()
    }
}
