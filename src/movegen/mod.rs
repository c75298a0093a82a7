//! Legal-move generation.
//!
//! Movement exploration, engagement legality, and retreat computation. The
//! per-unit queries are pure; [`legal_moves_for_side`] fans the query across
//! a side's units in parallel.

pub mod engage;
pub mod explore;
pub mod retreat;

use rayon::prelude::*;

use crate::board::{Placement, PlayerSide, UnitInstance};
use crate::cards::Catalog;
use crate::error::EngineError;
use crate::state::GameState;

pub use engage::{can_engage_enemy, EngagementOutcome};
pub use explore::{explore, MoveDirection, Reachable, MIN_COMBINED_FLEXIBILITY};
pub use retreat::legal_retreats;

/// Lists the legal advance destinations for a unit at its current placement,
/// engagements included.
pub fn legal_moves(
    state: &GameState,
    catalog: &Catalog,
    unit: &UnitInstance,
) -> Result<Vec<Reachable>, EngineError> {
    let placement = state
        .board
        .find_unit(unit)
        .ok_or(EngineError::UnitNotFound(*unit))?;
    explore(state, catalog, unit, placement, MoveDirection::Advance)
}

/// Lists the legal advance destinations of every unit of a side, computed in
/// parallel. Engaged units are skipped: they cannot be ordered to move.
pub fn legal_moves_for_side(
    state: &GameState,
    catalog: &Catalog,
    side: PlayerSide,
) -> Result<Vec<(UnitInstance, Placement, Vec<Reachable>)>, EngineError> {
    let units: Vec<(UnitInstance, Placement)> = state
        .board
        .units_of(side)
        .into_iter()
        .filter(|(unit, placement)| {
            state
                .board
                .presence(placement.coord)
                .map(|p| p.single().map(|(u, _)| u) == Some(*unit))
                .unwrap_or(false)
        })
        .collect();

    units
        .into_par_iter()
        .map(|(unit, placement)| {
            explore(state, catalog, &unit, placement, MoveDirection::Advance)
                .map(|moves| (unit, placement, moves))
        })
        .collect()
}
