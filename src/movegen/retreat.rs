//! Retreat legality.
//!
//! A unit may not retreat at all while an unengaged enemy in a space behind
//! it faces it. Otherwise the legal retreats are the cheapest non-empty cost
//! tier of retreat-mode exploration, minimizing flexibility first and then
//! speed; every tied placement is kept, since ties are legitimate player
//! choices.

use crate::board::{behind_spaces, Facing, Placement, UnitInstance, UnitPresence};
use crate::cards::{Catalog, ModifiedStat};
use crate::error::EngineError;
use crate::state::GameState;
use crate::stats;

use super::explore::{explore, MoveDirection};

/// True when an unengaged enemy stands behind the placement and faces the
/// unit there: its facing equals, or is one 45° step off, the direction
/// toward the unit.
fn retreat_blocked(state: &GameState, unit: &UnitInstance, placement: Placement) -> bool {
    for coord in behind_spaces(placement, state.board.size()) {
        let Ok(presence) = state.board.presence(coord) else {
            continue;
        };
        if let UnitPresence::Single {
            unit: enemy,
            facing,
        } = presence
        {
            if enemy.side == unit.side {
                continue;
            }
            if let Some(toward) = Facing::toward(coord, placement.coord) {
                if toward.separation(*facing) <= 1 {
                    return true;
                }
            }
        }
    }
    false
}

/// Computes the legal retreat placements for a unit.
///
/// Returns the empty set when retreat is blocked or no destination is
/// reachable; every returned placement costs the same minimal
/// (flexibility, speed) pair.
pub fn legal_retreats(
    state: &GameState,
    catalog: &Catalog,
    unit: &UnitInstance,
    placement: Placement,
) -> Result<Vec<Placement>, EngineError> {
    let on_board = state
        .board
        .find_unit(unit)
        .ok_or(EngineError::UnitNotFound(*unit))?;
    if on_board != placement {
        return Err(EngineError::PlacementMismatch(placement.coord));
    }

    if retreat_blocked(state, unit, placement) {
        return Ok(Vec::new());
    }

    let results = explore(state, catalog, unit, placement, MoveDirection::Retreat)?;
    if results.is_empty() {
        return Ok(Vec::new());
    }

    let max_flex =
        stats::effective_stat_at(state, catalog, unit, placement, ModifiedStat::Flexibility)?;
    let max_speed = stats::effective_stat_at(state, catalog, unit, placement, ModifiedStat::Speed)?;

    for flexibility in 0..=max_flex {
        for speed in 1..=max_speed {
            let tier: Vec<Placement> = results
                .iter()
                .filter(|r| r.flexibility_used == flexibility && r.speed_used == speed)
                .map(|r| r.placement)
                .collect();
            if !tier.is_empty() {
                return Ok(tier);
            }
        }
    }
    Ok(Vec::new())
}
