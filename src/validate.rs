//! Boolean legality predicates.
//!
//! The non-throwing error channel: these return plain booleans for checks
//! that are expected to sometimes fail, and the core calls them instead of
//! inlining the checks. Anything that signals an impossible state belongs in
//! [`crate::error::EngineError`] instead.

use crate::board::{
    BoardState, Coordinate, PlayerSide, UnitInstance, UnitPresence,
};
use crate::cards::{Catalog, ModifierRestrictions};

/// True when the presence is exactly one unit.
pub fn is_single_unit(presence: &UnitPresence) -> bool {
    matches!(presence, UnitPresence::Single { .. })
}

/// True when the presence is exactly one unit of the enemy of `side`.
pub fn is_single_enemy(presence: &UnitPresence, side: PlayerSide) -> bool {
    match presence {
        UnitPresence::Single { unit, .. } => unit.side != side,
        _ => false,
    }
}

/// True when the presence is exactly one unit of `side`.
pub fn is_single_friendly(presence: &UnitPresence, side: PlayerSide) -> bool {
    match presence {
        UnitPresence::Single { unit, .. } => unit.side == side,
        _ => false,
    }
}

/// True when two references denote the same unit instance (value identity).
pub fn same_instance(a: &UnitInstance, b: &UnitInstance) -> bool {
    a == b
}

/// True when the unit satisfies a modifier's restrictions: inspiration range
/// from an own commander, any-of trait list, any-of unit-type list. Empty
/// lists do not restrict. An unknown unit type fails closed.
pub fn satisfies_restrictions(
    board: &BoardState,
    catalog: &Catalog,
    unit: &UnitInstance,
    at: Coordinate,
    restrictions: &ModifierRestrictions,
) -> bool {
    if let Some(range) = restrictions.inspiration_range {
        match board.distance_to_commander(unit.side, at) {
            Some(d) if d <= range => {}
            _ => return false,
        }
    }
    if !restrictions.traits.is_empty() || !restrictions.units.is_empty() {
        let Ok(def) = catalog.unit_type(unit.unit_type) else {
            return false;
        };
        let trait_ok = restrictions.traits.is_empty()
            || restrictions.traits.iter().any(|t| def.has_trait(*t));
        let unit_ok =
            restrictions.units.is_empty() || restrictions.units.contains(&unit.unit_type);
        if !trait_ok || !unit_ok {
            return false;
        }
    }
    true
}
