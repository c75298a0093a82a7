//! Effective-stat resolution.
//!
//! A unit's effective stat layers its base value with the round effect of
//! the owner's in-play card, the in-play card's command modifiers when the
//! unit was commanded this round, and any defensive commitment recorded
//! against the unit. Terrain modifiers are a future extension and do not
//! participate yet.

use crate::board::{Placement, UnitInstance};
use crate::cards::{modifier_applies, Catalog, ModifiedStat, StatModifier};
use crate::error::EngineError;
use crate::state::GameState;
use crate::validate;

/// Queries the unit's base stat block for the given stat. A ranged-attack
/// query on a unit without a ranged profile resolves to 0.
fn base_stat(
    catalog: &Catalog,
    unit: &UnitInstance,
    stat: ModifiedStat,
) -> Result<u8, EngineError> {
    let stats = catalog.unit_type(unit.unit_type)?.stats;
    Ok(match stat {
        ModifiedStat::Attack => stats.attack,
        ModifiedStat::RangedAttack => stats.ranged.map_or(0, |r| r.value),
        ModifiedStat::Speed => stats.speed,
        ModifiedStat::Flexibility => stats.flexibility,
        ModifiedStat::Rout => stats.rout,
        ModifiedStat::Retreat => stats.retreat,
        ModifiedStat::Reverse => stats.reverse,
        ModifiedStat::Defense => {
            return Err(EngineError::Inconsistent(
                "defense is a modifier target, not a queryable stat",
            ))
        }
    })
}

fn modifier_total(
    state: &GameState,
    catalog: &Catalog,
    unit: &UnitInstance,
    placement: Placement,
    stat: ModifiedStat,
    modifiers: &[StatModifier],
) -> i16 {
    modifiers
        .iter()
        .filter(|m| modifier_applies(m.stat, stat))
        .filter(|m| {
            validate::satisfies_restrictions(
                &state.board,
                catalog,
                unit,
                placement.coord,
                &m.restrictions,
            )
        })
        .map(|m| m.amount as i16)
        .sum()
}

/// Computes a unit's current effective stat at its board placement.
///
/// Returns an error when the unit is not on the board or its type is
/// unknown to the catalogue. The result is clamped at zero.
pub fn effective_stat(
    state: &GameState,
    catalog: &Catalog,
    unit: &UnitInstance,
    stat: ModifiedStat,
) -> Result<u8, EngineError> {
    let placement = state
        .board
        .find_unit(unit)
        .ok_or(EngineError::UnitNotFound(*unit))?;
    effective_stat_at(state, catalog, unit, placement, stat)
}

/// Like [`effective_stat`], but with the placement supplied by the caller —
/// used mid-transform when the unit is between spaces.
pub fn effective_stat_at(
    state: &GameState,
    catalog: &Catalog,
    unit: &UnitInstance,
    placement: Placement,
    stat: ModifiedStat,
) -> Result<u8, EngineError> {
    let mut value = base_stat(catalog, unit, stat)? as i16;

    let piles = state.cards.get(unit.side);
    if let Some(card_id) = piles.in_play {
        let card = catalog.card(card_id)?;
        if let Some(effect) = card.round_effect.as_ref() {
            value += modifier_total(state, catalog, unit, placement, stat, &effect.modifiers);
        }
        if state.round.commanded.contains(unit) {
            value += modifier_total(state, catalog, unit, placement, stat, &card.modifiers);
        }
    }

    for dc in &state.round.defensive_commitments {
        if !validate::same_instance(&dc.unit, unit) {
            continue;
        }
        let card = catalog.card(dc.card)?;
        value += modifier_total(state, catalog, unit, placement, stat, &card.modifiers);
    }

    Ok(value.max(0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardSize, BoardState, Coordinate, Facing, PerSide, PlayerSide};
    use crate::cards::catalog;
    use crate::cards::PlayerCardState;
    use crate::state::DefensiveCommitment;

    fn c(s: &str) -> Coordinate {
        Coordinate::from_abbr(s).unwrap()
    }

    fn base_state(board: BoardState) -> GameState {
        GameState::new(
            board,
            PerSide::new(PlayerCardState::default(), PlayerCardState::default()),
            PlayerSide::Red,
        )
    }

    #[test]
    fn base_stats_without_cards() {
        let catalog = Catalog::standard();
        let unit = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), unit, Facing::North)
            .unwrap();
        let state = base_state(board);
        assert_eq!(
            effective_stat(&state, &catalog, &unit, ModifiedStat::Speed).unwrap(),
            2
        );
        assert_eq!(
            effective_stat(&state, &catalog, &unit, ModifiedStat::Rout).unwrap(),
            6
        );
    }

    #[test]
    fn command_modifier_applies_only_to_commanded_units() {
        let catalog = Catalog::standard();
        let unit = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), unit, Facing::North)
            .unwrap();
        // Forced March: speed +1 for commanded units while in play.
        let state = base_state(board).with_cards(|cards| {
            cards.get_mut(PlayerSide::Red).in_play = Some(catalog::FORCED_MARCH);
        });
        assert_eq!(
            effective_stat(&state, &catalog, &unit, ModifiedStat::Speed).unwrap(),
            2
        );
        let state = state.with_round(|r| {
            r.commanded.insert(unit);
        });
        assert_eq!(
            effective_stat(&state, &catalog, &unit, ModifiedStat::Speed).unwrap(),
            3
        );
    }

    #[test]
    fn round_effect_respects_inspiration_range() {
        let catalog = Catalog::standard();
        let near = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let far = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 2);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), near, Facing::North)
            .unwrap()
            .place_unit(c("A-9"), far, Facing::North)
            .unwrap()
            .with_commander(c("E-4"), PlayerSide::Red)
            .unwrap();
        // Rally Banner: rout +1 within inspiration range 2 of an own commander.
        let state = base_state(board).with_cards(|cards| {
            cards.get_mut(PlayerSide::Red).in_play = Some(catalog::RALLY_BANNER);
        });
        assert_eq!(
            effective_stat(&state, &catalog, &near, ModifiedStat::Rout).unwrap(),
            7
        );
        assert_eq!(
            effective_stat(&state, &catalog, &far, ModifiedStat::Rout).unwrap(),
            6
        );
    }

    #[test]
    fn defense_commitment_raises_all_three_thresholds() {
        let catalog = Catalog::standard();
        let unit = UnitInstance::new(PlayerSide::Blue, catalog::SHIELD_WALL, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("D-4"), unit, Facing::South)
            .unwrap();
        // Shield Drill committed defensively: defense +1.
        let state = base_state(board).with_round(|r| {
            r.defensive_commitments.push(DefensiveCommitment {
                unit,
                card: catalog::SHIELD_DRILL,
                side: PlayerSide::Blue,
            });
        });
        assert_eq!(
            effective_stat(&state, &catalog, &unit, ModifiedStat::Rout).unwrap(),
            8
        );
        assert_eq!(
            effective_stat(&state, &catalog, &unit, ModifiedStat::Retreat).unwrap(),
            6
        );
        assert_eq!(
            effective_stat(&state, &catalog, &unit, ModifiedStat::Reverse).unwrap(),
            5
        );
        assert_eq!(
            effective_stat(&state, &catalog, &unit, ModifiedStat::Attack).unwrap(),
            4
        );
    }

    #[test]
    fn ranged_attack_is_zero_without_profile() {
        let catalog = Catalog::standard();
        let unit = UnitInstance::new(PlayerSide::Red, catalog::SHIELD_WALL, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), unit, Facing::North)
            .unwrap();
        let state = base_state(board);
        assert_eq!(
            effective_stat(&state, &catalog, &unit, ModifiedStat::RangedAttack).unwrap(),
            0
        );
    }

    #[test]
    fn defense_is_not_queryable() {
        let catalog = Catalog::standard();
        let unit = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), unit, Facing::North)
            .unwrap();
        let state = base_state(board);
        assert!(effective_stat(&state, &catalog, &unit, ModifiedStat::Defense).is_err());
    }
}
