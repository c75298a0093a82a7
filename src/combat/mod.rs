//! Attack resolution.
//!
//! Computes attack values (base stat plus committed-card modifiers),
//! compares them against a defender's effective rout/retreat/reverse
//! thresholds — each flag independently — and builds the attack-apply state
//! whose substates the oracle and transform engine then walk: rout first and
//! terminal, then retreat, then reverse.

use crate::board::UnitInstance;
use crate::cards::{modifier_applies, Catalog, ModifiedStat};
use crate::error::EngineError;
use crate::state::{AttackApplyState, AttackResult, Commitment, GameState};
use crate::stats;
use crate::validate;

/// Cards a player discards when one of their units routs, capped by the
/// owner's hand size at resolution time.
pub const ROUT_DISCARD_COUNT: u8 = 2;

/// The modifier contribution of a committed card toward a stat, with the
/// card's restrictions checked against the unit it is committed for.
fn commitment_bonus(
    state: &GameState,
    catalog: &Catalog,
    unit: &UnitInstance,
    commitment: &Commitment,
    stat: ModifiedStat,
) -> Result<i16, EngineError> {
    let Some(card_id) = commitment.card() else {
        return Ok(0);
    };
    let placement = state
        .board
        .find_unit(unit)
        .ok_or(EngineError::UnitNotFound(*unit))?;
    let card = catalog.card(card_id)?;
    Ok(card
        .modifiers
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
        .sum())
}

/// Computes the attack value an attacker puts out: its effective melee or
/// ranged attack stat plus its committed card's applicable modifiers.
pub fn attack_value(
    state: &GameState,
    catalog: &Catalog,
    attacker: &UnitInstance,
    stat: ModifiedStat,
    commitment: &Commitment,
) -> Result<u8, EngineError> {
    if !matches!(stat, ModifiedStat::Attack | ModifiedStat::RangedAttack) {
        return Err(EngineError::Inconsistent("attack value from a non-attack stat"));
    }
    let base = stats::effective_stat(state, catalog, attacker, stat)? as i16;
    let bonus = commitment_bonus(state, catalog, attacker, commitment, stat)?;
    Ok((base + bonus).max(0) as u8)
}

/// A defender's effective threshold for one consequence, including its
/// committed defensive card.
pub fn threshold(
    state: &GameState,
    catalog: &Catalog,
    defender: &UnitInstance,
    stat: ModifiedStat,
    commitment: &Commitment,
) -> Result<u8, EngineError> {
    let base = stats::effective_stat(state, catalog, defender, stat)? as i16;
    let bonus = commitment_bonus(state, catalog, defender, commitment, stat)?;
    Ok((base + bonus).max(0) as u8)
}

/// Applies an attack value against a defender: each of rout, retreat, and
/// reverse triggers independently when the value meets its threshold.
pub fn attack_result(
    state: &GameState,
    catalog: &Catalog,
    value: u8,
    defender: &UnitInstance,
    commitment: &Commitment,
) -> Result<AttackResult, EngineError> {
    let routed = value >= threshold(state, catalog, defender, ModifiedStat::Rout, commitment)?;
    let retreated =
        value >= threshold(state, catalog, defender, ModifiedStat::Retreat, commitment)?;
    let reversed =
        value >= threshold(state, catalog, defender, ModifiedStat::Reverse, commitment)?;
    Ok(AttackResult {
        routed,
        retreated,
        reversed,
    })
}

/// Applies an attack value and builds the apply state that tracks its
/// resolution, one substate per triggered consequence.
pub fn apply_attack_value(
    state: &GameState,
    catalog: &Catalog,
    value: u8,
    defender: &UnitInstance,
    commitment: &Commitment,
) -> Result<AttackApplyState, EngineError> {
    let result = attack_result(state, catalog, value, defender, commitment)?;
    Ok(AttackApplyState::new(*defender, result))
}

/// Validates and performs the completion transition of an apply state.
/// Errors when it is already completed or a pending substate remains.
pub fn complete_apply(apply: &mut AttackApplyState) -> Result<(), EngineError> {
    if apply.completed {
        return Err(EngineError::ApplyAlreadyCompleted);
    }
    apply.check_initialized()?;
    if !apply.all_resolved() {
        return Err(EngineError::Inconsistent(
            "completing an attack apply with pending substates",
        ));
    }
    apply.completed = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{
        BoardSize, BoardState, Coordinate, Facing, PerSide, PlayerSide, UnitStats, UnitTypeDef,
        UnitTypeId,
    };
    use crate::cards::catalog;
    use crate::cards::PlayerCardState;

    fn c(s: &str) -> Coordinate {
        Coordinate::from_abbr(s).unwrap()
    }

    /// A unit type with rout 5, retreat 3, reverse 4 for the threshold table.
    fn scenario_catalog() -> (Catalog, UnitTypeId) {
        let id = UnitTypeId(10);
        let cat = Catalog::new().with_unit_type(
            id,
            UnitTypeDef {
                name: "Test Band".to_string(),
                stats: UnitStats {
                    attack: 3,
                    ranged: None,
                    speed: 2,
                    flexibility: 2,
                    rout: 5,
                    retreat: 3,
                    reverse: 4,
                },
                traits: vec![],
            },
        );
        (cat, id)
    }

    fn game_with(defender: UnitInstance) -> GameState {
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("D-5"), defender, Facing::North)
            .unwrap();
        GameState::new(
            board,
            PerSide::new(PlayerCardState::default(), PlayerCardState::default()),
            PlayerSide::Red,
        )
    }

    #[test]
    fn threshold_table() {
        let (cat, id) = scenario_catalog();
        let defender = UnitInstance::new(PlayerSide::Blue, id, 1);
        let state = game_with(defender);
        let none = Commitment::Declined;

        let at = |v| attack_result(&state, &cat, v, &defender, &none).unwrap();

        let r2 = at(2);
        assert!(!r2.routed && !r2.retreated && !r2.reversed);

        let r3 = at(3);
        assert!(!r3.routed && r3.retreated && !r3.reversed);

        let r4 = at(4);
        assert!(!r4.routed && r4.retreated && r4.reversed);

        for v in [5, 6] {
            let r = at(v);
            assert!(r.routed && r.retreated && r.reversed);
        }
    }

    #[test]
    fn committed_card_raises_thresholds() {
        let cat = Catalog::standard();
        let defender = UnitInstance::new(PlayerSide::Blue, catalog::LEVY_SPEARS, 1);
        let state = game_with(defender);
        // Levy Spears: rout 6, retreat 4, reverse 3.
        let plain = attack_result(&state, &cat, 4, &defender, &Commitment::Declined).unwrap();
        assert!(plain.retreated && plain.reversed && !plain.routed);
        // Shield Drill commits defense +1, lifting the retreat threshold to 5.
        let shielded = attack_result(
            &state,
            &cat,
            4,
            &defender,
            &Commitment::Committed(catalog::SHIELD_DRILL),
        )
        .unwrap();
        assert!(!shielded.retreated && shielded.reversed && !shielded.routed);
    }

    #[test]
    fn attack_value_adds_commitment_for_matching_units() {
        let cat = Catalog::standard();
        let horse = UnitInstance::new(PlayerSide::Red, catalog::HEAVY_HORSE, 1);
        let spears = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), horse, Facing::North)
            .unwrap()
            .place_unit(c("G-5"), spears, Facing::North)
            .unwrap();
        let state = GameState::new(
            board,
            PerSide::new(PlayerCardState::default(), PlayerCardState::default()),
            PlayerSide::Red,
        );
        // Berserk Charge: attack +2, cavalry only.
        let charge = Commitment::Committed(catalog::BERSERK_CHARGE);
        assert_eq!(
            attack_value(&state, &cat, &horse, ModifiedStat::Attack, &charge).unwrap(),
            7
        );
        assert_eq!(
            attack_value(&state, &cat, &spears, ModifiedStat::Attack, &charge).unwrap(),
            3
        );
    }

    #[test]
    fn attack_value_rejects_non_attack_stats() {
        let cat = Catalog::standard();
        let unit = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let state = game_with(unit);
        assert!(attack_value(&state, &cat, &unit, ModifiedStat::Speed, &Commitment::Declined).is_err());
    }

    #[test]
    fn complete_apply_guards() {
        let (cat, id) = scenario_catalog();
        let defender = UnitInstance::new(PlayerSide::Blue, id, 1);
        let state = game_with(defender);

        // Nothing triggered: completes immediately.
        let mut apply =
            apply_attack_value(&state, &cat, 2, &defender, &Commitment::Declined).unwrap();
        complete_apply(&mut apply).unwrap();
        assert!(apply.completed);
        assert_eq!(
            complete_apply(&mut apply),
            Err(EngineError::ApplyAlreadyCompleted)
        );

        // Retreat triggered but unresolved: refuses to complete.
        let mut apply =
            apply_attack_value(&state, &cat, 3, &defender, &Commitment::Declined).unwrap();
        assert!(complete_apply(&mut apply).is_err());
        apply.retreat.as_mut().unwrap().completed = true;
        complete_apply(&mut apply).unwrap();
    }
}
