//! Random playout driver.
//!
//! Drives the oracle → event → transform loop with uniformly random legal
//! choices wherever a player decision is expected. Exists for determinism
//! and replay testing and for benchmarks; it is not an opponent.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::trace;

use crate::board::{
    adjacent_spaces, distance, BoardSize, BoardState, Facing, PlayerSide, UnitInstance,
    UnitPresence,
};
use crate::cards::{card_state_with_hands, catalog, Catalog};
use crate::error::EngineError;
use crate::event::{self, ChoiceKind, CommandChoice, Event, PlayerChoice};
use crate::movegen;
use crate::oracle::{expected_event, ExpectedEvent};
use crate::state::{FlankResponse, GameState, PhaseState};

/// A small fixed deployment on the standard board, suitable for playouts
/// and benchmarks: three units and a commander per side, five cards in hand.
/// Plays against [`Catalog::standard`].
pub fn demo_game() -> Result<GameState, EngineError> {
    let c = |s: &str| crate::board::Coordinate::from_abbr(s).expect("valid demo coordinate");

    let red = |ty, n| UnitInstance::new(PlayerSide::Red, ty, n);
    let blue = |ty, n| UnitInstance::new(PlayerSide::Blue, ty, n);

    let board = BoardState::empty(BoardSize::Standard)
        .place_unit(c("G-3"), red(catalog::LEVY_SPEARS, 1), Facing::North)?
        .place_unit(c("G-5"), red(catalog::SHIELD_WALL, 1), Facing::North)?
        .place_unit(c("G-7"), red(catalog::HORSE_ARCHERS, 1), Facing::North)?
        .place_unit(c("C-3"), blue(catalog::LEVY_SPEARS, 1), Facing::South)?
        .place_unit(c("C-5"), blue(catalog::GUARD, 1), Facing::South)?
        .place_unit(c("C-7"), blue(catalog::LONGBOWS, 1), Facing::South)?
        .with_commander(c("H-5"), PlayerSide::Red)?
        .with_commander(c("B-5"), PlayerSide::Blue)?;

    let hand = vec![
        catalog::FORCED_MARCH,
        catalog::SHIELD_DRILL,
        catalog::RALLY_BANNER,
        catalog::FLANKING_ORDER,
        catalog::HOLD_THE_LINE,
    ];
    let cards = card_state_with_hands(hand.clone(), hand);
    Ok(GameState::new(board, cards, PlayerSide::Red))
}

/// Builds a uniformly random legal event for the state, or `None` when the
/// game cannot continue (a hand has run dry at card selection).
pub fn random_event(
    state: &GameState,
    catalog: &Catalog,
    rng: &mut impl Rng,
) -> Result<Option<Event>, EngineError> {
    let expected = expected_event(state)?;
    match expected {
        ExpectedEvent::GameEffect { effect } => Ok(Some(Event::GameEffect(effect))),
        ExpectedEvent::PlayerChoice { side, choice } => {
            random_choice(state, catalog, side, choice, rng)
        }
    }
}

fn pick<T: Copy>(items: &[T], rng: &mut impl Rng) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    Some(items[rng.gen_range(0..items.len())])
}

fn random_choice(
    state: &GameState,
    catalog: &Catalog,
    side: PlayerSide,
    choice: ChoiceKind,
    rng: &mut impl Rng,
) -> Result<Option<Event>, EngineError> {
    let event = match choice {
        ChoiceKind::PlayCard => {
            let Some(card) = pick(&state.cards.get(side).hand, rng) else {
                return Ok(None);
            };
            PlayerChoice::PlayCard { side, card }
        }
        ChoiceKind::MoveCommander => random_commander_move(state, side, rng)?,
        ChoiceKind::IssueCommand => random_command(state, catalog, side, rng)?,
        ChoiceKind::CommitCard => {
            let hand = &state.cards.get(side).hand;
            let card = if hand.is_empty() || rng.gen_bool(0.5) {
                None
            } else {
                pick(hand, rng)
            };
            PlayerChoice::CommitCard { side, card }
        }
        ChoiceKind::SelectRoutDiscards => {
            let (rout, _) = state
                .round
                .phase
                .active_rout()
                .ok_or(EngineError::Inconsistent("no rout awaiting discards"))?;
            let count = rout
                .discard_count
                .ok_or(EngineError::Inconsistent("discard count not computed"))?;
            let cards = state.cards.get(side).hand[..count as usize].to_vec();
            PlayerChoice::SelectRoutDiscards { side, cards }
        }
        ChoiceKind::SelectRetreat => {
            let options = active_retreat_options(state)?;
            let placement = pick(&options, rng)
                .ok_or(EngineError::Inconsistent("retreat choice with no options"))?;
            PlayerChoice::SelectRetreat { side, placement }
        }
        ChoiceKind::RespondToFlank => {
            let engagement = state
                .round
                .phase
                .active_engagement()
                .ok_or(EngineError::Inconsistent("no flank to respond to"))?;
            let options = match engagement.resolution.as_ref() {
                Some(crate::state::EngagementResolution::Flank {
                    retreat_options: Some(options),
                    ..
                }) => options.clone(),
                _ => Vec::new(),
            };
            let response = match pick(&options, rng) {
                Some(placement) if rng.gen_bool(0.5) => FlankResponse::Retreat(placement),
                _ => FlankResponse::Stand,
            };
            PlayerChoice::RespondToFlank { side, response }
        }
    };
    Ok(Some(Event::PlayerChoice(event)))
}

fn active_retreat_options(state: &GameState) -> Result<Vec<crate::board::Placement>, EngineError> {
    let apply = state
        .round
        .phase
        .active_apply()
        .ok_or(EngineError::Inconsistent("no attack apply in flight"))?;
    let retreat = apply
        .retreat
        .as_ref()
        .ok_or(EngineError::Inconsistent("no retreat in flight"))?;
    retreat
        .options
        .clone()
        .ok_or(EngineError::Inconsistent("retreat options not computed"))
}

fn random_commander_move(
    state: &GameState,
    side: PlayerSide,
    rng: &mut impl Rng,
) -> Result<PlayerChoice, EngineError> {
    let PhaseState::MoveCommanders(m) = &state.round.phase else {
        return Err(EngineError::Inconsistent("no commander move awaited"));
    };
    let from = *m
        .pending
        .get(side)
        .first()
        .ok_or(EngineError::Inconsistent("no pending commander"))?;

    // Half the time the commander stays; otherwise it drifts one space.
    let to = if rng.gen_bool(0.5) {
        None
    } else {
        let candidates: Vec<_> = adjacent_spaces(from, state.board.size())
            .into_iter()
            .filter(|c| {
                distance(from, *c) <= event::transform::COMMANDER_RANGE
                    && match state.board.presence(*c) {
                        Ok(UnitPresence::Empty) => true,
                        Ok(UnitPresence::Single { unit, .. }) => unit.side == side,
                        _ => false,
                    }
            })
            .collect();
        pick(&candidates, rng)
    };
    Ok(PlayerChoice::MoveCommander { side, from, to })
}

fn random_command(
    state: &GameState,
    catalog: &Catalog,
    side: PlayerSide,
    rng: &mut impl Rng,
) -> Result<PlayerChoice, EngineError> {
    let mut commands = vec![CommandChoice::Pass];
    for (unit, _, moves) in movegen::legal_moves_for_side(state, catalog, side)? {
        if state.round.commanded.contains(&unit) {
            continue;
        }
        for reachable in moves {
            commands.push(CommandChoice::Move {
                unit,
                to: reachable.placement,
            });
        }
        if let Some(profile) = catalog.unit_type(unit.unit_type)?.stats.ranged {
            let from = state
                .board
                .find_unit(&unit)
                .ok_or(EngineError::UnitNotFound(unit))?;
            for (target, placement) in state.board.units_of(side.opponent()) {
                let single = state
                    .board
                    .presence(placement.coord)
                    .map(|p| p.single().is_some())
                    .unwrap_or(false);
                if single && distance(from.coord, placement.coord) <= profile.range {
                    commands.push(CommandChoice::RangedAttack { unit, target });
                }
            }
        }
    }
    let command = pick(&commands, rng)
        .ok_or(EngineError::Inconsistent("no command candidates"))?;
    Ok(PlayerChoice::IssueCommand { side, command })
}

/// Runs a playout for at most `max_events` events. Returns the final state
/// and the number of events applied. Stops early when a hand runs dry.
pub fn run_playout(
    start: &GameState,
    catalog: &Catalog,
    seed: u64,
    max_events: usize,
) -> Result<(GameState, usize), EngineError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut state = start.clone();
    let mut applied = 0;
    while applied < max_events {
        let Some(next_event) = random_event(&state, catalog, &mut rng)? else {
            break;
        };
        trace!(?next_event, applied, "playout step");
        state = event::apply(&next_event, &state, catalog)?;
        applied += 1;
    }
    Ok((state, applied))
}

/// Runs one playout per seed in parallel.
pub fn parallel_playouts(
    start: &GameState,
    catalog: &Catalog,
    seeds: &[u64],
    max_events: usize,
) -> Result<Vec<(GameState, usize)>, EngineError> {
    seeds
        .par_iter()
        .map(|seed| run_playout(start, catalog, *seed, max_events))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playout_makes_progress() {
        let catalog = Catalog::standard();
        let start = demo_game().unwrap();
        let (state, applied) = run_playout(&start, &catalog, 7, 60).unwrap();
        assert!(applied > 0);
        // The playout must have moved the game somewhere.
        assert_ne!(state, start);
    }

    #[test]
    fn same_seed_same_playout() {
        let catalog = Catalog::standard();
        let start = demo_game().unwrap();
        let (a, na) = run_playout(&start, &catalog, 42, 80).unwrap();
        let (b, nb) = run_playout(&start, &catalog, 42, 80).unwrap();
        assert_eq!(na, nb);
        assert_eq!(a, b);
    }

    #[test]
    fn parallel_playouts_match_serial() {
        let catalog = Catalog::standard();
        let start = demo_game().unwrap();
        let seeds = [1, 2, 3, 4];
        let parallel = parallel_playouts(&start, &catalog, &seeds, 50).unwrap();
        for (seed, (state, applied)) in seeds.iter().zip(&parallel) {
            let (serial_state, serial_applied) =
                run_playout(&start, &catalog, *seed, 50).unwrap();
            assert_eq!(*applied, serial_applied);
            assert_eq!(*state, serial_state);
        }
    }
}
