//! The event transform engine.
//!
//! `apply` dispatches on the event category and then the specific
//! discriminant to one reducer per event type. Each reducer validates that
//! the current state can accept the event — the Oracle→Transform ordering
//! contract — then rewrites only the subtree the event touches, sharing
//! every untouched subtree with the input state.

use std::sync::Arc;

use tracing::debug;

use crate::board::{
    distance, BoardState, Coordinate, PerSide, Placement, PlayerSide, UnitInstance, UnitPresence,
};
use crate::cards::{settle_card, Catalog, CardId, ModifiedStat};
use crate::combat;
use crate::error::EngineError;
use crate::movegen::{explore, legal_retreats, MoveDirection};
use crate::oracle;
use crate::state::{
    CleanupState, CleanupStep, CommandResolutionState, Commitment, DefensiveCommitment,
    EngagementKind, EngagementResolution, EngagementState, FlankResponse, GameState,
    IssueCommandsState, MeleeResolution, MoveCommandersState, MovementResolution, PhaseState,
    PlayCardsState, PlayCardsStep, RangedResolution, ResolveMeleeState, RoundState, RoutState,
};

use super::{CommandChoice, Event, GameEffect, PlayerChoice};

/// How far a commander may move during the move-commanders phase.
pub const COMMANDER_RANGE: u8 = 3;

/// Applies one event to a state, returning the next state.
///
/// Total over every declared event type; an event the current state cannot
/// accept is rejected with an error, never silently ignored.
pub fn apply(event: &Event, state: &GameState, catalog: &Catalog) -> Result<GameState, EngineError> {
    debug!(?event, "applying event");
    match event {
        Event::PlayerChoice(choice) => apply_choice(choice, state, catalog),
        Event::GameEffect(effect) => apply_effect(*effect, state, catalog),
    }
}

fn apply_choice(
    choice: &PlayerChoice,
    state: &GameState,
    catalog: &Catalog,
) -> Result<GameState, EngineError> {
    match choice {
        PlayerChoice::PlayCard { side, card } => play_card(state, catalog, *side, *card),
        PlayerChoice::MoveCommander { side, from, to } => {
            move_commander(state, *side, *from, *to)
        }
        PlayerChoice::IssueCommand { side, command } => {
            issue_command(state, catalog, *side, command)
        }
        PlayerChoice::CommitCard { side, card } => commit_card(state, catalog, *side, *card),
        PlayerChoice::SelectRoutDiscards { side, cards } => {
            select_rout_discards(state, *side, cards)
        }
        PlayerChoice::SelectRetreat { side, placement } => {
            select_retreat(state, *side, *placement)
        }
        PlayerChoice::RespondToFlank { side, response } => {
            respond_to_flank(state, *side, *response)
        }
    }
}

fn apply_effect(
    effect: GameEffect,
    state: &GameState,
    catalog: &Catalog,
) -> Result<GameState, EngineError> {
    match effect {
        GameEffect::RevealPlayedCards => reveal_played_cards(state, catalog),
        GameEffect::AdvancePhase => advance_phase(state, catalog),
        GameEffect::ApplyMovement => apply_movement(state),
        GameEffect::BeginEngagement => begin_engagement(state),
        GameEffect::ApplyFrontEngagement => apply_front_engagement(state),
        GameEffect::ApplyFlankResponse => apply_flank_response(state),
        GameEffect::CompleteEngagement => complete_engagement(state),
        GameEffect::ComputeAttack => compute_attack(state, catalog),
        GameEffect::ComputeRoutDiscards => compute_rout_discards(state),
        GameEffect::ApplyRoutDiscards => apply_rout_discards(state),
        GameEffect::ComputeRetreatOptions => compute_retreat_options(state, catalog),
        GameEffect::ApplyRetreat => apply_retreat(state),
        GameEffect::ApplyReverse => apply_reverse(state),
        GameEffect::CompleteAttackApply => complete_attack_apply(state),
        GameEffect::CompleteCommandResolution => complete_command_resolution(state, catalog),
        GameEffect::SelectNextMelee => select_next_melee(state),
        GameEffect::CompleteMelee => complete_melee(state, catalog),
        GameEffect::DiscardPlayedCards => discard_played_cards(state, catalog),
        GameEffect::PassInitiative => pass_initiative(state),
        GameEffect::BeginRound => begin_round(state),
    }
}

/// Rebuilds a state around an already-cloned round, sharing board and cards.
fn with_new_round(state: &GameState, round: RoundState) -> GameState {
    GameState {
        board: Arc::clone(&state.board),
        cards: Arc::clone(&state.cards),
        round: Arc::new(round),
        initiative: state.initiative,
    }
}

// ---------------------------------------------------------------------------
// Player choices
// ---------------------------------------------------------------------------

fn play_card(
    state: &GameState,
    catalog: &Catalog,
    side: PlayerSide,
    card: CardId,
) -> Result<GameState, EngineError> {
    let PhaseState::PlayCards(p) = &state.round.phase else {
        return Err(EngineError::Inconsistent("play-card outside the play-cards phase"));
    };
    if p.step != PlayCardsStep::Selecting {
        return Err(EngineError::Inconsistent("play-card after selection closed"));
    }
    let want = oracle::play_card_actor(state)
        .ok_or(EngineError::Inconsistent("both cards already chosen"))?;
    if side != want {
        return Err(EngineError::WrongSide { want, got: side });
    }
    catalog.card(card)?;
    if !state.cards.get(side).hand.contains(&card) {
        return Err(EngineError::CardNotInPile { card, side, pile: "hand" });
    }

    let next = state.with_cards(|cards| {
        let piles = cards.get_mut(side);
        piles.take_from_hand(card);
        piles.awaiting_play = Some(card);
    });
    let both_chosen =
        next.cards.red.awaiting_play.is_some() && next.cards.blue.awaiting_play.is_some();
    if both_chosen {
        Ok(next.with_round(|r| {
            r.phase = PhaseState::PlayCards(PlayCardsState {
                step: PlayCardsStep::Revealing,
            });
        }))
    } else {
        Ok(next)
    }
}

fn move_commander(
    state: &GameState,
    side: PlayerSide,
    from: Coordinate,
    to: Option<Coordinate>,
) -> Result<GameState, EngineError> {
    let PhaseState::MoveCommanders(m) = &state.round.phase else {
        return Err(EngineError::Inconsistent(
            "move-commander outside the move-commanders phase",
        ));
    };
    let want = oracle::commander_actor(state.initiative, &m.pending)
        .ok_or(EngineError::Inconsistent("no commander left to act"))?;
    if side != want {
        return Err(EngineError::WrongSide { want, got: side });
    }
    if !m.pending.get(side).contains(&from) {
        return Err(EngineError::IllegalChoice("no pending commander at that coordinate"));
    }

    let mut board = None;
    if let Some(to) = to {
        if to != from {
            if distance(from, to) > COMMANDER_RANGE {
                return Err(EngineError::IllegalChoice("commander destination out of range"));
            }
            let enemy_held = match state.board.presence(to)? {
                UnitPresence::Empty => false,
                UnitPresence::Single { unit, .. } => unit.side != side,
                UnitPresence::Engaged { .. } => true,
            };
            if enemy_held {
                return Err(EngineError::IllegalChoice(
                    "commander cannot enter an enemy-held space",
                ));
            }
            board = Some(state.board.move_commander(side, from, to)?);
        }
    }

    let next = match board {
        Some(board) => state.with_board(board),
        None => state.clone(),
    };
    Ok(next.with_round(|r| {
        if let PhaseState::MoveCommanders(m) = &mut r.phase {
            let pending = m.pending.get_mut(side);
            if let Some(i) = pending.iter().position(|c| *c == from) {
                pending.remove(i);
            }
        }
    }))
}

fn issue_command(
    state: &GameState,
    catalog: &Catalog,
    side: PlayerSide,
    command: &CommandChoice,
) -> Result<GameState, EngineError> {
    let s = issue_commands_state(&state.round.phase)?;
    if s.resolution.is_some() {
        return Err(EngineError::Inconsistent("command issued during a resolution"));
    }
    let want = oracle::command_actor(s)
        .ok_or(EngineError::Inconsistent("no commands left to issue"))?;
    if side != want {
        return Err(EngineError::WrongSide { want, got: side });
    }

    match command {
        CommandChoice::Pass => Ok(state.with_round(|r| {
            if let Some(s) = r.phase.issue_commands_mut() {
                *s.remaining.get_mut(side) = 0;
                if *s.remaining.get(side.opponent()) > 0 {
                    s.turn = side.opponent();
                }
            }
        })),
        CommandChoice::Move { unit, to } => {
            let resolution = build_movement_resolution(state, catalog, side, unit, *to)?;
            Ok(state.with_round(|r| {
                r.commanded.insert(*unit);
                if let Some(s) = r.phase.issue_commands_mut() {
                    s.resolution = Some(CommandResolutionState::Movement(resolution));
                }
            }))
        }
        CommandChoice::RangedAttack { unit, target } => {
            let resolution = build_ranged_resolution(state, catalog, side, unit, target)?;
            Ok(state.with_round(|r| {
                r.commanded.insert(*unit);
                if let Some(s) = r.phase.issue_commands_mut() {
                    s.resolution = Some(CommandResolutionState::RangedAttack(resolution));
                }
            }))
        }
    }
}

fn build_movement_resolution(
    state: &GameState,
    catalog: &Catalog,
    side: PlayerSide,
    unit: &UnitInstance,
    to: Placement,
) -> Result<MovementResolution, EngineError> {
    if unit.side != side {
        return Err(EngineError::IllegalChoice("commanding an enemy unit"));
    }
    if state.round.commanded.contains(unit) {
        return Err(EngineError::IllegalChoice("unit was already commanded this round"));
    }
    let from = state
        .board
        .find_unit(unit)
        .ok_or(EngineError::UnitNotFound(*unit))?;
    if state.board.presence(from.coord)?.single() != Some((*unit, from.facing)) {
        return Err(EngineError::IllegalChoice("engaged units cannot be commanded"));
    }

    // The command modifier is in force for the move being commanded, so the
    // legality check runs with the unit provisionally in the commanded set.
    let provisional = state.with_round(|r| {
        r.commanded.insert(*unit);
    });
    let moves = explore(&provisional, catalog, unit, from, MoveDirection::Advance)?;
    let reachable = moves
        .iter()
        .find(|r| r.placement == to)
        .ok_or(EngineError::IllegalChoice("destination is not a legal move"))?;

    let engagement = match reachable.engagement {
        None => None,
        Some(kind) => {
            let (defender, _) = state
                .board
                .presence(to.coord)?
                .single()
                .ok_or(EngineError::PlacementMismatch(to.coord))?;
            Some(EngagementState {
                unit: *unit,
                unit_facing: to.facing,
                target: to.coord,
                defender,
                kind,
                resolution: None,
                completed: false,
            })
        }
    };

    Ok(MovementResolution {
        unit: *unit,
        from,
        to,
        applied: false,
        engagement,
        completed: false,
    })
}

fn build_ranged_resolution(
    state: &GameState,
    catalog: &Catalog,
    side: PlayerSide,
    unit: &UnitInstance,
    target: &UnitInstance,
) -> Result<RangedResolution, EngineError> {
    if unit.side != side {
        return Err(EngineError::IllegalChoice("commanding an enemy unit"));
    }
    if target.side == side {
        return Err(EngineError::IllegalChoice("ranged attack against an own unit"));
    }
    if state.round.commanded.contains(unit) {
        return Err(EngineError::IllegalChoice("unit was already commanded this round"));
    }
    let from = state
        .board
        .find_unit(unit)
        .ok_or(EngineError::UnitNotFound(*unit))?;
    if state.board.presence(from.coord)?.single() != Some((*unit, from.facing)) {
        return Err(EngineError::IllegalChoice("engaged units cannot be commanded"));
    }
    let profile = catalog
        .unit_type(unit.unit_type)?
        .stats
        .ranged
        .ok_or(EngineError::IllegalChoice("unit has no ranged attack"))?;
    let target_placement = state
        .board
        .find_unit(target)
        .ok_or(EngineError::UnitNotFound(*target))?;
    if state.board.presence(target_placement.coord)?.single().is_none() {
        return Err(EngineError::IllegalChoice("cannot shoot into an engagement"));
    }
    if distance(from.coord, target_placement.coord) > profile.range {
        return Err(EngineError::IllegalChoice("target out of range"));
    }

    Ok(RangedResolution {
        attacker: *unit,
        target: *target,
        attacker_commitment: Commitment::Pending,
        defender_commitment: Commitment::Pending,
        apply: None,
        completed: false,
    })
}

fn commit_card(
    state: &GameState,
    catalog: &Catalog,
    side: PlayerSide,
    card: Option<CardId>,
) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let (commitment, want) = round
        .phase
        .active_commitment_mut()
        .ok_or(EngineError::Inconsistent("no commitment awaited"))?;
    if side != want {
        return Err(EngineError::WrongSide { want, got: side });
    }
    match card {
        None => *commitment = Commitment::Declined,
        Some(card) => {
            catalog.card(card)?;
            if !state.cards.get(side).hand.contains(&card) {
                return Err(EngineError::CardNotInPile { card, side, pile: "hand" });
            }
            *commitment = Commitment::Committed(card);
        }
    }

    let next = with_new_round(state, round);
    Ok(match card {
        Some(card) => next.with_cards(|cards| {
            cards.get_mut(side).take_from_hand(card);
        }),
        None => next,
    })
}

fn select_rout_discards(
    state: &GameState,
    side: PlayerSide,
    cards: &[CardId],
) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let (rout, unit) = round
        .phase
        .active_rout_mut()
        .ok_or(EngineError::Inconsistent("no rout being resolved"))?;
    let want = unit.side;
    if side != want {
        return Err(EngineError::WrongSide { want, got: side });
    }
    let count = rout
        .discard_count
        .ok_or(EngineError::Inconsistent("discard count not computed yet"))?;
    if rout.selected.is_some() {
        return Err(EngineError::Inconsistent("rout discards already selected"));
    }
    if cards.len() != count as usize {
        return Err(EngineError::IllegalChoice("wrong number of rout discards"));
    }
    let hand = &state.cards.get(side).hand;
    for card in cards {
        let in_hand = hand.iter().filter(|c| *c == card).count();
        let selected = cards.iter().filter(|c| *c == card).count();
        if selected > in_hand {
            return Err(EngineError::CardNotInPile { card: *card, side, pile: "hand" });
        }
    }
    rout.selected = Some(cards.to_vec());
    Ok(with_new_round(state, round))
}

fn select_retreat(
    state: &GameState,
    side: PlayerSide,
    placement: Placement,
) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let (retreat, unit) = round
        .phase
        .active_retreat_mut()
        .ok_or(EngineError::Inconsistent("no retreat being resolved"))?;
    let want = unit.side;
    if side != want {
        return Err(EngineError::WrongSide { want, got: side });
    }
    let options = retreat
        .options
        .as_ref()
        .ok_or(EngineError::Inconsistent("retreat options not computed yet"))?;
    if retreat.rout.is_some() {
        return Err(EngineError::Inconsistent("retreat collapsed into a rout"));
    }
    if retreat.choice.is_some() {
        return Err(EngineError::Inconsistent("retreat already chosen"));
    }
    if !options.contains(&placement) {
        return Err(EngineError::IllegalChoice("not a legal retreat placement"));
    }
    retreat.choice = Some(placement);
    Ok(with_new_round(state, round))
}

fn respond_to_flank(
    state: &GameState,
    side: PlayerSide,
    response: FlankResponse,
) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let engagement = round
        .phase
        .active_engagement_mut()
        .ok_or(EngineError::Inconsistent("no engagement being resolved"))?;
    let want = engagement.defender.side;
    if side != want {
        return Err(EngineError::WrongSide { want, got: side });
    }
    let Some(EngagementResolution::Flank {
        retreat_options,
        choice,
    }) = engagement.resolution.as_mut()
    else {
        return Err(EngineError::Inconsistent("no flank response awaited"));
    };
    let options = retreat_options
        .as_ref()
        .ok_or(EngineError::Inconsistent("flank retreat options not computed yet"))?;
    if options.is_empty() {
        return Err(EngineError::Inconsistent("flank response with no retreat available"));
    }
    if choice.is_some() {
        return Err(EngineError::Inconsistent("flank response already chosen"));
    }
    if let FlankResponse::Retreat(placement) = response {
        if !options.contains(&placement) {
            return Err(EngineError::IllegalChoice("not a legal flank retreat"));
        }
    }
    *choice = Some(response);
    Ok(with_new_round(state, round))
}

// ---------------------------------------------------------------------------
// Game effects
// ---------------------------------------------------------------------------

fn issue_commands_state(phase: &PhaseState) -> Result<&IssueCommandsState, EngineError> {
    phase
        .issue_commands()
        .ok_or(EngineError::Inconsistent("not in the issue-commands phase"))
}

fn reveal_played_cards(state: &GameState, catalog: &Catalog) -> Result<GameState, EngineError> {
    let PhaseState::PlayCards(p) = &state.round.phase else {
        return Err(EngineError::Inconsistent("reveal outside the play-cards phase"));
    };
    if p.step != PlayCardsStep::Revealing {
        return Err(EngineError::Inconsistent("reveal before both cards are chosen"));
    }
    let red = state
        .cards
        .red
        .awaiting_play
        .ok_or(EngineError::Inconsistent("red card missing at reveal"))?;
    let blue = state
        .cards
        .blue
        .awaiting_play
        .ok_or(EngineError::Inconsistent("blue card missing at reveal"))?;

    let red_initiative = catalog.card(red)?.initiative;
    let blue_initiative = catalog.card(blue)?.initiative;
    let initiative = if red_initiative > blue_initiative {
        PlayerSide::Red
    } else if blue_initiative > red_initiative {
        PlayerSide::Blue
    } else {
        state.initiative
    };

    let pending = PerSide::from_fn(|side| state.board.commander_coords(side));
    let mut next = state
        .with_cards(|cards| {
            cards.red.awaiting_play = None;
            cards.red.in_play = Some(red);
            cards.blue.awaiting_play = None;
            cards.blue.in_play = Some(blue);
        })
        .with_round(|r| {
            r.phase = PhaseState::MoveCommanders(MoveCommandersState { pending });
        });
    next.initiative = initiative;
    Ok(next)
}

fn advance_phase(state: &GameState, catalog: &Catalog) -> Result<GameState, EngineError> {
    match &state.round.phase {
        PhaseState::MoveCommanders(m) => {
            if oracle::commander_actor(state.initiative, &m.pending).is_some() {
                return Err(EngineError::Inconsistent("commanders still pending"));
            }
            let remaining = per_side_commands(state, catalog)?;
            let turn = state.initiative;
            Ok(state.with_round(move |r| {
                r.phase = PhaseState::IssueCommands(IssueCommandsState {
                    remaining,
                    turn,
                    resolution: None,
                });
            }))
        }
        PhaseState::IssueCommands(s) => {
            if s.resolution.is_some() || oracle::command_actor(s).is_some() {
                return Err(EngineError::Inconsistent("commands still pending"));
            }
            Ok(state.with_round(|r| {
                r.phase = PhaseState::ResolveMelee(ResolveMeleeState {
                    resolved: Vec::new(),
                    current: None,
                });
            }))
        }
        PhaseState::ResolveMelee(m) => {
            if m.current.is_some() {
                return Err(EngineError::Inconsistent("a melee is still being resolved"));
            }
            let unresolved = state
                .board
                .engaged_coords()
                .into_iter()
                .any(|c| !m.resolved.contains(&c));
            if unresolved {
                return Err(EngineError::Inconsistent("engaged spaces remain unresolved"));
            }
            Ok(state.with_round(|r| {
                r.phase = PhaseState::Cleanup(CleanupState {
                    step: CleanupStep::DiscardPlayed,
                });
            }))
        }
        _ => Err(EngineError::Inconsistent("phase cannot be advanced from here")),
    }
}

fn per_side_commands(state: &GameState, catalog: &Catalog) -> Result<PerSide<u8>, EngineError> {
    let command_budget = |side: PlayerSide| -> Result<u8, EngineError> {
        let card = state
            .cards
            .get(side)
            .in_play
            .ok_or(EngineError::Inconsistent("no card in play"))?;
        Ok(catalog.card(card)?.commands)
    };
    Ok(PerSide::new(
        command_budget(PlayerSide::Red)?,
        command_budget(PlayerSide::Blue)?,
    ))
}

fn apply_movement(state: &GameState) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let Some(s) = round.phase.issue_commands_mut() else {
        return Err(EngineError::Inconsistent("not in the issue-commands phase"));
    };
    let Some(CommandResolutionState::Movement(m)) = s.resolution.as_mut() else {
        return Err(EngineError::Inconsistent("no movement to apply"));
    };
    if m.applied {
        return Err(EngineError::SubstateCompleted("movement"));
    }
    if state.board.presence(m.from.coord)?.single() != Some((m.unit, m.from.facing)) {
        return Err(EngineError::PlacementMismatch(m.from.coord));
    }

    let mut board = state.board.with_presence(m.from.coord, UnitPresence::Empty)?;
    if m.engagement.is_none() {
        board = board.place_unit(m.to.coord, m.unit, m.to.facing)?;
        m.completed = true;
    }
    m.applied = true;
    round.moved.insert(m.unit);

    Ok(GameState {
        board: Arc::new(board),
        cards: Arc::clone(&state.cards),
        round: Arc::new(round),
        initiative: state.initiative,
    })
}

fn begin_engagement(state: &GameState) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let engagement = round
        .phase
        .active_engagement_mut()
        .ok_or(EngineError::Inconsistent("no engagement to begin"))?;
    if engagement.resolution.is_some() {
        return Err(EngineError::Inconsistent("engagement already begun"));
    }
    engagement.resolution = Some(match engagement.kind {
        EngagementKind::Front => EngagementResolution::Front {
            commitment: Commitment::Pending,
        },
        EngagementKind::Flank => EngagementResolution::Flank {
            retreat_options: None,
            choice: None,
        },
        EngagementKind::Rear => EngagementResolution::Rear {
            rout: RoutState::new(),
        },
    });
    Ok(with_new_round(state, round))
}

/// Shared tail of the front/flank engagement reducers: write the board,
/// record an optional defensive commitment, and close the resolution.
fn finish_engagement(
    state: &GameState,
    mut round: RoundState,
    board: BoardState,
    defensive: Option<DefensiveCommitment>,
) -> Result<GameState, EngineError> {
    if let Some(dc) = defensive {
        round.defensive_commitments.push(dc);
    }
    let Some(s) = round.phase.issue_commands_mut() else {
        return Err(EngineError::Inconsistent("not in the issue-commands phase"));
    };
    let Some(CommandResolutionState::Movement(m)) = s.resolution.as_mut() else {
        return Err(EngineError::Inconsistent("no movement resolution in flight"));
    };
    let Some(engagement) = m.engagement.as_mut() else {
        return Err(EngineError::Inconsistent("no engagement in flight"));
    };
    engagement.completed = true;
    m.completed = true;
    Ok(GameState {
        board: Arc::new(board),
        cards: Arc::clone(&state.cards),
        round: Arc::new(round),
        initiative: state.initiative,
    })
}

fn apply_front_engagement(state: &GameState) -> Result<GameState, EngineError> {
    let round = (*state.round).clone();
    let engagement = state
        .round
        .phase
        .active_engagement()
        .ok_or(EngineError::Inconsistent("no engagement to lock"))?;
    let Some(EngagementResolution::Front { commitment }) = engagement.resolution.as_ref() else {
        return Err(EngineError::Inconsistent("engagement is not a frontal one"));
    };
    if commitment.is_pending() {
        return Err(EngineError::Inconsistent("front commitment still pending"));
    }
    let (defender, defender_facing) = state
        .board
        .presence(engagement.target)?
        .single()
        .ok_or(EngineError::PlacementMismatch(engagement.target))?;
    if defender != engagement.defender {
        return Err(EngineError::PlacementMismatch(engagement.target));
    }
    if engagement.unit_facing != defender_facing.opposite() {
        return Err(EngineError::Inconsistent("front engagement facing mismatch"));
    }

    let board = state.board.with_presence(
        engagement.target,
        UnitPresence::Engaged {
            primary: engagement.unit,
            primary_facing: engagement.unit_facing,
            secondary: engagement.defender,
        },
    )?;
    let defensive = commitment.card().map(|card| DefensiveCommitment {
        unit: engagement.defender,
        card,
        side: engagement.defender.side,
    });
    finish_engagement(state, round, board, defensive)
}

fn apply_flank_response(state: &GameState) -> Result<GameState, EngineError> {
    let round = (*state.round).clone();
    let engagement = state
        .round
        .phase
        .active_engagement()
        .ok_or(EngineError::Inconsistent("no engagement to resolve"))?;
    let Some(EngagementResolution::Flank {
        retreat_options,
        choice,
    }) = engagement.resolution.as_ref()
    else {
        return Err(EngineError::Inconsistent("engagement is not a flank one"));
    };
    let options = retreat_options
        .as_ref()
        .ok_or(EngineError::Inconsistent("flank retreat options not computed yet"))?;
    let response = match choice {
        Some(r) => *r,
        // With no retreat available the defender has no say.
        None if options.is_empty() => FlankResponse::Stand,
        None => return Err(EngineError::Inconsistent("flank response not chosen")),
    };
    let (defender, _) = state
        .board
        .presence(engagement.target)?
        .single()
        .ok_or(EngineError::PlacementMismatch(engagement.target))?;
    if defender != engagement.defender {
        return Err(EngineError::PlacementMismatch(engagement.target));
    }

    let board = match response {
        FlankResponse::Stand => state.board.with_presence(
            engagement.target,
            UnitPresence::Engaged {
                primary: engagement.unit,
                primary_facing: engagement.unit_facing,
                secondary: engagement.defender,
            },
        )?,
        FlankResponse::Retreat(placement) => {
            if !options.contains(&placement) {
                return Err(EngineError::Inconsistent("chosen flank retreat is not legal"));
            }
            state
                .board
                .with_presence(engagement.target, UnitPresence::Empty)?
                .place_unit(placement.coord, engagement.defender, placement.facing)?
                .place_unit(engagement.target, engagement.unit, engagement.unit_facing)?
        }
    };
    finish_engagement(state, round, board, None)
}

fn complete_engagement(state: &GameState) -> Result<GameState, EngineError> {
    let round = (*state.round).clone();
    let engagement = state
        .round
        .phase
        .active_engagement()
        .ok_or(EngineError::Inconsistent("no engagement to complete"))?;
    let Some(EngagementResolution::Rear { rout }) = engagement.resolution.as_ref() else {
        return Err(EngineError::Inconsistent("only rear engagements complete this way"));
    };
    if !rout.completed {
        return Err(EngineError::Inconsistent("rear rout unresolved"));
    }
    if !state.board.presence(engagement.target)?.is_empty() {
        return Err(EngineError::Inconsistent("routed defender still on the board"));
    }
    let board = state
        .board
        .place_unit(engagement.target, engagement.unit, engagement.unit_facing)?;
    finish_engagement(state, round, board, None)
}

fn compute_attack(state: &GameState, catalog: &Catalog) -> Result<GameState, EngineError> {
    let (attacker, stat, attacker_commitment, defender, defender_commitment) =
        match &state.round.phase {
            PhaseState::IssueCommands(s) => match s.resolution.as_ref() {
                Some(CommandResolutionState::RangedAttack(r)) => {
                    if r.apply.is_some() {
                        return Err(EngineError::Inconsistent("attack already computed"));
                    }
                    (
                        r.attacker,
                        ModifiedStat::RangedAttack,
                        r.attacker_commitment,
                        r.target,
                        r.defender_commitment,
                    )
                }
                _ => return Err(EngineError::Inconsistent("no ranged attack in flight")),
            },
            PhaseState::ResolveMelee(m) => match m.current.as_ref() {
                Some(melee) => {
                    if melee.apply.is_some() {
                        return Err(EngineError::Inconsistent("attack already computed"));
                    }
                    (
                        melee.attacker,
                        ModifiedStat::Attack,
                        melee.attacker_commitment,
                        melee.defender,
                        melee.defender_commitment,
                    )
                }
                None => return Err(EngineError::Inconsistent("no melee in flight")),
            },
            _ => return Err(EngineError::Inconsistent("no attack to compute")),
        };

    if attacker_commitment.is_pending() || defender_commitment.is_pending() {
        return Err(EngineError::Inconsistent("commitments still pending"));
    }

    let value = combat::attack_value(state, catalog, &attacker, stat, &attacker_commitment)?;
    let apply_state =
        combat::apply_attack_value(state, catalog, value, &defender, &defender_commitment)?;
    debug!(%attacker, %defender, value, "attack value applied");

    Ok(state.with_round(|r| {
        match &mut r.phase {
            PhaseState::IssueCommands(s) => {
                if let Some(CommandResolutionState::RangedAttack(ranged)) = s.resolution.as_mut() {
                    ranged.apply = Some(apply_state);
                }
            }
            PhaseState::ResolveMelee(m) => {
                if let Some(melee) = m.current.as_mut() {
                    melee.apply = Some(apply_state);
                }
            }
            _ => {}
        }
    }))
}

fn compute_rout_discards(state: &GameState) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let (rout, unit) = round
        .phase
        .active_rout_mut()
        .ok_or(EngineError::Inconsistent("no rout being resolved"))?;
    if rout.discard_count.is_some() {
        return Err(EngineError::Inconsistent("discard count already computed"));
    }
    let hand_size = state.cards.get(unit.side).hand.len() as u8;
    rout.discard_count = Some(combat::ROUT_DISCARD_COUNT.min(hand_size));
    Ok(with_new_round(state, round))
}

fn apply_rout_discards(state: &GameState) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let (rout, unit) = round
        .phase
        .active_rout_mut()
        .ok_or(EngineError::Inconsistent("no rout being resolved"))?;
    let selected = rout
        .selected
        .clone()
        .ok_or(EngineError::Inconsistent("rout discards not selected"))?;
    rout.completed = true;
    let owner = unit.side;
    for card in &selected {
        if !state.cards.get(owner).hand.contains(card) {
            return Err(EngineError::CardNotInPile { card: *card, side: owner, pile: "hand" });
        }
    }

    // A rout that stands in for an impossible retreat also closes the retreat.
    if let Some(apply) = round.phase.active_apply_mut() {
        if let Some(retreat) = apply.retreat.as_mut() {
            if retreat.rout.as_ref().is_some_and(|r| r.completed) {
                retreat.completed = true;
            }
        }
    }

    let board = state.board.remove_unit(&unit)?;
    let next = GameState {
        board: Arc::new(board),
        cards: Arc::clone(&state.cards),
        round: Arc::new(round),
        initiative: state.initiative,
    };
    let next = next.with_cards(|cards| {
        let piles = cards.get_mut(owner);
        for card in &selected {
            piles.take_from_hand(*card);
            piles.discarded.push(*card);
        }
    });
    debug!(%unit, discards = selected.len(), "unit routed");
    Ok(next)
}

fn compute_retreat_options(state: &GameState, catalog: &Catalog) -> Result<GameState, EngineError> {
    // A forced retreat inside an attack apply takes precedence; otherwise a
    // flank engagement is asking for the defender's options.
    let target_unit = {
        let mut round = (*state.round).clone();
        if let Some((retreat, unit)) = round.phase.active_retreat_mut() {
            if retreat.options.is_none() {
                Some(unit)
            } else {
                None
            }
        } else {
            None
        }
    };

    if let Some(unit) = target_unit {
        let placement = state
            .board
            .find_unit(&unit)
            .ok_or(EngineError::UnitNotFound(unit))?;
        let options = legal_retreats(state, catalog, &unit, placement)?;
        let mut round = (*state.round).clone();
        let (retreat, _) = round
            .phase
            .active_retreat_mut()
            .ok_or(EngineError::Inconsistent("retreat vanished mid-computation"))?;
        if options.is_empty() {
            retreat.rout = Some(RoutState::new());
        }
        retreat.options = Some(options);
        return Ok(with_new_round(state, round));
    }

    let engagement = state
        .round
        .phase
        .active_engagement()
        .ok_or(EngineError::Inconsistent("nothing needs retreat options"))?;
    let Some(EngagementResolution::Flank { retreat_options, .. }) = engagement.resolution.as_ref()
    else {
        return Err(EngineError::Inconsistent("nothing needs retreat options"));
    };
    if retreat_options.is_some() {
        return Err(EngineError::Inconsistent("flank retreat options already computed"));
    }
    let defender = engagement.defender;
    let placement = state
        .board
        .find_unit(&defender)
        .ok_or(EngineError::UnitNotFound(defender))?;
    let options = legal_retreats(state, catalog, &defender, placement)?;
    let mut round = (*state.round).clone();
    let Some(eng) = round.phase.active_engagement_mut() else {
        return Err(EngineError::Inconsistent("engagement vanished mid-computation"));
    };
    let Some(EngagementResolution::Flank { retreat_options, .. }) = eng.resolution.as_mut() else {
        return Err(EngineError::Inconsistent("engagement vanished mid-computation"));
    };
    *retreat_options = Some(options);
    Ok(with_new_round(state, round))
}

fn apply_retreat(state: &GameState) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let (retreat, unit) = round
        .phase
        .active_retreat_mut()
        .ok_or(EngineError::Inconsistent("no retreat being resolved"))?;
    let choice = retreat
        .choice
        .ok_or(EngineError::Inconsistent("retreat not chosen"))?;
    retreat.completed = true;

    let board = state
        .board
        .remove_unit(&unit)?
        .place_unit(choice.coord, unit, choice.facing)?;
    Ok(GameState {
        board: Arc::new(board),
        cards: Arc::clone(&state.cards),
        round: Arc::new(round),
        initiative: state.initiative,
    })
}

fn apply_reverse(state: &GameState) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let apply = round
        .phase
        .active_apply_mut()
        .ok_or(EngineError::Inconsistent("no attack apply in flight"))?;
    if apply.result.routed {
        return Err(EngineError::Inconsistent("a routed unit cannot reverse"));
    }
    if apply.result.retreated && !apply.retreat.as_ref().is_some_and(|r| r.completed) {
        return Err(EngineError::Inconsistent("reverse before the retreat resolved"));
    }
    let Some(reverse) = apply.reverse.as_mut() else {
        return Err(EngineError::ApplyNotInitialized);
    };
    if reverse.completed {
        return Err(EngineError::SubstateCompleted("reverse"));
    }
    reverse.completed = true;
    let defender = apply.defender;

    let placement = state
        .board
        .find_unit(&defender)
        .ok_or(EngineError::UnitNotFound(defender))?;
    let board = match state.board.presence(placement.coord)? {
        UnitPresence::Single { unit, facing } => state.board.with_presence(
            placement.coord,
            UnitPresence::Single {
                unit: *unit,
                facing: facing.opposite(),
            },
        )?,
        // An engaged unit's facing is derived; turning it has no board effect.
        _ => (*state.board).clone(),
    };
    Ok(GameState {
        board: Arc::new(board),
        cards: Arc::clone(&state.cards),
        round: Arc::new(round),
        initiative: state.initiative,
    })
}

fn complete_attack_apply(state: &GameState) -> Result<GameState, EngineError> {
    let mut round = (*state.round).clone();
    let apply = round
        .phase
        .active_apply_mut()
        .ok_or(EngineError::Inconsistent("no attack apply in flight"))?;
    combat::complete_apply(apply)?;
    Ok(with_new_round(state, round))
}

fn settle_commitment(
    cards: &mut crate::cards::CardState,
    catalog: &Catalog,
    side: PlayerSide,
    commitment: Commitment,
) -> Result<(), EngineError> {
    if let Some(card) = commitment.card() {
        let fate = catalog.card(card)?.fate;
        settle_card(cards.get_mut(side), card, fate);
    }
    Ok(())
}

fn complete_command_resolution(
    state: &GameState,
    catalog: &Catalog,
) -> Result<GameState, EngineError> {
    let s = issue_commands_state(&state.round.phase)?;
    let resolution = s
        .resolution
        .as_ref()
        .ok_or(EngineError::Inconsistent("no command resolution in flight"))?;

    let (commander_side, commitments) = match resolution {
        CommandResolutionState::Movement(m) => {
            let finished =
                m.completed || m.engagement.as_ref().is_some_and(|e| e.completed);
            if !finished {
                return Err(EngineError::Inconsistent("movement resolution not finished"));
            }
            (m.unit.side, Vec::new())
        }
        CommandResolutionState::RangedAttack(r) => {
            if !r.apply.as_ref().is_some_and(|a| a.completed) {
                return Err(EngineError::Inconsistent("ranged resolution not finished"));
            }
            (
                r.attacker.side,
                vec![
                    (r.attacker.side, r.attacker_commitment),
                    (r.target.side, r.defender_commitment),
                ],
            )
        }
    };
    if *s.remaining.get(commander_side) == 0 {
        return Err(EngineError::Inconsistent("completing a command with none issued"));
    }

    let mut next = state.with_round(|r| {
        if let Some(s) = r.phase.issue_commands_mut() {
            s.resolution = None;
            *s.remaining.get_mut(commander_side) -= 1;
            let other = commander_side.opponent();
            s.turn = if *s.remaining.get(other) > 0 {
                other
            } else {
                commander_side
            };
        }
    });
    if !commitments.is_empty() {
        let mut result = Ok(());
        next = next.with_cards(|cards| {
            for (side, commitment) in &commitments {
                if let Err(e) = settle_commitment(cards, catalog, *side, *commitment) {
                    result = Err(e);
                }
            }
        });
        result?;
    }
    Ok(next)
}

fn select_next_melee(state: &GameState) -> Result<GameState, EngineError> {
    let PhaseState::ResolveMelee(m) = &state.round.phase else {
        return Err(EngineError::Inconsistent("not in the resolve-melee phase"));
    };
    if m.current.is_some() {
        return Err(EngineError::Inconsistent("a melee is already being resolved"));
    }
    let coord = state
        .board
        .engaged_coords()
        .into_iter()
        .find(|c| !m.resolved.contains(c))
        .ok_or(EngineError::Inconsistent("no melee left to select"))?;
    let UnitPresence::Engaged {
        primary, secondary, ..
    } = state.board.presence(coord)?
    else {
        return Err(EngineError::Inconsistent("selected space is not engaged"));
    };
    let melee = MeleeResolution {
        coord,
        attacker: *primary,
        defender: *secondary,
        attacker_commitment: Commitment::Pending,
        defender_commitment: Commitment::Pending,
        apply: None,
        completed: false,
    };
    Ok(state.with_round(move |r| {
        if let Some(m) = r.phase.resolve_melee_mut() {
            m.current = Some(melee);
        }
    }))
}

fn complete_melee(state: &GameState, catalog: &Catalog) -> Result<GameState, EngineError> {
    let PhaseState::ResolveMelee(m) = &state.round.phase else {
        return Err(EngineError::Inconsistent("not in the resolve-melee phase"));
    };
    let melee = m
        .current
        .as_ref()
        .ok_or(EngineError::Inconsistent("no melee in flight"))?;
    if !melee.apply.as_ref().is_some_and(|a| a.completed) {
        return Err(EngineError::Inconsistent("melee resolution not finished"));
    }
    let coord = melee.coord;
    let commitments = [
        (melee.attacker.side, melee.attacker_commitment),
        (melee.defender.side, melee.defender_commitment),
    ];

    let next = state.with_round(move |r| {
        if let Some(m) = r.phase.resolve_melee_mut() {
            m.resolved.push(coord);
            m.current = None;
        }
    });
    let mut result = Ok(());
    let next = next.with_cards(|cards| {
        for (side, commitment) in &commitments {
            if let Err(e) = settle_commitment(cards, catalog, *side, *commitment) {
                result = Err(e);
            }
        }
    });
    result?;
    Ok(next)
}

fn discard_played_cards(state: &GameState, catalog: &Catalog) -> Result<GameState, EngineError> {
    let PhaseState::Cleanup(c) = &state.round.phase else {
        return Err(EngineError::Inconsistent("not in the cleanup phase"));
    };
    if c.step != CleanupStep::DiscardPlayed {
        return Err(EngineError::Inconsistent("played cards already discarded"));
    }

    let mut fates: Vec<(PlayerSide, CardId)> = Vec::new();
    for side in crate::board::ALL_SIDES {
        if let Some(card) = state.cards.get(side).in_play {
            fates.push((side, card));
        }
    }
    for dc in &state.round.defensive_commitments {
        fates.push((dc.side, dc.card));
    }

    let mut result = Ok(());
    let next = state.with_cards(|cards| {
        for side in crate::board::ALL_SIDES {
            cards.get_mut(side).in_play = None;
        }
        for (side, card) in &fates {
            match catalog.card(*card) {
                Ok(def) => settle_card(cards.get_mut(*side), *card, def.fate),
                Err(e) => result = Err(e),
            }
        }
    });
    result?;
    Ok(next.with_round(|r| {
        r.phase = PhaseState::Cleanup(CleanupState {
            step: CleanupStep::PassInitiative,
        });
    }))
}

fn pass_initiative(state: &GameState) -> Result<GameState, EngineError> {
    let PhaseState::Cleanup(c) = &state.round.phase else {
        return Err(EngineError::Inconsistent("not in the cleanup phase"));
    };
    if c.step != CleanupStep::PassInitiative {
        return Err(EngineError::Inconsistent("initiative does not pass in this step"));
    }
    let mut next = state.with_round(|r| {
        r.phase = PhaseState::Cleanup(CleanupState {
            step: CleanupStep::BeginRound,
        });
    });
    next.initiative = state.initiative.opponent();
    Ok(next)
}

fn begin_round(state: &GameState) -> Result<GameState, EngineError> {
    let PhaseState::Cleanup(c) = &state.round.phase else {
        return Err(EngineError::Inconsistent("not in the cleanup phase"));
    };
    if c.step != CleanupStep::BeginRound {
        return Err(EngineError::Inconsistent("cleanup is not finished"));
    }
    Ok(state.with_round(|r| *r = RoundState::new()))
}
