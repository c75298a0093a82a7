//! The expected-event oracle.
//!
//! A family of pure functions, one per phase or substep shape, each a short
//! decision tree over its substate's optional fields: an unset defining
//! field means the engine must compute or offer it next; a set-but-not-
//! completed field means the next step of its resolution is due. The
//! functions compose recursively down the phase tree. Every terminal branch
//! returns the single expected event or errors — an error here marks a state
//! no correct transform sequence produces.

use crate::board::PlayerSide;
use crate::error::EngineError;
use crate::event::{ChoiceKind, GameEffect};
use crate::state::{
    AttackApplyState, CleanupStep, EngagementResolution, EngagementState, GameState,
    IssueCommandsState, MeleeResolution, MovementResolution, PhaseState, PlayCardsStep,
    RangedResolution, RetreatState, RoutState,
};

/// What the engine awaits next: an automatic effect or a player's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedEvent {
    GameEffect { effect: GameEffect },
    PlayerChoice { side: PlayerSide, choice: ChoiceKind },
}

fn effect(effect: GameEffect) -> Result<ExpectedEvent, EngineError> {
    Ok(ExpectedEvent::GameEffect { effect })
}

fn choice(side: PlayerSide, choice: ChoiceKind) -> Result<ExpectedEvent, EngineError> {
    Ok(ExpectedEvent::PlayerChoice { side, choice })
}

/// Derives the single next expected event from the state alone.
pub fn expected_event(state: &GameState) -> Result<ExpectedEvent, EngineError> {
    match &state.round.phase {
        PhaseState::PlayCards(p) => play_cards_expected(state, p.step),
        PhaseState::MoveCommanders(m) => {
            match commander_actor(state.initiative, &m.pending) {
                Some(side) => choice(side, ChoiceKind::MoveCommander),
                None => effect(GameEffect::AdvancePhase),
            }
        }
        PhaseState::IssueCommands(s) => issue_commands_expected(state, s),
        PhaseState::ResolveMelee(m) => match &m.current {
            Some(melee) => melee_expected(melee),
            None => {
                let unresolved = state
                    .board
                    .engaged_coords()
                    .into_iter()
                    .any(|c| !m.resolved.contains(&c));
                if unresolved {
                    effect(GameEffect::SelectNextMelee)
                } else {
                    effect(GameEffect::AdvancePhase)
                }
            }
        },
        PhaseState::Cleanup(c) => match c.step {
            CleanupStep::DiscardPlayed => effect(GameEffect::DiscardPlayedCards),
            CleanupStep::PassInitiative => effect(GameEffect::PassInitiative),
            CleanupStep::BeginRound => effect(GameEffect::BeginRound),
        },
    }
}

fn play_cards_expected(
    state: &GameState,
    step: PlayCardsStep,
) -> Result<ExpectedEvent, EngineError> {
    match step {
        PlayCardsStep::Selecting => {
            match play_card_actor(state) {
                Some(side) => choice(side, ChoiceKind::PlayCard),
                None => Err(EngineError::Inconsistent(
                    "both cards chosen but the phase still reads selecting",
                )),
            }
        }
        PlayCardsStep::Revealing => {
            if play_card_actor(state).is_some() {
                return Err(EngineError::Inconsistent(
                    "revealing step with an unchosen card",
                ));
            }
            effect(GameEffect::RevealPlayedCards)
        }
    }
}

/// The side that still owes its card for the round, initiative holder first.
pub(crate) fn play_card_actor(state: &GameState) -> Option<PlayerSide> {
    let first = state.initiative;
    if state.cards.get(first).awaiting_play.is_none() {
        return Some(first);
    }
    let second = first.opponent();
    if state.cards.get(second).awaiting_play.is_none() {
        return Some(second);
    }
    None
}

/// The side whose commander acts next, initiative holder first.
pub(crate) fn commander_actor(
    initiative: PlayerSide,
    pending: &crate::board::PerSide<Vec<crate::board::Coordinate>>,
) -> Option<PlayerSide> {
    if !pending.get(initiative).is_empty() {
        return Some(initiative);
    }
    if !pending.get(initiative.opponent()).is_empty() {
        return Some(initiative.opponent());
    }
    None
}

/// The side that issues the next command, or `None` when both are spent.
pub(crate) fn command_actor(s: &IssueCommandsState) -> Option<PlayerSide> {
    if *s.remaining.get(s.turn) > 0 {
        return Some(s.turn);
    }
    if *s.remaining.get(s.turn.opponent()) > 0 {
        return Some(s.turn.opponent());
    }
    None
}

fn issue_commands_expected(
    state: &GameState,
    s: &IssueCommandsState,
) -> Result<ExpectedEvent, EngineError> {
    if let Some(resolution) = &s.resolution {
        return match resolution {
            crate::state::CommandResolutionState::Movement(m) => movement_expected(m),
            crate::state::CommandResolutionState::RangedAttack(r) => ranged_expected(state, r),
        };
    }
    match command_actor(s) {
        Some(side) => choice(side, ChoiceKind::IssueCommand),
        None => effect(GameEffect::AdvancePhase),
    }
}

fn movement_expected(m: &MovementResolution) -> Result<ExpectedEvent, EngineError> {
    if !m.applied {
        return effect(GameEffect::ApplyMovement);
    }
    match &m.engagement {
        Some(engagement) if !engagement.completed => engagement_expected(engagement),
        _ => effect(GameEffect::CompleteCommandResolution),
    }
}

fn ranged_expected(
    _state: &GameState,
    r: &RangedResolution,
) -> Result<ExpectedEvent, EngineError> {
    if r.completed {
        return Err(EngineError::Inconsistent(
            "completed ranged resolution still in flight",
        ));
    }
    if r.attacker_commitment.is_pending() {
        return choice(r.attacker.side, ChoiceKind::CommitCard);
    }
    if r.defender_commitment.is_pending() {
        return choice(r.target.side, ChoiceKind::CommitCard);
    }
    match &r.apply {
        None => effect(GameEffect::ComputeAttack),
        Some(apply) if apply.completed => effect(GameEffect::CompleteCommandResolution),
        Some(apply) => attack_apply_expected(apply),
    }
}

/// The next event for an in-flight attack-apply state. Rout resolves first
/// and is terminal; retreat and reverse follow in that order.
pub fn attack_apply_expected(apply: &AttackApplyState) -> Result<ExpectedEvent, EngineError> {
    if apply.completed {
        return Err(EngineError::ApplyAlreadyCompleted);
    }
    apply.check_initialized()?;

    if apply.result.routed {
        let rout = apply
            .rout
            .as_ref()
            .ok_or(EngineError::ApplyNotInitialized)?;
        if !rout.completed {
            return rout_expected(rout, apply.defender.side);
        }
        return effect(GameEffect::CompleteAttackApply);
    }

    if apply.result.retreated {
        let retreat = apply
            .retreat
            .as_ref()
            .ok_or(EngineError::ApplyNotInitialized)?;
        if !retreat.completed {
            return retreat_expected(retreat, apply.defender.side);
        }
    }

    if apply.result.reversed {
        let reverse = apply
            .reverse
            .as_ref()
            .ok_or(EngineError::ApplyNotInitialized)?;
        if !reverse.completed {
            return effect(GameEffect::ApplyReverse);
        }
    }

    effect(GameEffect::CompleteAttackApply)
}

fn rout_expected(rout: &RoutState, owner: PlayerSide) -> Result<ExpectedEvent, EngineError> {
    if rout.completed {
        return Err(EngineError::SubstateCompleted("rout"));
    }
    if rout.discard_count.is_none() {
        return effect(GameEffect::ComputeRoutDiscards);
    }
    if rout.selected.is_none() {
        return choice(owner, ChoiceKind::SelectRoutDiscards);
    }
    effect(GameEffect::ApplyRoutDiscards)
}

fn retreat_expected(
    retreat: &RetreatState,
    owner: PlayerSide,
) -> Result<ExpectedEvent, EngineError> {
    if retreat.completed {
        return Err(EngineError::SubstateCompleted("retreat"));
    }
    if retreat.options.is_none() {
        return effect(GameEffect::ComputeRetreatOptions);
    }
    if let Some(rout) = &retreat.rout {
        // No legal retreat existed: the unit routs instead.
        return rout_expected(rout, owner);
    }
    if retreat.choice.is_none() {
        return choice(owner, ChoiceKind::SelectRetreat);
    }
    effect(GameEffect::ApplyRetreat)
}

fn engagement_expected(e: &EngagementState) -> Result<ExpectedEvent, EngineError> {
    if e.completed {
        return Err(EngineError::SubstateCompleted("engagement"));
    }
    match &e.resolution {
        None => effect(GameEffect::BeginEngagement),
        Some(EngagementResolution::Front { commitment }) => {
            if commitment.is_pending() {
                choice(e.defender.side, ChoiceKind::CommitCard)
            } else {
                effect(GameEffect::ApplyFrontEngagement)
            }
        }
        Some(EngagementResolution::Flank {
            retreat_options,
            choice: response,
        }) => match retreat_options {
            None => effect(GameEffect::ComputeRetreatOptions),
            Some(options) if !options.is_empty() && response.is_none() => {
                choice(e.defender.side, ChoiceKind::RespondToFlank)
            }
            Some(_) => effect(GameEffect::ApplyFlankResponse),
        },
        Some(EngagementResolution::Rear { rout }) => {
            if !rout.completed {
                rout_expected(rout, e.defender.side)
            } else {
                effect(GameEffect::CompleteEngagement)
            }
        }
    }
}

fn melee_expected(melee: &MeleeResolution) -> Result<ExpectedEvent, EngineError> {
    if melee.completed {
        return Err(EngineError::Inconsistent(
            "completed melee resolution still current",
        ));
    }
    if melee.attacker_commitment.is_pending() {
        return choice(melee.attacker.side, ChoiceKind::CommitCard);
    }
    if melee.defender_commitment.is_pending() {
        return choice(melee.defender.side, ChoiceKind::CommitCard);
    }
    match &melee.apply {
        None => effect(GameEffect::ComputeAttack),
        Some(apply) if apply.completed => effect(GameEffect::CompleteMelee),
        Some(apply) => attack_apply_expected(apply),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardSize, BoardState, PerSide, UnitInstance, UnitTypeId};
    use crate::cards::{CardId, PlayerCardState};
    use crate::state::{AttackResult, RoutState};

    fn state_with_hands() -> GameState {
        GameState::new(
            BoardState::empty(BoardSize::Standard),
            PerSide::new(
                PlayerCardState::with_hand(vec![CardId(1)]),
                PlayerCardState::with_hand(vec![CardId(2)]),
            ),
            PlayerSide::Red,
        )
    }

    fn defender() -> UnitInstance {
        UnitInstance::new(PlayerSide::Blue, UnitTypeId(1), 1)
    }

    #[test]
    fn fresh_round_asks_initiative_holder_for_a_card() {
        let state = state_with_hands();
        assert_eq!(
            expected_event(&state).unwrap(),
            ExpectedEvent::PlayerChoice {
                side: PlayerSide::Red,
                choice: ChoiceKind::PlayCard,
            }
        );
    }

    #[test]
    fn oracle_is_idempotent() {
        let state = state_with_hands();
        assert_eq!(expected_event(&state).unwrap(), expected_event(&state).unwrap());
    }

    #[test]
    fn second_card_choice_goes_to_the_other_side() {
        let state = state_with_hands().with_cards(|cards| {
            cards.get_mut(PlayerSide::Red).awaiting_play = Some(CardId(1));
        });
        assert_eq!(
            expected_event(&state).unwrap(),
            ExpectedEvent::PlayerChoice {
                side: PlayerSide::Blue,
                choice: ChoiceKind::PlayCard,
            }
        );
    }

    #[test]
    fn incomplete_rout_drives_the_apply_oracle() {
        let mut apply = AttackApplyState::new(
            defender(),
            AttackResult {
                routed: true,
                retreated: true,
                reversed: false,
            },
        );
        // Discard count unset: the engine must compute it.
        assert_eq!(
            attack_apply_expected(&apply).unwrap(),
            ExpectedEvent::GameEffect {
                effect: GameEffect::ComputeRoutDiscards,
            }
        );
        apply.rout.as_mut().unwrap().discard_count = Some(2);
        assert_eq!(
            attack_apply_expected(&apply).unwrap(),
            ExpectedEvent::PlayerChoice {
                side: PlayerSide::Blue,
                choice: ChoiceKind::SelectRoutDiscards,
            }
        );
        apply.rout.as_mut().unwrap().selected = Some(vec![]);
        assert_eq!(
            attack_apply_expected(&apply).unwrap(),
            ExpectedEvent::GameEffect {
                effect: GameEffect::ApplyRoutDiscards,
            }
        );
        // Rout finished: the apply completes, never touching retreat.
        apply.rout.as_mut().unwrap().completed = true;
        assert_eq!(
            attack_apply_expected(&apply).unwrap(),
            ExpectedEvent::GameEffect {
                effect: GameEffect::CompleteAttackApply,
            }
        );
    }

    #[test]
    fn completed_apply_rejects_requery() {
        let mut apply = AttackApplyState::new(defender(), AttackResult::default());
        apply.completed = true;
        assert_eq!(
            attack_apply_expected(&apply),
            Err(EngineError::ApplyAlreadyCompleted)
        );
    }

    #[test]
    fn uninitialized_flags_error() {
        let mut apply = AttackApplyState::new(
            defender(),
            AttackResult {
                routed: false,
                retreated: true,
                reversed: false,
            },
        );
        apply.retreat = None;
        assert_eq!(
            attack_apply_expected(&apply),
            Err(EngineError::ApplyNotInitialized)
        );
    }

    #[test]
    fn retreat_without_options_computes_them_first() {
        let apply = AttackApplyState::new(
            defender(),
            AttackResult {
                routed: false,
                retreated: true,
                reversed: true,
            },
        );
        assert_eq!(
            attack_apply_expected(&apply).unwrap(),
            ExpectedEvent::GameEffect {
                effect: GameEffect::ComputeRetreatOptions,
            }
        );
    }

    #[test]
    fn empty_retreat_options_fall_through_to_nested_rout() {
        let mut apply = AttackApplyState::new(
            defender(),
            AttackResult {
                routed: false,
                retreated: true,
                reversed: false,
            },
        );
        {
            let retreat = apply.retreat.as_mut().unwrap();
            retreat.options = Some(vec![]);
            retreat.rout = Some(RoutState::new());
        }
        assert_eq!(
            attack_apply_expected(&apply).unwrap(),
            ExpectedEvent::GameEffect {
                effect: GameEffect::ComputeRoutDiscards,
            }
        );
    }

    #[test]
    fn reverse_runs_after_retreat() {
        let mut apply = AttackApplyState::new(
            defender(),
            AttackResult {
                routed: false,
                retreated: true,
                reversed: true,
            },
        );
        apply.retreat.as_mut().unwrap().completed = true;
        assert_eq!(
            attack_apply_expected(&apply).unwrap(),
            ExpectedEvent::GameEffect {
                effect: GameEffect::ApplyReverse,
            }
        );
        apply.reverse.as_mut().unwrap().completed = true;
        assert_eq!(
            attack_apply_expected(&apply).unwrap(),
            ExpectedEvent::GameEffect {
                effect: GameEffect::CompleteAttackApply,
            }
        );
    }
}
