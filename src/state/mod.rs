//! Game state.
//!
//! One immutable [`GameState`] is live at a time; every transform produces a
//! new one. The board, card, and round subtrees are `Arc`-wrapped so a
//! reducer clones only the path it touches and shares the rest by
//! reference.

pub mod phase;
pub mod resolution;

use std::collections::HashSet;
use std::sync::Arc;

use crate::board::{BoardState, PlayerSide, UnitInstance};
use crate::cards::CardState;

pub use phase::{
    CleanupState, CleanupStep, IssueCommandsState, MoveCommandersState, PhaseState,
    PlayCardsState, PlayCardsStep, ResolveMeleeState,
};
pub use resolution::{
    AttackApplyState, AttackResult, CommandResolutionState, Commitment, DefensiveCommitment,
    EngagementKind, EngagementResolution, EngagementState, FlankResponse, MeleeResolution,
    MovementResolution, RangedResolution, RetreatState, ReverseState, RoutState,
};

/// Per-round bookkeeping: which units have been commanded and moved, any
/// defensive commitments recorded during engagements, and the phase tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    pub commanded: HashSet<UnitInstance>,
    pub moved: HashSet<UnitInstance>,
    pub defensive_commitments: Vec<DefensiveCommitment>,
    pub phase: PhaseState,
}

impl RoundState {
    /// A fresh round, starting at the play-cards phase.
    pub fn new() -> RoundState {
        RoundState {
            commanded: HashSet::new(),
            moved: HashSet::new(),
            defensive_commitments: Vec::new(),
            phase: PhaseState::round_start(),
        }
    }
}

impl Default for RoundState {
    fn default() -> Self {
        RoundState::new()
    }
}

/// The complete game snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub board: Arc<BoardState>,
    pub cards: Arc<CardState>,
    pub round: Arc<RoundState>,
    pub initiative: PlayerSide,
}

impl GameState {
    /// Builds a starting state at the play-cards phase of the first round.
    pub fn new(board: BoardState, cards: CardState, initiative: PlayerSide) -> GameState {
        GameState {
            board: Arc::new(board),
            cards: Arc::new(cards),
            round: Arc::new(RoundState::new()),
            initiative,
        }
    }

    /// Returns a new state with a replaced board; cards and round are shared.
    pub fn with_board(&self, board: BoardState) -> GameState {
        GameState {
            board: Arc::new(board),
            cards: Arc::clone(&self.cards),
            round: Arc::clone(&self.round),
            initiative: self.initiative,
        }
    }

    /// Returns a new state with the cards rewritten through `f`.
    pub fn with_cards(&self, f: impl FnOnce(&mut CardState)) -> GameState {
        let mut cards = (*self.cards).clone();
        f(&mut cards);
        GameState {
            board: Arc::clone(&self.board),
            cards: Arc::new(cards),
            round: Arc::clone(&self.round),
            initiative: self.initiative,
        }
    }

    /// Returns a new state with the round rewritten through `f`.
    pub fn with_round(&self, f: impl FnOnce(&mut RoundState)) -> GameState {
        let mut round = (*self.round).clone();
        f(&mut round);
        GameState {
            board: Arc::clone(&self.board),
            cards: Arc::clone(&self.cards),
            round: Arc::new(round),
            initiative: self.initiative,
        }
    }
}

impl PhaseState {
    pub fn issue_commands(&self) -> Option<&IssueCommandsState> {
        match self {
            PhaseState::IssueCommands(s) => Some(s),
            _ => None,
        }
    }

    pub fn issue_commands_mut(&mut self) -> Option<&mut IssueCommandsState> {
        match self {
            PhaseState::IssueCommands(s) => Some(s),
            _ => None,
        }
    }

    pub fn resolve_melee_mut(&mut self) -> Option<&mut ResolveMeleeState> {
        match self {
            PhaseState::ResolveMelee(s) => Some(s),
            _ => None,
        }
    }

    /// The attack-apply state currently being resolved, wherever it lives in
    /// the phase tree: a ranged command resolution or the current melee.
    pub fn active_apply(&self) -> Option<&AttackApplyState> {
        match self {
            PhaseState::IssueCommands(s) => match s.resolution.as_ref()? {
                CommandResolutionState::RangedAttack(r) => r.apply.as_ref(),
                CommandResolutionState::Movement(_) => None,
            },
            PhaseState::ResolveMelee(s) => s.current.as_ref()?.apply.as_ref(),
            _ => None,
        }
    }

    /// Mutable access to the active attack-apply state.
    pub fn active_apply_mut(&mut self) -> Option<&mut AttackApplyState> {
        match self {
            PhaseState::IssueCommands(s) => match s.resolution.as_mut()? {
                CommandResolutionState::RangedAttack(r) => r.apply.as_mut(),
                CommandResolutionState::Movement(_) => None,
            },
            PhaseState::ResolveMelee(s) => s.current.as_mut()?.apply.as_mut(),
            _ => None,
        }
    }

    /// The engagement currently being resolved, if a movement command is in
    /// flight.
    pub fn active_engagement(&self) -> Option<&EngagementState> {
        match self {
            PhaseState::IssueCommands(s) => match s.resolution.as_ref()? {
                CommandResolutionState::Movement(m) => m.engagement.as_ref(),
                CommandResolutionState::RangedAttack(_) => None,
            },
            _ => None,
        }
    }

    pub fn active_engagement_mut(&mut self) -> Option<&mut EngagementState> {
        match self {
            PhaseState::IssueCommands(s) => match s.resolution.as_mut()? {
                CommandResolutionState::Movement(m) => m.engagement.as_mut(),
                CommandResolutionState::RangedAttack(_) => None,
            },
            _ => None,
        }
    }

    /// The rout state the engine is currently resolving, with the unit being
    /// routed. Walks, in priority order: the active apply state's own rout,
    /// its retreat's nested rout, then a rear engagement's rout.
    pub fn active_rout(&self) -> Option<(&RoutState, UnitInstance)> {
        if let Some(apply) = self.active_apply() {
            if let Some(rout) = apply.rout.as_ref() {
                if !rout.completed {
                    return Some((rout, apply.defender));
                }
            }
            if let Some(retreat) = apply.retreat.as_ref() {
                if let Some(rout) = retreat.rout.as_ref() {
                    if !rout.completed {
                        return Some((rout, apply.defender));
                    }
                }
            }
        }
        if let Some(engagement) = self.active_engagement() {
            if let Some(EngagementResolution::Rear { rout }) = engagement.resolution.as_ref() {
                if !rout.completed {
                    return Some((rout, engagement.defender));
                }
            }
        }
        None
    }

    /// Mutable counterpart of [`PhaseState::active_rout`].
    pub fn active_rout_mut(&mut self) -> Option<(&mut RoutState, UnitInstance)> {
        // Mirrors active_rout; borrowck needs the walk spelled out once more.
        let has_apply_rout = self.active_apply().is_some_and(|a| {
            a.rout.as_ref().is_some_and(|r| !r.completed)
                || a.retreat
                    .as_ref()
                    .is_some_and(|rt| rt.rout.as_ref().is_some_and(|r| !r.completed))
        });
        if has_apply_rout {
            let apply = self.active_apply_mut()?;
            let defender = apply.defender;
            if apply.rout.as_ref().is_some_and(|r| !r.completed) {
                return apply.rout.as_mut().map(|r| (r, defender));
            }
            return apply
                .retreat
                .as_mut()
                .and_then(|rt| rt.rout.as_mut())
                .map(|r| (r, defender));
        }
        let engagement = self.active_engagement_mut()?;
        let defender = engagement.defender;
        match engagement.resolution.as_mut()? {
            EngagementResolution::Rear { rout } if !rout.completed => Some((rout, defender)),
            _ => None,
        }
    }

    /// The retreat state the engine is currently resolving, with the unit
    /// retreating.
    pub fn active_retreat_mut(&mut self) -> Option<(&mut RetreatState, UnitInstance)> {
        let apply = self.active_apply_mut()?;
        let defender = apply.defender;
        apply
            .retreat
            .as_mut()
            .filter(|r| !r.completed)
            .map(|r| (r, defender))
    }

    /// The pending commitment the engine awaits, with the side that owes it.
    /// Walk order matches the oracle: ranged attacker, ranged defender,
    /// front-engagement defender, melee attacker, melee defender.
    pub fn active_commitment_mut(&mut self) -> Option<(&mut Commitment, PlayerSide)> {
        match self {
            PhaseState::IssueCommands(s) => match s.resolution.as_mut()? {
                CommandResolutionState::RangedAttack(r) => {
                    let attacker_side = r.attacker.side;
                    let defender_side = r.target.side;
                    if r.attacker_commitment.is_pending() {
                        Some((&mut r.attacker_commitment, attacker_side))
                    } else if r.defender_commitment.is_pending() {
                        Some((&mut r.defender_commitment, defender_side))
                    } else {
                        None
                    }
                }
                CommandResolutionState::Movement(m) => {
                    let engagement = m.engagement.as_mut()?;
                    let defender_side = engagement.defender.side;
                    match engagement.resolution.as_mut()? {
                        EngagementResolution::Front { commitment } if commitment.is_pending() => {
                            Some((commitment, defender_side))
                        }
                        _ => None,
                    }
                }
            },
            PhaseState::ResolveMelee(s) => {
                let melee = s.current.as_mut()?;
                let attacker_side = melee.attacker.side;
                let defender_side = melee.defender.side;
                if melee.attacker_commitment.is_pending() {
                    Some((&mut melee.attacker_commitment, attacker_side))
                } else if melee.defender_commitment.is_pending() {
                    Some((&mut melee.defender_commitment, defender_side))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardSize, PerSide, UnitTypeId};
    use crate::cards::PlayerCardState;

    fn state() -> GameState {
        GameState::new(
            BoardState::empty(BoardSize::Standard),
            PerSide::new(PlayerCardState::default(), PlayerCardState::default()),
            PlayerSide::Red,
        )
    }

    #[test]
    fn with_board_shares_cards_and_round() {
        let s = state();
        let next = s.with_board(BoardState::empty(BoardSize::Small));
        assert!(Arc::ptr_eq(&s.cards, &next.cards));
        assert!(Arc::ptr_eq(&s.round, &next.round));
        assert!(!Arc::ptr_eq(&s.board, &next.board));
    }

    #[test]
    fn with_round_shares_board_and_cards() {
        let s = state();
        let unit = UnitInstance::new(PlayerSide::Red, UnitTypeId(1), 1);
        let next = s.with_round(|r| {
            r.commanded.insert(unit);
        });
        assert!(Arc::ptr_eq(&s.board, &next.board));
        assert!(Arc::ptr_eq(&s.cards, &next.cards));
        assert!(next.round.commanded.contains(&unit));
        assert!(!s.round.commanded.contains(&unit));
    }

    #[test]
    fn active_walkers_are_empty_outside_resolutions() {
        let mut phase = PhaseState::round_start();
        assert!(phase.active_apply().is_none());
        assert!(phase.active_rout().is_none());
        assert!(phase.active_commitment_mut().is_none());
    }
}
