//! Round phases.
//!
//! The round walks play-cards, move-commanders, issue-commands,
//! resolve-melee, cleanup. Each phase state owns exactly the data its steps
//! need; nested resolutions live in the issue-commands and resolve-melee
//! phases.

use serde::{Deserialize, Serialize};

use crate::board::{Coordinate, PerSide, PlayerSide};

use super::resolution::{CommandResolutionState, MeleeResolution};

/// Step tag for the play-cards phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayCardsStep {
    /// Players are choosing their card for the round.
    Selecting,
    /// Both cards are chosen and await the reveal effect.
    Revealing,
}

/// Step tag for the cleanup phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CleanupStep {
    DiscardPlayed,
    PassInitiative,
    BeginRound,
}

/// State of the play-cards phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayCardsState {
    pub step: PlayCardsStep,
}

/// State of the move-commanders phase: the commanders of each side that have
/// not acted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCommandersState {
    pub pending: PerSide<Vec<Coordinate>>,
}

/// State of the issue-commands phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCommandsState {
    /// Commands each side may still issue this round.
    pub remaining: PerSide<u8>,
    /// Whose turn it is to issue the next command.
    pub turn: PlayerSide,
    pub resolution: Option<CommandResolutionState>,
}

/// State of the resolve-melee phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveMeleeState {
    /// Engaged coordinates already resolved this round.
    pub resolved: Vec<Coordinate>,
    pub current: Option<MeleeResolution>,
}

/// State of the cleanup phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupState {
    pub step: CleanupStep,
}

/// The current phase of the round, with its phase-specific state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseState {
    PlayCards(PlayCardsState),
    MoveCommanders(MoveCommandersState),
    IssueCommands(IssueCommandsState),
    ResolveMelee(ResolveMeleeState),
    Cleanup(CleanupState),
}

impl PhaseState {
    /// The phase every round starts in.
    pub fn round_start() -> PhaseState {
        PhaseState::PlayCards(PlayCardsState {
            step: PlayCardsStep::Selecting,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_start_selecting_cards() {
        match PhaseState::round_start() {
            PhaseState::PlayCards(s) => assert_eq!(s.step, PlayCardsStep::Selecting),
            other => panic!("unexpected phase {:?}", other),
        }
    }
}
