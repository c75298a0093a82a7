//! Engine error type.
//!
//! Every variant marks an invariant violation: a caller applied an event the
//! current state cannot accept, or a substate tree reached a shape no correct
//! transform sequence produces. These are programming/integration errors and
//! propagate to the orchestration layer; expected gameplay failures are
//! filtered out earlier by the boolean predicates in [`crate::validate`].

use crate::board::{Coordinate, UnitInstance};
use crate::cards::CardId;

/// Errors raised by the oracle, the transform engine, and the combat cascade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("coordinate {0} is not on the board")]
    OffBoard(Coordinate),

    #[error("unit {0} is not on the board")]
    UnitNotFound(UnitInstance),

    #[error("unknown unit type id {0}")]
    UnknownUnitType(u16),

    #[error("unknown card id {0}")]
    UnknownCard(u16),

    #[error("card {card} is not in {side}'s {pile} pile")]
    CardNotInPile {
        card: CardId,
        side: crate::board::PlayerSide,
        pile: &'static str,
    },

    #[error("event sent by {got}, but the engine awaits {want}")]
    WrongSide {
        want: crate::board::PlayerSide,
        got: crate::board::PlayerSide,
    },

    #[error("attack apply state is already completed")]
    ApplyAlreadyCompleted,

    #[error("attack result flags are set but their substates are missing: not initialized correctly")]
    ApplyNotInitialized,

    #[error("substate is already completed: {0}")]
    SubstateCompleted(&'static str),

    #[error("claimed placement at {0} does not match the board")]
    PlacementMismatch(Coordinate),

    #[error("illegal choice: {0}")]
    IllegalChoice(&'static str),

    #[error("inconsistent state: {0}")]
    Inconsistent(&'static str),
}
