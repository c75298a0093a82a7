//! Resolution substates.
//!
//! The nested state machines that live inside a phase while a command,
//! engagement, or melee is being resolved. Ownership is tree-shaped and
//! exclusive: a phase owns at most one command/melee resolution, which owns
//! at most one attack-apply state, which owns at most one substate per
//! triggered consequence. Nothing is shared by reference across branches.

use serde::{Deserialize, Serialize};

use crate::board::{Coordinate, Facing, Placement, PlayerSide, UnitInstance};
use crate::cards::CardId;
use crate::error::EngineError;

/// A player's pending, declined, or committed card for one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Commitment {
    Pending,
    Declined,
    Committed(CardId),
}

impl Commitment {
    pub fn is_pending(&self) -> bool {
        matches!(self, Commitment::Pending)
    }

    /// The committed card, if one was committed.
    pub fn card(&self) -> Option<CardId> {
        match self {
            Commitment::Committed(card) => Some(*card),
            _ => None,
        }
    }
}

/// The three independent consequences an attack value can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttackResult {
    pub routed: bool,
    pub retreated: bool,
    pub reversed: bool,
}

impl AttackResult {
    pub fn any(&self) -> bool {
        self.routed || self.retreated || self.reversed
    }
}

/// Resolution of a rout: the owner discards cards, then the unit is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutState {
    /// How many cards the owner must discard; unset until computed.
    pub discard_count: Option<u8>,
    /// The owner's chosen discards; unset until selected.
    pub selected: Option<Vec<CardId>>,
    pub completed: bool,
}

impl RoutState {
    pub fn new() -> RoutState {
        RoutState {
            discard_count: None,
            selected: None,
            completed: false,
        }
    }
}

impl Default for RoutState {
    fn default() -> Self {
        RoutState::new()
    }
}

/// Resolution of a forced retreat. When no legal retreat exists the unit
/// routs instead, via the nested [`RoutState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetreatState {
    /// Legal retreat placements; unset until computed.
    pub options: Option<Vec<Placement>>,
    /// The owner's chosen destination; unset until selected.
    pub choice: Option<Placement>,
    /// Set when the options came back empty: the unit routs instead.
    pub rout: Option<RoutState>,
    pub completed: bool,
}

impl RetreatState {
    pub fn new() -> RetreatState {
        RetreatState {
            options: None,
            choice: None,
            rout: None,
            completed: false,
        }
    }
}

impl Default for RetreatState {
    fn default() -> Self {
        RetreatState::new()
    }
}

/// Resolution of a reverse: the unit turns to its opposite facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReverseState {
    pub completed: bool,
}

/// The ordered, possibly-partial resolution of one applied attack value.
///
/// Created the instant an attack value is applied; completed once every
/// triggered consequence's substate has finished (a completed rout is
/// terminal and subsumes the rest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackApplyState {
    pub defender: UnitInstance,
    pub result: AttackResult,
    pub rout: Option<RoutState>,
    pub retreat: Option<RetreatState>,
    pub reverse: Option<ReverseState>,
    pub completed: bool,
}

impl AttackApplyState {
    /// Builds an apply state with one substate per triggered flag.
    pub fn new(defender: UnitInstance, result: AttackResult) -> AttackApplyState {
        AttackApplyState {
            defender,
            result,
            rout: result.routed.then(RoutState::new),
            retreat: result.retreated.then(RetreatState::new),
            reverse: result.reversed.then(ReverseState::default),
            completed: false,
        }
    }

    /// Checks the flag/substate pairing invariant: a triggered flag without
    /// its substate means the state was not initialized correctly.
    pub fn check_initialized(&self) -> Result<(), EngineError> {
        let miss = (self.result.routed && self.rout.is_none())
            || (self.result.retreated && self.retreat.is_none())
            || (self.result.reversed && self.reverse.is_none());
        if miss {
            return Err(EngineError::ApplyNotInitialized);
        }
        Ok(())
    }

    /// True when every consequence that still needs resolution has finished.
    /// A completed rout subsumes retreat and reverse.
    pub fn all_resolved(&self) -> bool {
        if self.result.routed {
            return self.rout.as_ref().is_some_and(|r| r.completed);
        }
        let retreat_done = !self.result.retreated
            || self.retreat.as_ref().is_some_and(|r| r.completed);
        let reverse_done = !self.result.reversed
            || self.reverse.as_ref().is_some_and(|r| r.completed);
        retreat_done && reverse_done
    }
}

/// How an engaging move approached the defender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngagementKind {
    Front,
    Flank,
    Rear,
}

/// The defender's answer to a flank engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlankResponse {
    Stand,
    Retreat(Placement),
}

/// Branch-specific engagement resolution data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngagementResolution {
    /// Frontal clash: the defender may commit a defensive card before the
    /// units lock together.
    Front { commitment: Commitment },
    /// Flank charge: the defender may take a minimal retreat if one exists,
    /// otherwise it is forced to face the attacker.
    Flank {
        /// Legal retreat placements; unset until computed.
        retreat_options: Option<Vec<Placement>>,
        choice: Option<FlankResponse>,
    },
    /// Rear charge: the defender routs outright.
    Rear { rout: RoutState },
}

/// An in-progress engagement produced by a movement that entered an enemy
/// space. Owns the engaging unit and the target placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementState {
    pub unit: UnitInstance,
    pub unit_facing: Facing,
    pub target: Coordinate,
    pub defender: UnitInstance,
    pub kind: EngagementKind,
    pub resolution: Option<EngagementResolution>,
    pub completed: bool,
}

/// Resolution of one issued movement command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementResolution {
    pub unit: UnitInstance,
    pub from: Placement,
    pub to: Placement,
    /// Set once the unit has left its origin and the destination effect ran.
    pub applied: bool,
    pub engagement: Option<EngagementState>,
    pub completed: bool,
}

/// Resolution of one issued ranged-attack command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangedResolution {
    pub attacker: UnitInstance,
    pub target: UnitInstance,
    pub attacker_commitment: Commitment,
    pub defender_commitment: Commitment,
    pub apply: Option<AttackApplyState>,
    pub completed: bool,
}

/// The command being resolved inside the issue-commands phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandResolutionState {
    Movement(MovementResolution),
    RangedAttack(RangedResolution),
}

/// Resolution of one engaged space during the melee phase. The engagement's
/// primary unit attacks the secondary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeleeResolution {
    pub coord: Coordinate,
    pub attacker: UnitInstance,
    pub defender: UnitInstance,
    pub attacker_commitment: Commitment,
    pub defender_commitment: Commitment,
    pub apply: Option<AttackApplyState>,
    pub completed: bool,
}

/// A defensive commitment recorded against a unit for the rest of the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefensiveCommitment {
    pub unit: UnitInstance,
    pub card: CardId,
    pub side: PlayerSide,
}
