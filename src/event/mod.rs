//! Event declarations and the transform engine.
//!
//! Events are plain tagged records: `eventType` discriminates a player
//! choice from a game effect, and `choiceType`/`effectType` discriminate the
//! specific event, which is enough for lossless round-trip serialization.
//! Game effects carry no payload — the transform engine derives everything
//! from state; player choices carry the player's decision.

pub mod transform;

use serde::{Deserialize, Serialize};

use crate::board::{Coordinate, Placement, PlayerSide, UnitInstance};
use crate::cards::CardId;
use crate::state::FlankResponse;

pub use transform::apply;

/// An automatic engine step the oracle can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "effectType", rename_all = "camelCase")]
pub enum GameEffect {
    /// Moves both chosen cards into play and re-derives initiative.
    RevealPlayedCards,
    /// Moves to the next phase once the current one is exhausted.
    AdvancePhase,
    /// Executes an issued movement command on the board.
    ApplyMovement,
    /// Initializes the resolution branch of a fresh engagement.
    BeginEngagement,
    /// Locks a frontal engagement into an engaged presence.
    ApplyFrontEngagement,
    /// Resolves the defender's answer to a flank engagement.
    ApplyFlankResponse,
    /// Finishes an engagement whose defender routed, seating the attacker.
    CompleteEngagement,
    /// Computes the attack value and creates the attack-apply state.
    ComputeAttack,
    /// Computes how many cards a routing unit's owner must discard.
    ComputeRoutDiscards,
    /// Discards the selected cards and removes the routed unit.
    ApplyRoutDiscards,
    /// Computes the legal retreat set for a forced retreat.
    ComputeRetreatOptions,
    /// Moves the retreating unit to its chosen placement.
    ApplyRetreat,
    /// Turns the reversed unit to its opposite facing.
    ApplyReverse,
    /// Seals a fully resolved attack-apply state.
    CompleteAttackApply,
    /// Settles commitments and closes the in-flight command resolution.
    CompleteCommandResolution,
    /// Picks the next engaged space to resolve in the melee phase.
    SelectNextMelee,
    /// Settles commitments and closes the current melee resolution.
    CompleteMelee,
    /// Routes in-play and committed cards to their after-round piles.
    DiscardPlayedCards,
    /// Hands initiative to the other player.
    PassInitiative,
    /// Resets round bookkeeping and starts the next round.
    BeginRound,
}

/// The command payload of an issue-command choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandChoice {
    Move {
        unit: UnitInstance,
        to: Placement,
    },
    RangedAttack {
        unit: UnitInstance,
        target: UnitInstance,
    },
    /// Forfeits the side's remaining commands this round.
    Pass,
}

/// A decision supplied by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choiceType", rename_all = "camelCase")]
pub enum PlayerChoice {
    PlayCard {
        side: PlayerSide,
        card: CardId,
    },
    MoveCommander {
        side: PlayerSide,
        from: Coordinate,
        /// `None` keeps the commander where it stands.
        to: Option<Coordinate>,
    },
    IssueCommand {
        side: PlayerSide,
        command: CommandChoice,
    },
    CommitCard {
        side: PlayerSide,
        /// `None` declines the commitment.
        card: Option<CardId>,
    },
    SelectRoutDiscards {
        side: PlayerSide,
        cards: Vec<CardId>,
    },
    SelectRetreat {
        side: PlayerSide,
        placement: Placement,
    },
    RespondToFlank {
        side: PlayerSide,
        response: FlankResponse,
    },
}

/// The payload-free discriminant of a player choice, as the oracle names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChoiceKind {
    PlayCard,
    MoveCommander,
    IssueCommand,
    CommitCard,
    SelectRoutDiscards,
    SelectRetreat,
    RespondToFlank,
}

impl PlayerChoice {
    /// The side making this choice.
    pub fn side(&self) -> PlayerSide {
        match self {
            PlayerChoice::PlayCard { side, .. }
            | PlayerChoice::MoveCommander { side, .. }
            | PlayerChoice::IssueCommand { side, .. }
            | PlayerChoice::CommitCard { side, .. }
            | PlayerChoice::SelectRoutDiscards { side, .. }
            | PlayerChoice::SelectRetreat { side, .. }
            | PlayerChoice::RespondToFlank { side, .. } => *side,
        }
    }

    /// The choice discriminant without its payload.
    pub fn kind(&self) -> ChoiceKind {
        match self {
            PlayerChoice::PlayCard { .. } => ChoiceKind::PlayCard,
            PlayerChoice::MoveCommander { .. } => ChoiceKind::MoveCommander,
            PlayerChoice::IssueCommand { .. } => ChoiceKind::IssueCommand,
            PlayerChoice::CommitCard { .. } => ChoiceKind::CommitCard,
            PlayerChoice::SelectRoutDiscards { .. } => ChoiceKind::SelectRoutDiscards,
            PlayerChoice::SelectRetreat { .. } => ChoiceKind::SelectRetreat,
            PlayerChoice::RespondToFlank { .. } => ChoiceKind::RespondToFlank,
        }
    }
}

/// Any event the transform engine accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum Event {
    PlayerChoice(PlayerChoice),
    GameEffect(GameEffect),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Facing;
    use crate::cards::CardId;

    #[test]
    fn events_round_trip_through_json() {
        let events = [
            Event::GameEffect(GameEffect::RevealPlayedCards),
            Event::GameEffect(GameEffect::CompleteAttackApply),
            Event::PlayerChoice(PlayerChoice::PlayCard {
                side: PlayerSide::Red,
                card: CardId(3),
            }),
            Event::PlayerChoice(PlayerChoice::IssueCommand {
                side: PlayerSide::Blue,
                command: CommandChoice::Move {
                    unit: UnitInstance::new(PlayerSide::Blue, crate::board::UnitTypeId(1), 2),
                    to: Placement::new(Coordinate::from_abbr("D-6").unwrap(), Facing::South),
                },
            }),
            Event::PlayerChoice(PlayerChoice::RespondToFlank {
                side: PlayerSide::Blue,
                response: FlankResponse::Stand,
            }),
        ];
        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let back: Event = serde_json::from_str(&json).unwrap();
            assert_eq!(event, back);
        }
    }

    #[test]
    fn discriminant_fields_are_present() {
        let json = serde_json::to_value(Event::GameEffect(GameEffect::ApplyRetreat)).unwrap();
        assert_eq!(json["eventType"], "gameEffect");
        assert_eq!(json["effectType"], "applyRetreat");

        let json = serde_json::to_value(Event::PlayerChoice(PlayerChoice::CommitCard {
            side: PlayerSide::Red,
            card: None,
        }))
        .unwrap();
        assert_eq!(json["eventType"], "playerChoice");
        assert_eq!(json["choiceType"], "commitCard");
        assert_eq!(json["side"], "red");
    }

    #[test]
    fn unknown_discriminants_are_rejected() {
        let err = serde_json::from_str::<Event>(r#"{"eventType":"gameEffect","effectType":"noSuchEffect"}"#);
        assert!(err.is_err());
        let err = serde_json::from_str::<Event>(r#"{"eventType":"somethingElse"}"#);
        assert!(err.is_err());
    }
}
