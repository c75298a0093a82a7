//! Command cards and per-player piles.
//!
//! A command card carries an initiative value, a command budget for the
//! issue-commands phase, modifiers that apply to commanded units while the
//! card is in play, an optional round effect, and its fate after the round.
//! Card data itself lives in the injected [`Catalog`](catalog::Catalog).

pub mod catalog;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{PerSide, UnitTrait, UnitTypeId};

pub use catalog::Catalog;

/// Catalogue key for a command card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub u16);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// The stat a modifier adjusts. `Defense` adjusts the rout, retreat, and
/// reverse thresholds uniformly; every other variant adjusts only its named
/// stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifiedStat {
    Attack,
    RangedAttack,
    Speed,
    Flexibility,
    Rout,
    Retreat,
    Reverse,
    Defense,
}

/// Conditions a unit must satisfy for a modifier to apply. Empty lists do
/// not restrict; the lists are any-of.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModifierRestrictions {
    /// Maximum Chebyshev distance from an own commander.
    pub inspiration_range: Option<u8>,
    pub traits: Vec<UnitTrait>,
    pub units: Vec<UnitTypeId>,
}

impl ModifierRestrictions {
    pub fn none() -> Self {
        Self::default()
    }
}

/// A single stat adjustment carried by a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: ModifiedStat,
    pub amount: i8,
    pub restrictions: ModifierRestrictions,
}

impl StatModifier {
    /// An unrestricted modifier.
    pub fn new(stat: ModifiedStat, amount: i8) -> Self {
        StatModifier {
            stat,
            amount,
            restrictions: ModifierRestrictions::none(),
        }
    }
}

/// A card effect that lasts for the whole round, applying to every owned
/// unit that satisfies the restrictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEffect {
    pub modifiers: Vec<StatModifier>,
}

/// What happens to a card when the round it was played in ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardFate {
    /// Goes to the played pile and may come back later.
    Return,
    /// Goes to the discarded pile.
    Discard,
    /// Removed from the game.
    Burn,
}

/// A command card definition as stored in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCard {
    pub name: String,
    pub initiative: u8,
    /// Commands granted for the issue-commands phase.
    pub commands: u8,
    /// Modifiers applied to the owner's commanded units while in play, and
    /// contributed when this card is committed to a resolution.
    pub modifiers: Vec<StatModifier>,
    pub round_effect: Option<RoundEffect>,
    pub fate: CardFate,
}

/// One player's card piles.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerCardState {
    pub hand: Vec<CardId>,
    pub awaiting_play: Option<CardId>,
    pub in_play: Option<CardId>,
    pub played: Vec<CardId>,
    pub discarded: Vec<CardId>,
    pub burnt: Vec<CardId>,
}

impl PlayerCardState {
    pub fn with_hand(hand: Vec<CardId>) -> Self {
        PlayerCardState {
            hand,
            ..Default::default()
        }
    }

    /// Removes a card from the hand, returning false if it was not there.
    pub fn take_from_hand(&mut self, card: CardId) -> bool {
        match self.hand.iter().position(|c| *c == card) {
            Some(i) => {
                self.hand.remove(i);
                true
            }
            None => false,
        }
    }
}

/// Both players' piles.
pub type CardState = PerSide<PlayerCardState>;

/// Routes a spent card to the pile its fate names.
pub fn settle_card(piles: &mut PlayerCardState, card: CardId, fate: CardFate) {
    match fate {
        CardFate::Return => piles.played.push(card),
        CardFate::Discard => piles.discarded.push(card),
        CardFate::Burn => piles.burnt.push(card),
    }
}

/// True when the modifier adjusts the queried stat: an exact match, or a
/// defense modifier against any of the three thresholds.
pub fn modifier_applies(stat: ModifiedStat, query: ModifiedStat) -> bool {
    stat == query
        || (stat == ModifiedStat::Defense
            && matches!(
                query,
                ModifiedStat::Rout | ModifiedStat::Retreat | ModifiedStat::Reverse
            ))
}

/// Convenience for tests and setup.
pub fn card_state_with_hands(red: Vec<CardId>, blue: Vec<CardId>) -> CardState {
    PerSide::new(
        PlayerCardState::with_hand(red),
        PlayerCardState::with_hand(blue),
    )
}
