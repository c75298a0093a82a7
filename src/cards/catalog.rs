//! The unit-type and command-card catalogue.
//!
//! A read-only table injected into every function that needs a lookup,
//! never a module-level singleton, so tests can run against alternate
//! catalogues. [`Catalog::standard`] builds the sample set the game ships
//! with.

use std::collections::HashMap;

use crate::board::{
    RangedProfile, UnitStats, UnitTrait, UnitTypeDef, UnitTypeId,
};
use crate::error::EngineError;

use super::{
    CardFate, CardId, CommandCard, ModifiedStat, ModifierRestrictions, RoundEffect, StatModifier,
};

/// Standard unit type ids.
pub const LEVY_SPEARS: UnitTypeId = UnitTypeId(1);
pub const SHIELD_WALL: UnitTypeId = UnitTypeId(2);
pub const HORSE_ARCHERS: UnitTypeId = UnitTypeId(3);
pub const HEAVY_HORSE: UnitTypeId = UnitTypeId(4);
pub const LONGBOWS: UnitTypeId = UnitTypeId(5);
pub const GUARD: UnitTypeId = UnitTypeId(6);

/// Standard card ids.
pub const FORCED_MARCH: CardId = CardId(1);
pub const SHIELD_DRILL: CardId = CardId(2);
pub const RALLY_BANNER: CardId = CardId(3);
pub const FLANKING_ORDER: CardId = CardId(4);
pub const BERSERK_CHARGE: CardId = CardId(5);
pub const HOLD_THE_LINE: CardId = CardId(6);
pub const VOLLEY_FIRE: CardId = CardId(7);
pub const FEIGNED_RETREAT: CardId = CardId(8);

/// Read-only rule tables: unit types and command cards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    unit_types: HashMap<UnitTypeId, UnitTypeDef>,
    cards: HashMap<CardId, CommandCard>,
}

impl Catalog {
    /// An empty catalogue; add entries with [`Catalog::with_unit_type`] and
    /// [`Catalog::with_card`].
    pub fn new() -> Catalog {
        Catalog::default()
    }

    pub fn with_unit_type(mut self, id: UnitTypeId, def: UnitTypeDef) -> Catalog {
        self.unit_types.insert(id, def);
        self
    }

    pub fn with_card(mut self, id: CardId, card: CommandCard) -> Catalog {
        self.cards.insert(id, card);
        self
    }

    pub fn unit_type(&self, id: UnitTypeId) -> Result<&UnitTypeDef, EngineError> {
        self.unit_types
            .get(&id)
            .ok_or(EngineError::UnknownUnitType(id.0))
    }

    pub fn card(&self, id: CardId) -> Result<&CommandCard, EngineError> {
        self.cards.get(&id).ok_or(EngineError::UnknownCard(id.0))
    }

    /// The sample catalogue: six unit types and eight command cards.
    pub fn standard() -> Catalog {
        let mut catalog = Catalog::new();

        let mut unit = |id: UnitTypeId, name: &str, stats: UnitStats, traits: &[UnitTrait]| {
            catalog.unit_types.insert(
                id,
                UnitTypeDef {
                    name: name.to_string(),
                    stats,
                    traits: traits.to_vec(),
                },
            );
        };

        unit(
            LEVY_SPEARS,
            "Levy Spears",
            UnitStats {
                attack: 3,
                ranged: None,
                speed: 2,
                flexibility: 1,
                rout: 6,
                retreat: 4,
                reverse: 3,
            },
            &[UnitTrait::Infantry],
        );
        unit(
            SHIELD_WALL,
            "Shield Wall",
            UnitStats {
                attack: 4,
                ranged: None,
                speed: 2,
                flexibility: 2,
                rout: 7,
                retreat: 5,
                reverse: 4,
            },
            &[UnitTrait::Infantry, UnitTrait::Shielded],
        );
        unit(
            HORSE_ARCHERS,
            "Horse Archers",
            UnitStats {
                attack: 2,
                ranged: Some(RangedProfile { value: 3, range: 3 }),
                speed: 4,
                flexibility: 3,
                rout: 5,
                retreat: 3,
                reverse: 3,
            },
            &[UnitTrait::Cavalry, UnitTrait::Missile, UnitTrait::Skirmish],
        );
        unit(
            HEAVY_HORSE,
            "Heavy Horse",
            UnitStats {
                attack: 5,
                ranged: None,
                speed: 4,
                flexibility: 2,
                rout: 6,
                retreat: 4,
                reverse: 4,
            },
            &[UnitTrait::Cavalry],
        );
        unit(
            LONGBOWS,
            "Longbows",
            UnitStats {
                attack: 2,
                ranged: Some(RangedProfile { value: 4, range: 4 }),
                speed: 2,
                flexibility: 2,
                rout: 5,
                retreat: 3,
                reverse: 2,
            },
            &[UnitTrait::Missile],
        );
        unit(
            GUARD,
            "Guard",
            UnitStats {
                attack: 5,
                ranged: None,
                speed: 2,
                flexibility: 3,
                rout: 8,
                retreat: 6,
                reverse: 5,
            },
            &[UnitTrait::Infantry, UnitTrait::Shielded],
        );

        let mut card = |id: CardId, c: CommandCard| {
            catalog.cards.insert(id, c);
        };

        card(
            FORCED_MARCH,
            CommandCard {
                name: "Forced March".to_string(),
                initiative: 2,
                commands: 3,
                modifiers: vec![StatModifier::new(ModifiedStat::Speed, 1)],
                round_effect: None,
                fate: CardFate::Return,
            },
        );
        card(
            SHIELD_DRILL,
            CommandCard {
                name: "Shield Drill".to_string(),
                initiative: 3,
                commands: 2,
                modifiers: vec![StatModifier::new(ModifiedStat::Defense, 1)],
                round_effect: None,
                fate: CardFate::Discard,
            },
        );
        card(
            RALLY_BANNER,
            CommandCard {
                name: "Rally Banner".to_string(),
                initiative: 4,
                commands: 2,
                modifiers: vec![],
                round_effect: Some(RoundEffect {
                    modifiers: vec![StatModifier {
                        stat: ModifiedStat::Rout,
                        amount: 1,
                        restrictions: ModifierRestrictions {
                            inspiration_range: Some(2),
                            ..ModifierRestrictions::none()
                        },
                    }],
                }),
                fate: CardFate::Discard,
            },
        );
        card(
            FLANKING_ORDER,
            CommandCard {
                name: "Flanking Order".to_string(),
                initiative: 5,
                commands: 2,
                modifiers: vec![StatModifier::new(ModifiedStat::Flexibility, 1)],
                round_effect: None,
                fate: CardFate::Return,
            },
        );
        card(
            BERSERK_CHARGE,
            CommandCard {
                name: "Berserk Charge".to_string(),
                initiative: 6,
                commands: 1,
                modifiers: vec![StatModifier {
                    stat: ModifiedStat::Attack,
                    amount: 2,
                    restrictions: ModifierRestrictions {
                        traits: vec![UnitTrait::Cavalry],
                        ..ModifierRestrictions::none()
                    },
                }],
                round_effect: None,
                fate: CardFate::Burn,
            },
        );
        card(
            HOLD_THE_LINE,
            CommandCard {
                name: "Hold the Line".to_string(),
                initiative: 1,
                commands: 2,
                modifiers: vec![],
                round_effect: Some(RoundEffect {
                    modifiers: vec![StatModifier {
                        stat: ModifiedStat::Defense,
                        amount: 1,
                        restrictions: ModifierRestrictions {
                            traits: vec![UnitTrait::Infantry],
                            ..ModifierRestrictions::none()
                        },
                    }],
                }),
                fate: CardFate::Discard,
            },
        );
        card(
            VOLLEY_FIRE,
            CommandCard {
                name: "Volley Fire".to_string(),
                initiative: 3,
                commands: 2,
                modifiers: vec![StatModifier {
                    stat: ModifiedStat::RangedAttack,
                    amount: 1,
                    restrictions: ModifierRestrictions {
                        traits: vec![UnitTrait::Missile],
                        ..ModifierRestrictions::none()
                    },
                }],
                round_effect: None,
                fate: CardFate::Discard,
            },
        );
        card(
            FEIGNED_RETREAT,
            CommandCard {
                name: "Feigned Retreat".to_string(),
                initiative: 4,
                commands: 2,
                modifiers: vec![StatModifier {
                    stat: ModifiedStat::Speed,
                    amount: 1,
                    restrictions: ModifierRestrictions {
                        traits: vec![UnitTrait::Skirmish],
                        ..ModifierRestrictions::none()
                    },
                }],
                round_effect: None,
                fate: CardFate::Return,
            },
        );

        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_complete() {
        let catalog = Catalog::standard();
        for id in [
            LEVY_SPEARS,
            SHIELD_WALL,
            HORSE_ARCHERS,
            HEAVY_HORSE,
            LONGBOWS,
            GUARD,
        ] {
            assert!(catalog.unit_type(id).is_ok());
        }
        for id in [
            FORCED_MARCH,
            SHIELD_DRILL,
            RALLY_BANNER,
            FLANKING_ORDER,
            BERSERK_CHARGE,
            HOLD_THE_LINE,
            VOLLEY_FIRE,
            FEIGNED_RETREAT,
        ] {
            assert!(catalog.card(id).is_ok());
        }
    }

    #[test]
    fn unknown_ids_error() {
        let catalog = Catalog::standard();
        assert_eq!(
            catalog.unit_type(UnitTypeId(99)),
            Err(EngineError::UnknownUnitType(99))
        );
        assert_eq!(catalog.card(CardId(99)), Err(EngineError::UnknownCard(99)));
    }

    #[test]
    fn alternate_catalogues_are_first_class() {
        let catalog = Catalog::new().with_unit_type(
            UnitTypeId(42),
            UnitTypeDef {
                name: "Test Militia".to_string(),
                stats: UnitStats {
                    attack: 1,
                    ranged: None,
                    speed: 1,
                    flexibility: 1,
                    rout: 2,
                    retreat: 2,
                    reverse: 2,
                },
                traits: vec![],
            },
        );
        assert!(catalog.unit_type(UnitTypeId(42)).is_ok());
        assert!(catalog.unit_type(LEVY_SPEARS).is_err());
    }
}
