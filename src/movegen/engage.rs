//! Engagement legality.
//!
//! Whether a move into an occupied space is a legal engagement depends on
//! which arc of the defender's surroundings the attacker approached from:
//! a flank approach is unconditionally legal, a rear approach requires the
//! whole move to have begun behind the defender, and a frontal approach
//! requires the attacker to already face — or have the flexibility left to
//! turn to — the exact opposite of the defender's facing.

use crate::board::{
    classify_adjacent, is_behind, ApproachArc, BoardState, Coordinate, Facing, Placement,
    PlayerSide,
};
use crate::state::EngagementKind;
use crate::validate;

/// A legal way to engage: the engagement kind, the facing the attacker ends
/// with, and the extra flexibility the final turn costs (0 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementOutcome {
    pub kind: EngagementKind,
    pub facing: Facing,
    pub extra_flexibility: u8,
}

/// Decides whether stepping from `just_vacated` into `target` engages the
/// defender there, for a move that began at `move_start`.
///
/// Returns `None` when the target does not hold exactly one enemy unit or
/// the approach violates the front/flank/rear rules.
pub fn can_engage_enemy(
    board: &BoardState,
    side: PlayerSide,
    target: Coordinate,
    just_vacated: Coordinate,
    move_start: Coordinate,
    current_facing: Facing,
    remaining_flexibility: u8,
) -> Option<EngagementOutcome> {
    let presence = board.presence(target).ok()?;
    if !validate::is_single_enemy(presence, side) {
        return None;
    }
    let (_, defender_facing) = presence.single()?;
    let defender = Placement::new(target, defender_facing);

    match classify_adjacent(defender, just_vacated)? {
        ApproachArc::Flank => Some(EngagementOutcome {
            kind: EngagementKind::Flank,
            facing: current_facing,
            extra_flexibility: 0,
        }),
        ApproachArc::Rear => is_behind(defender, move_start).then_some(EngagementOutcome {
            kind: EngagementKind::Rear,
            facing: current_facing,
            extra_flexibility: 0,
        }),
        ApproachArc::Front => {
            let required = defender_facing.opposite();
            if current_facing == required {
                Some(EngagementOutcome {
                    kind: EngagementKind::Front,
                    facing: required,
                    extra_flexibility: 0,
                })
            } else if remaining_flexibility > 0 {
                Some(EngagementOutcome {
                    kind: EngagementKind::Front,
                    facing: required,
                    extra_flexibility: 1,
                })
            } else {
                None
            }
        }
    }
}
