//! Movement exploration.
//!
//! Enumerates every placement a unit can legally reach from a starting
//! placement, for an advance or a retreat, within its effective speed and
//! flexibility budgets. Depth-first search over the state (coordinate,
//! facing, speed left, flexibility left); the visited set is keyed on that
//! exact tuple so a physical state reached through different action orders
//! is expanded once. Results are deduplicated per (coordinate, facing),
//! keeping the lexicographically minimal (flexibility, speed) cost.

use std::collections::{HashMap, HashSet};

use crate::board::{Coordinate, Facing, Placement, UnitInstance, UnitPresence, ALL_FACINGS};
use crate::cards::{Catalog, ModifiedStat};
use crate::error::EngineError;
use crate::state::{EngagementKind, GameState};
use crate::stats;

use super::engage::can_engage_enemy;

/// The intent a move is explored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    /// Steps go forward along the facing; enemy spaces may be engaged.
    Advance,
    /// Steps go backward along the facing; the unit must actually relocate.
    Retreat,
}

/// Minimum combined flexibility (mover plus occupant) for passing through a
/// friendly-occupied space.
pub const MIN_COMBINED_FLEXIBILITY: u8 = 4;

/// One legal stopping point with the cost that reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reachable {
    pub placement: Placement,
    pub flexibility_used: u8,
    pub speed_used: u8,
    /// Set when stopping here engages an enemy.
    pub engagement: Option<EngagementKind>,
}

/// Enumerates all legal destinations for the unit from `start`.
///
/// Errors when the claimed start placement does not match the board or the
/// unit's type is unknown to the catalogue.
pub fn explore(
    state: &GameState,
    catalog: &Catalog,
    unit: &UnitInstance,
    start: Placement,
    direction: MoveDirection,
) -> Result<Vec<Reachable>, EngineError> {
    let on_board = state
        .board
        .find_unit(unit)
        .ok_or(EngineError::UnitNotFound(*unit))?;
    if on_board != start {
        return Err(EngineError::PlacementMismatch(start.coord));
    }

    let speed = stats::effective_stat_at(state, catalog, unit, start, ModifiedStat::Speed)?;
    let flexibility =
        stats::effective_stat_at(state, catalog, unit, start, ModifiedStat::Flexibility)?;

    let mut explorer = Explorer {
        state,
        catalog,
        unit: *unit,
        start,
        direction,
        total_speed: speed,
        total_flexibility: flexibility,
        visited: HashSet::new(),
        results: HashMap::new(),
    };
    explorer.visit(start.coord, start.facing, speed, flexibility)?;

    let mut out: Vec<Reachable> = explorer
        .results
        .into_iter()
        .map(|(placement, (flexibility_used, speed_used, engagement))| Reachable {
            placement,
            flexibility_used,
            speed_used,
            engagement,
        })
        .collect();
    out.sort_by_key(|r| (r.placement.coord, r.placement.facing));
    Ok(out)
}

/// Carries the search context so the recursion only threads the mutable
/// (coordinate, facing, budgets) state.
struct Explorer<'a> {
    state: &'a GameState,
    catalog: &'a Catalog,
    unit: UnitInstance,
    start: Placement,
    direction: MoveDirection,
    total_speed: u8,
    total_flexibility: u8,
    visited: HashSet<(Coordinate, Facing, u8, u8)>,
    results: HashMap<Placement, (u8, u8, Option<EngagementKind>)>,
}

impl Explorer<'_> {
    fn visit(
        &mut self,
        coord: Coordinate,
        facing: Facing,
        speed_left: u8,
        flex_left: u8,
    ) -> Result<(), EngineError> {
        if !self.visited.insert((coord, facing, speed_left, flex_left)) {
            return Ok(());
        }

        if self.can_stop_at(coord)? {
            self.record(
                Placement::new(coord, facing),
                self.total_flexibility - flex_left,
                self.total_speed - speed_left,
                None,
            );
        }

        if flex_left > 0 {
            for next_facing in ALL_FACINGS {
                if next_facing != facing {
                    self.visit(coord, next_facing, speed_left, flex_left - 1)?;
                }
            }
        }

        if speed_left > 0 {
            self.try_step(coord, facing, speed_left, flex_left)?;
        }
        Ok(())
    }

    /// The direction one step moves the unit, given its facing.
    fn step_direction(&self, facing: Facing) -> Facing {
        match self.direction {
            MoveDirection::Advance => facing,
            MoveDirection::Retreat => facing.opposite(),
        }
    }

    fn try_step(
        &mut self,
        coord: Coordinate,
        facing: Facing,
        speed_left: u8,
        flex_left: u8,
    ) -> Result<(), EngineError> {
        let dir = self.step_direction(facing);
        let (dr, dc) = dir.delta();
        let Some(next) = coord.offset(dr, dc, self.state.board.size()) else {
            return Ok(());
        };

        if dir.is_diagonal() && !self.corner_passable(coord, dir)? {
            return Ok(());
        }

        // The mover's own starting space reads as empty: the unit vacates it.
        if next == self.start.coord || self.state.board.presence(next)?.is_empty() {
            return self.visit(next, facing, speed_left - 1, flex_left);
        }

        match self.state.board.presence(next)? {
            UnitPresence::Single { unit: occupant, .. } if occupant.side == self.unit.side => {
                // Friendly spaces can be passed through, never stopped on.
                if self.combined_flexibility_allows(occupant)? {
                    self.visit(next, facing, speed_left - 1, flex_left)?;
                }
            }
            UnitPresence::Single { .. } => {
                if self.direction == MoveDirection::Advance {
                    let outcome = can_engage_enemy(
                        &self.state.board,
                        self.unit.side,
                        next,
                        coord,
                        self.start.coord,
                        facing,
                        flex_left,
                    );
                    if let Some(outcome) = outcome {
                        self.record(
                            Placement::new(next, outcome.facing),
                            self.total_flexibility - flex_left + outcome.extra_flexibility,
                            self.total_speed - speed_left + 1,
                            Some(outcome.kind),
                        );
                    }
                }
            }
            UnitPresence::Engaged { .. } | UnitPresence::Empty => {}
        }
        Ok(())
    }

    /// A diagonal step needs at least one of its two orthogonal corner cells
    /// to be passable; with both corners blocked the move is illegal even
    /// when the destination itself could be entered.
    fn corner_passable(&self, coord: Coordinate, dir: Facing) -> Result<bool, EngineError> {
        let Some((a, b)) = dir.orthogonal_components() else {
            return Ok(true);
        };
        for component in [a, b] {
            let (dr, dc) = component.delta();
            let Some(corner) = coord.offset(dr, dc, self.state.board.size()) else {
                continue;
            };
            if self.traversable(corner)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the unit could move through this space: empty, its own
    /// starting space, or a friendly occupant flexible enough to let it by.
    fn traversable(&self, coord: Coordinate) -> Result<bool, EngineError> {
        if coord == self.start.coord {
            return Ok(true);
        }
        match self.state.board.presence(coord)? {
            UnitPresence::Empty => Ok(true),
            UnitPresence::Single { unit: occupant, .. } if occupant.side == self.unit.side => {
                self.combined_flexibility_allows(occupant)
            }
            _ => Ok(false),
        }
    }

    fn combined_flexibility_allows(&self, occupant: &UnitInstance) -> Result<bool, EngineError> {
        let occupant_flex = stats::effective_stat(
            self.state,
            self.catalog,
            occupant,
            ModifiedStat::Flexibility,
        )?;
        Ok(self.total_flexibility + occupant_flex >= MIN_COMBINED_FLEXIBILITY)
    }

    fn can_stop_at(&self, coord: Coordinate) -> Result<bool, EngineError> {
        if coord == self.start.coord {
            // A retreat must actually relocate the unit.
            return Ok(self.direction == MoveDirection::Advance);
        }
        Ok(self.state.board.presence(coord)?.is_empty())
    }

    fn record(
        &mut self,
        placement: Placement,
        flexibility_used: u8,
        speed_used: u8,
        engagement: Option<EngagementKind>,
    ) {
        let entry = self
            .results
            .entry(placement)
            .or_insert((flexibility_used, speed_used, engagement));
        if (flexibility_used, speed_used) < (entry.0, entry.1) {
            *entry = (flexibility_used, speed_used, engagement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardSize, BoardState, PerSide, PlayerSide};
    use crate::cards::catalog;
    use crate::cards::PlayerCardState;

    fn c(s: &str) -> Coordinate {
        Coordinate::from_abbr(s).unwrap()
    }

    fn game(board: BoardState) -> GameState {
        GameState::new(
            board,
            PerSide::new(PlayerCardState::default(), PlayerCardState::default()),
            PlayerSide::Red,
        )
    }

    fn find(results: &[Reachable], placement: Placement) -> Option<Reachable> {
        results.iter().copied().find(|r| r.placement == placement)
    }

    #[test]
    fn advance_reaches_straight_line_within_speed() {
        let catalog = Catalog::standard();
        // Levy Spears: speed 2, flexibility 1.
        let unit = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), unit, Facing::North)
            .unwrap();
        let state = game(board);
        let start = Placement::new(c("E-5"), Facing::North);
        let results = explore(&state, &catalog, &unit, start, MoveDirection::Advance).unwrap();

        let one = find(&results, Placement::new(c("D-5"), Facing::North)).unwrap();
        assert_eq!((one.flexibility_used, one.speed_used), (0, 1));
        let two = find(&results, Placement::new(c("C-5"), Facing::North)).unwrap();
        assert_eq!((two.flexibility_used, two.speed_used), (0, 2));
        // Three spaces ahead exceeds speed 2.
        assert!(find(&results, Placement::new(c("B-5"), Facing::North)).is_none());
    }

    #[test]
    fn rotation_in_place_costs_flexibility() {
        let catalog = Catalog::standard();
        let unit = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), unit, Facing::North)
            .unwrap();
        let state = game(board);
        let start = Placement::new(c("E-5"), Facing::North);
        let results = explore(&state, &catalog, &unit, start, MoveDirection::Advance).unwrap();

        // Staying put with the original facing is free.
        let stay = find(&results, start).unwrap();
        assert_eq!((stay.flexibility_used, stay.speed_used), (0, 0));
        // Any other facing costs a flat 1 regardless of the angle spanned.
        for facing in [Facing::NorthEast, Facing::East, Facing::South] {
            let turned = find(&results, Placement::new(c("E-5"), facing)).unwrap();
            assert_eq!((turned.flexibility_used, turned.speed_used), (1, 0));
        }
    }

    #[test]
    fn memoized_results_have_unique_minimal_costs() {
        let catalog = Catalog::standard();
        // Horse Archers: speed 4, flexibility 3 — plenty of redundant paths.
        let unit = UnitInstance::new(PlayerSide::Red, catalog::HORSE_ARCHERS, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), unit, Facing::North)
            .unwrap();
        let state = game(board);
        let start = Placement::new(c("E-5"), Facing::North);
        let results = explore(&state, &catalog, &unit, start, MoveDirection::Advance).unwrap();

        let mut seen = std::collections::HashSet::new();
        for r in &results {
            assert!(seen.insert(r.placement), "duplicate placement {:?}", r.placement);
            assert!(r.flexibility_used <= 3 && r.speed_used <= 4);
        }
        // Bounded by the coordinates reachable within speed, times 8 facings.
        let within_speed = BoardSize::Standard
            .all_coords()
            .into_iter()
            .filter(|co| crate::board::distance(*co, start.coord) <= 4)
            .count();
        assert!(results.len() <= within_speed * 8);
    }

    #[test]
    fn blocked_by_engaged_space() {
        let catalog = Catalog::standard();
        let unit = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let red2 = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 2);
        let blue = UnitInstance::new(PlayerSide::Blue, catalog::LEVY_SPEARS, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), unit, Facing::North)
            .unwrap()
            .with_presence(
                c("D-5"),
                UnitPresence::Engaged {
                    primary: red2,
                    primary_facing: Facing::North,
                    secondary: blue,
                },
            )
            .unwrap();
        let state = game(board);
        let start = Placement::new(c("E-5"), Facing::North);
        let results = explore(&state, &catalog, &unit, start, MoveDirection::Advance).unwrap();
        assert!(results
            .iter()
            .all(|r| r.placement.coord != c("D-5") && r.placement.coord != c("C-5")));
    }

    #[test]
    fn diagonal_needs_a_passable_corner() {
        let catalog = Catalog::standard();
        // Levy Spears have flexibility 1; two of them combined stay below
        // the pass-through minimum, so they block as corners.
        let mover = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let corner_a = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 2);
        let corner_b = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 3);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), mover, Facing::NorthEast)
            .unwrap()
            .place_unit(c("D-5"), corner_a, Facing::North)
            .unwrap()
            .place_unit(c("E-6"), corner_b, Facing::North)
            .unwrap();
        let state = game(board);
        let start = Placement::new(c("E-5"), Facing::NorthEast);
        let results = explore(&state, &catalog, &mover, start, MoveDirection::Advance).unwrap();
        // Both corners blocked: the diagonal to D-6 is illegal.
        assert!(results.iter().all(|r| r.placement.coord != c("D-6")));

        // Free one corner: the diagonal opens up.
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), mover, Facing::NorthEast)
            .unwrap()
            .place_unit(c("D-5"), corner_a, Facing::North)
            .unwrap();
        let state = game(board);
        let results = explore(&state, &catalog, &mover, start, MoveDirection::Advance).unwrap();
        assert!(results.iter().any(|r| r.placement.coord == c("D-6")));
    }

    #[test]
    fn friendly_space_is_pass_through_only() {
        let catalog = Catalog::standard();
        // Horse Archers (flexibility 3) moving past a Guard (flexibility 3):
        // combined 6 clears the minimum of 4.
        let mover = UnitInstance::new(PlayerSide::Red, catalog::HORSE_ARCHERS, 1);
        let guard = UnitInstance::new(PlayerSide::Red, catalog::GUARD, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), mover, Facing::North)
            .unwrap()
            .place_unit(c("D-5"), guard, Facing::North)
            .unwrap();
        let state = game(board);
        let start = Placement::new(c("E-5"), Facing::North);
        let results = explore(&state, &catalog, &mover, start, MoveDirection::Advance).unwrap();
        // Cannot stop on the Guard, but can stop beyond it.
        assert!(results.iter().all(|r| r.placement.coord != c("D-5")));
        assert!(results.iter().any(|r| r.placement.coord == c("C-5")));
    }

    #[test]
    fn inflexible_friend_blocks_passage() {
        let catalog = Catalog::standard();
        // Levy Spears past Levy Spears: combined flexibility 2 < 4.
        let mover = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let blocker = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 2);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), mover, Facing::North)
            .unwrap()
            .place_unit(c("D-5"), blocker, Facing::North)
            .unwrap();
        let state = game(board);
        let start = Placement::new(c("E-5"), Facing::North);
        let results = explore(&state, &catalog, &mover, start, MoveDirection::Advance).unwrap();
        assert!(results
            .iter()
            .all(|r| r.placement.coord != c("D-5") && r.placement.coord != c("C-5")));
    }

    #[test]
    fn advance_emits_engagement_stops() {
        let catalog = Catalog::standard();
        let mover = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let enemy = UnitInstance::new(PlayerSide::Blue, catalog::LEVY_SPEARS, 1);
        // Enemy faces north at D-5; approaching from E-5 northward is a rear
        // approach that began behind.
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), mover, Facing::North)
            .unwrap()
            .place_unit(c("D-5"), enemy, Facing::North)
            .unwrap();
        let state = game(board);
        let start = Placement::new(c("E-5"), Facing::North);
        let results = explore(&state, &catalog, &mover, start, MoveDirection::Advance).unwrap();
        let hit = find(&results, Placement::new(c("D-5"), Facing::North)).unwrap();
        assert_eq!(hit.engagement, Some(EngagementKind::Rear));
        assert_eq!((hit.flexibility_used, hit.speed_used), (0, 1));
    }

    #[test]
    fn retreat_never_stops_at_the_start() {
        let catalog = Catalog::standard();
        let unit = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), unit, Facing::North)
            .unwrap();
        let state = game(board);
        let start = Placement::new(c("E-5"), Facing::North);
        let results = explore(&state, &catalog, &unit, start, MoveDirection::Retreat).unwrap();
        assert!(results.iter().all(|r| r.placement.coord != c("E-5")));
        // A north-facing retreat steps south.
        assert!(results.iter().any(|r| r.placement.coord == c("F-5")));
    }

    #[test]
    fn placement_mismatch_errors() {
        let catalog = Catalog::standard();
        let unit = UnitInstance::new(PlayerSide::Red, catalog::LEVY_SPEARS, 1);
        let board = BoardState::empty(BoardSize::Standard)
            .place_unit(c("E-5"), unit, Facing::North)
            .unwrap();
        let state = game(board);
        let claimed = Placement::new(c("E-6"), Facing::North);
        assert!(matches!(
            explore(&state, &catalog, &unit, claimed, MoveDirection::Advance),
            Err(EngineError::PlacementMismatch(_))
        ));
    }
}
