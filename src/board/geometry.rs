//! Facing-relative board geometry.
//!
//! Pure lookups over a board size: adjacency, the front/flank/rear
//! partition of a placement's neighbours, and the behind half-plane used by
//! rear-engagement and retreat-blocking rules. No state is consulted.

use super::coord::{BoardSize, Coordinate};
use super::facing::{Facing, ALL_FACINGS};
use super::state::Placement;

/// Which arc of a defender's surroundings an adjacent space falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApproachArc {
    Front,
    Flank,
    Rear,
}

/// All on-board spaces adjacent (orthogonally or diagonally) to `coord`.
pub fn adjacent_spaces(coord: Coordinate, size: BoardSize) -> Vec<Coordinate> {
    ALL_FACINGS
        .iter()
        .filter_map(|f| {
            let (dr, dc) = f.delta();
            coord.offset(dr, dc, size)
        })
        .collect()
}

/// Classifies an adjacent coordinate against a placement's facing.
/// Returns `None` when `coord` is not adjacent to the placement.
pub fn classify_adjacent(placement: Placement, coord: Coordinate) -> Option<ApproachArc> {
    let dr = coord.row as i16 - placement.coord.row as i16;
    let dc = coord.col as i16 - placement.coord.col as i16;
    if dr == 0 && dc == 0 || dr.abs() > 1 || dc.abs() > 1 {
        return None;
    }
    let dir = Facing::from_delta(dr as i8, dc as i8)?;
    Some(match dir.separation(placement.facing) {
        0 | 1 => ApproachArc::Front,
        2 => ApproachArc::Flank,
        _ => ApproachArc::Rear,
    })
}

fn arc_spaces(placement: Placement, size: BoardSize, arc: ApproachArc) -> Vec<Coordinate> {
    adjacent_spaces(placement.coord, size)
        .into_iter()
        .filter(|c| classify_adjacent(placement, *c) == Some(arc))
        .collect()
}

/// The up-to-three adjacent spaces in front of a placement.
pub fn front_spaces(placement: Placement, size: BoardSize) -> Vec<Coordinate> {
    arc_spaces(placement, size, ApproachArc::Front)
}

/// The up-to-two adjacent spaces on the placement's flanks.
pub fn flank_spaces(placement: Placement, size: BoardSize) -> Vec<Coordinate> {
    arc_spaces(placement, size, ApproachArc::Flank)
}

/// The up-to-three adjacent spaces behind a placement.
pub fn rear_spaces(placement: Placement, size: BoardSize) -> Vec<Coordinate> {
    arc_spaces(placement, size, ApproachArc::Rear)
}

/// True when `coord` lies strictly behind the placement: the displacement
/// from the placement has a negative dot product with the facing vector.
pub fn is_behind(placement: Placement, coord: Coordinate) -> bool {
    let (fr, fc) = placement.facing.delta();
    let dr = coord.row as i16 - placement.coord.row as i16;
    let dc = coord.col as i16 - placement.coord.col as i16;
    dr * (fr as i16) + dc * (fc as i16) < 0
}

/// Every on-board coordinate strictly behind the placement.
pub fn behind_spaces(placement: Placement, size: BoardSize) -> Vec<Coordinate> {
    size.all_coords()
        .into_iter()
        .filter(|c| is_behind(placement, *c))
        .collect()
}

/// Chebyshev distance between two coordinates; the board metric for command
/// inspiration range and commander movement.
pub fn distance(a: Coordinate, b: Coordinate) -> u8 {
    let dr = (a.row as i16 - b.row as i16).unsigned_abs();
    let dc = (a.col as i16 - b.col as i16).unsigned_abs();
    dr.max(dc) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str, facing: Facing) -> Placement {
        Placement {
            coord: Coordinate::from_abbr(s).unwrap(),
            facing,
        }
    }

    fn c(s: &str) -> Coordinate {
        Coordinate::from_abbr(s).unwrap()
    }

    #[test]
    fn arcs_partition_the_neighbourhood() {
        let p = at("E-5", Facing::North);
        let size = BoardSize::Standard;
        let front = front_spaces(p, size);
        let flank = flank_spaces(p, size);
        let rear = rear_spaces(p, size);
        assert_eq!(front.len() + flank.len() + rear.len(), 8);
        assert!(front.contains(&c("D-5")));
        assert!(front.contains(&c("D-4")));
        assert!(front.contains(&c("D-6")));
        assert!(flank.contains(&c("E-4")));
        assert!(flank.contains(&c("E-6")));
        assert!(rear.contains(&c("F-4")));
        assert!(rear.contains(&c("F-5")));
        assert!(rear.contains(&c("F-6")));
    }

    #[test]
    fn diagonal_facing_arcs() {
        let p = at("E-5", Facing::NorthEast);
        let size = BoardSize::Standard;
        let front = front_spaces(p, size);
        assert!(front.contains(&c("D-5")));
        assert!(front.contains(&c("D-6")));
        assert!(front.contains(&c("E-6")));
        let flank = flank_spaces(p, size);
        assert!(flank.contains(&c("D-4")));
        assert!(flank.contains(&c("F-6")));
    }

    #[test]
    fn behind_is_the_open_half_plane() {
        let p = at("D-5", Facing::North);
        assert!(is_behind(p, c("E-5")));
        assert!(is_behind(p, c("F-5")));
        assert!(is_behind(p, c("F-1")));
        assert!(!is_behind(p, c("C-5")));
        assert!(!is_behind(p, c("D-4")));
        assert!(!is_behind(p, c("D-5")));
    }

    #[test]
    fn edge_placement_has_fewer_neighbours() {
        assert_eq!(adjacent_spaces(c("A-1"), BoardSize::Standard).len(), 3);
        assert_eq!(adjacent_spaces(c("A-5"), BoardSize::Standard).len(), 5);
        assert_eq!(adjacent_spaces(c("E-5"), BoardSize::Standard).len(), 8);
    }

    #[test]
    fn chebyshev_distance() {
        assert_eq!(distance(c("E-5"), c("E-5")), 0);
        assert_eq!(distance(c("E-5"), c("D-6")), 1);
        assert_eq!(distance(c("E-5"), c("B-7")), 3);
    }

    #[test]
    fn classify_rejects_non_adjacent() {
        let p = at("E-5", Facing::North);
        assert_eq!(classify_adjacent(p, c("C-5")), None);
        assert_eq!(classify_adjacent(p, c("E-5")), None);
    }
}
