//! Unit facings.
//!
//! One of eight discrete orientations. All front/flank/rear geometry derives
//! from the circular separation between two facings: 0 or 1 step of 45°
//! counts as front, 2 as flank, 3 or 4 as rear.

use serde::{Deserialize, Serialize};

/// One of the eight directions a unit can face. The derived ordering is
/// clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facing {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

/// All facings in clockwise order starting at north.
pub const ALL_FACINGS: [Facing; 8] = [
    Facing::North,
    Facing::NorthEast,
    Facing::East,
    Facing::SouthEast,
    Facing::South,
    Facing::SouthWest,
    Facing::West,
    Facing::NorthWest,
];

impl Facing {
    /// Returns the (row delta, column delta) of one step in this direction.
    /// North decreases the row, east increases the column.
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Facing::North => (-1, 0),
            Facing::NorthEast => (-1, 1),
            Facing::East => (0, 1),
            Facing::SouthEast => (1, 1),
            Facing::South => (1, 0),
            Facing::SouthWest => (1, -1),
            Facing::West => (0, -1),
            Facing::NorthWest => (-1, -1),
        }
    }

    /// Returns the exact opposite facing.
    pub const fn opposite(self) -> Facing {
        match self {
            Facing::North => Facing::South,
            Facing::NorthEast => Facing::SouthWest,
            Facing::East => Facing::West,
            Facing::SouthEast => Facing::NorthWest,
            Facing::South => Facing::North,
            Facing::SouthWest => Facing::NorthEast,
            Facing::West => Facing::East,
            Facing::NorthWest => Facing::SouthEast,
        }
    }

    /// Returns true for the four diagonal facings.
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Facing::NorthEast | Facing::SouthEast | Facing::SouthWest | Facing::NorthWest
        )
    }

    /// For a diagonal facing, the adjacent orthogonal pair it passes between
    /// (e.g. north-east passes between north and east).
    pub const fn orthogonal_components(self) -> Option<(Facing, Facing)> {
        match self {
            Facing::NorthEast => Some((Facing::North, Facing::East)),
            Facing::SouthEast => Some((Facing::South, Facing::East)),
            Facing::SouthWest => Some((Facing::South, Facing::West)),
            Facing::NorthWest => Some((Facing::North, Facing::West)),
            _ => None,
        }
    }

    /// Clockwise index, north = 0.
    const fn index(self) -> u8 {
        match self {
            Facing::North => 0,
            Facing::NorthEast => 1,
            Facing::East => 2,
            Facing::SouthEast => 3,
            Facing::South => 4,
            Facing::SouthWest => 5,
            Facing::West => 6,
            Facing::NorthWest => 7,
        }
    }

    /// Circular separation between two facings in 45° steps, 0..=4.
    pub const fn separation(self, other: Facing) -> u8 {
        let diff = (self.index() as i8 - other.index() as i8).unsigned_abs() % 8;
        if diff > 4 {
            8 - diff
        } else {
            diff
        }
    }

    /// Builds a facing from a unit step delta.
    pub fn from_delta(dr: i8, dc: i8) -> Option<Facing> {
        ALL_FACINGS.into_iter().find(|f| f.delta() == (dr, dc))
    }

    /// The sign-direction from one coordinate toward another, or `None` for
    /// the same coordinate. For non-aligned pairs this is the quadrant
    /// diagonal.
    pub fn toward(from: crate::board::Coordinate, to: crate::board::Coordinate) -> Option<Facing> {
        let dr = (to.row as i16 - from.row as i16).signum() as i8;
        let dc = (to.col as i16 - from.col as i16).signum() as i8;
        Facing::from_delta(dr, dc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Coordinate;

    #[test]
    fn opposite_is_involutive() {
        for f in ALL_FACINGS {
            assert_eq!(f.opposite().opposite(), f);
            assert_eq!(f.separation(f.opposite()), 4);
        }
    }

    #[test]
    fn separation_is_symmetric() {
        for a in ALL_FACINGS {
            for b in ALL_FACINGS {
                assert_eq!(a.separation(b), b.separation(a));
                assert!(a.separation(b) <= 4);
            }
        }
    }

    #[test]
    fn diagonal_components() {
        let (a, b) = Facing::NorthEast.orthogonal_components().unwrap();
        assert_eq!((a, b), (Facing::North, Facing::East));
        assert_eq!(Facing::North.orthogonal_components(), None);
    }

    #[test]
    fn delta_roundtrip() {
        for f in ALL_FACINGS {
            let (dr, dc) = f.delta();
            assert_eq!(Facing::from_delta(dr, dc), Some(f));
        }
    }

    #[test]
    fn toward_uses_sign_direction() {
        let e5 = Coordinate::from_abbr("E-5").unwrap();
        let d5 = Coordinate::from_abbr("D-5").unwrap();
        let b8 = Coordinate::from_abbr("B-8").unwrap();
        assert_eq!(Facing::toward(e5, d5), Some(Facing::North));
        assert_eq!(Facing::toward(e5, b8), Some(Facing::NorthEast));
        assert_eq!(Facing::toward(e5, e5), None);
    }
}
