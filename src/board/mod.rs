//! Board representation and geometry.
//!
//! Contains the core data structures for coordinates, facings, spaces,
//! units, and the board snapshot, plus the facing-relative geometry queries
//! every other module is built on.

pub mod coord;
pub mod facing;
pub mod geometry;
pub mod space;
pub mod state;
pub mod unit;

pub use coord::{BoardSize, Coordinate};
pub use facing::{Facing, ALL_FACINGS};
pub use geometry::{
    adjacent_spaces, behind_spaces, classify_adjacent, distance, flank_spaces, front_spaces,
    is_behind, rear_spaces, ApproachArc,
};
pub use space::{Edge, Space, Terrain, UnitPresence};
pub use state::{BoardState, Placement};
pub use unit::{
    PerSide, PlayerSide, RangedProfile, UnitInstance, UnitStats, UnitTrait, UnitTypeDef,
    UnitTypeId, ALL_SIDES,
};
