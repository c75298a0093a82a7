//! Phalanx engine library.
//!
//! A deterministic, event-sourced rules engine for a two-player,
//! facing-based, grid tactical wargame. State is immutable; the
//! [`oracle`] derives the single next expected event and the
//! [`event`] transform engine applies it, producing a new state with
//! structural sharing of everything untouched.

pub mod board;
pub mod cards;
pub mod combat;
pub mod error;
pub mod event;
pub mod movegen;
pub mod oracle;
pub mod playout;
pub mod state;
pub mod stats;
pub mod validate;
