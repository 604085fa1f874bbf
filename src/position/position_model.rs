//! Position model consumed by the search.
//!
//! The search never inspects board contents. It enumerates legal moves,
//! makes and unmakes them in place, asks for terminal outcomes and game phase,
//! and reads a feature vector that the heuristic weights turn into a score.

use std::fmt;
use std::str::FromStr;

use crate::errors::PositionResult;
use crate::search::heuristic_weights::HeuristicWeights;

/// Decided result of a finished game, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    SideToMoveWins,
    SideToMoveLoses,
    Draw,
}

/// Coarse game phase used to pick a weight set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Opening,
    Endgame,
}

/// Named evaluation feature values, from the side to move's point of view.
pub type FeatureVector = Vec<(&'static str, f64)>;

pub trait PositionModel: Clone {
    /// Move type. `Display` is the canonical string form used in persisted
    /// tables; `FromStr` must accept what `Display` writes.
    type Move: Clone + PartialEq + fmt::Debug + fmt::Display + FromStr;

    /// 64-bit content hash of board and side to move.
    fn fingerprint(&self) -> u64;

    /// Legal moves for the side to move. Empty only when the game is over.
    fn legal_moves(&self) -> Vec<Self::Move>;

    fn make_move(&mut self, mv: &Self::Move) -> PositionResult<()>;

    fn unmake_move(&mut self) -> PositionResult<()>;

    /// `Some` once the game is decided.
    fn outcome(&self) -> Option<GameOutcome>;

    fn phase(&self) -> GamePhase;

    fn features(&self) -> FeatureVector;

    /// Weights used when a search config leaves the phase's set unset.
    fn default_weights(phase: GamePhase) -> HeuristicWeights;
}
