//! Engine abstraction layer used by front-ends and the match harness.
//!
//! Defines common input parameters and output payloads so different engine
//! strategies can be selected at runtime behind a single trait interface.

use crate::errors::{ConfigError, SearchResult};
use crate::position::position_model::PositionModel;

/// Per-move search controls. Clock fields refer to the side to move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub depth: Option<u32>,
    pub movetime_ms: Option<u64>,
    pub remaining_ms: Option<u64>,
    pub increment_ms: Option<u64>,
    pub movestogo: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput<M> {
    /// `None` only when the position has no legal move.
    pub best_move: Option<M>,
    pub score: Option<f64>,
    pub depth: u32,
    pub info_lines: Vec<String>,
}

impl<M> Default for EngineOutput<M> {
    fn default() -> Self {
        Self {
            best_move: None,
            score: None,
            depth: 0,
            info_lines: Vec::new(),
        }
    }
}

pub trait Engine<P: PositionModel> {
    fn name(&self) -> &str;

    fn new_game(&mut self) {}

    fn set_option(&mut self, name: &str, _value: &str) -> SearchResult<()> {
        Err(ConfigError::UnknownOption(name.to_owned()).into())
    }

    fn choose_move(&mut self, position: &P, params: &GoParams) -> SearchResult<EngineOutput<P::Move>>;
}
