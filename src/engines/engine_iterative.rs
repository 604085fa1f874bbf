//! Iterative-deepening engine over the generic search.
//!
//! Wraps `SearchEngine` with clock handling and text options so a front-end
//! or the match harness can drive it through the `Engine` trait.

use std::time::Instant;

use crate::engines::engine_trait::{Engine, EngineOutput, GoParams};
use crate::engines::time_management::{resolve_go_params, search_deadline, TimeManagementStrategy};
use crate::errors::{ConfigError, SearchResult};
use crate::position::position_model::PositionModel;
use crate::search::search_config::SearchConfig;
use crate::search::search_engine::{SearchEngine, SearchOutcome, SearchReport};

/// Upper bound on principal variation length in output.
const MAX_PV_LEN: usize = 16;

pub struct IterativeEngine<P: PositionModel> {
    name: String,
    search: SearchEngine<P>,
    time_strategy: TimeManagementStrategy,
}

impl<P: PositionModel> IterativeEngine<P> {
    pub fn new(config: SearchConfig<P::Move>) -> SearchResult<Self> {
        Self::with_name("iterative", config)
    }

    pub fn with_name(name: &str, config: SearchConfig<P::Move>) -> SearchResult<Self> {
        Ok(Self {
            name: name.to_owned(),
            search: SearchEngine::new(config)?,
            time_strategy: TimeManagementStrategy::default(),
        })
    }

    pub fn time_strategy(&self) -> TimeManagementStrategy {
        self.time_strategy
    }

    pub fn search_engine(&self) -> &SearchEngine<P> {
        &self.search
    }

    pub fn search_engine_mut(&mut self) -> &mut SearchEngine<P> {
        &mut self.search
    }

    fn build_info_lines(&self, position: &P, report: &SearchReport<P::Move>, resolved: &GoParams) -> Vec<String> {
        let mut lines = Vec::new();

        let score = report
            .outcome
            .best_move()
            .map_or_else(|| "none".to_owned(), |best| format!("{:.3}", best.score));
        lines.push(format!(
            "info depth {} score {} nodes {} time {} nps {}",
            report.completed_depth, score, report.nodes, report.elapsed_ms, report.nps
        ));
        lines.push(format!("info string {} stop {:?}", self.name, report.stop_reason));
        lines.push(format!(
            "info string {} time_strategy {} movetime_ms {:?}",
            self.name, self.time_strategy, resolved.movetime_ms
        ));
        lines.push(format!(
            "info string table lookups {} hits {} stores {} evictions {} size_entries {}",
            report.table_stats.lookups,
            report.table_stats.hits,
            report.table_stats.stores,
            report.table_stats.evictions,
            self.search.table().len()
        ));

        let pv = self.search.principal_variation(position, MAX_PV_LEN);
        if !pv.is_empty() {
            let text: Vec<String> = pv.iter().map(ToString::to_string).collect();
            lines.push(format!("info pv {}", text.join(" ")));
        }
        lines
    }
}

impl<P: PositionModel> Engine<P> for IterativeEngine<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn new_game(&mut self) {
        self.search.new_game();
    }

    fn set_option(&mut self, name: &str, value: &str) -> SearchResult<()> {
        if name.trim().eq_ignore_ascii_case("TimeStrategy") {
            self.time_strategy = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: name.to_owned(),
                value: value.to_owned(),
            })?;
            return Ok(());
        }
        self.search.set_option(name, value)
    }

    fn choose_move(&mut self, position: &P, params: &GoParams) -> SearchResult<EngineOutput<P::Move>> {
        let started_at = Instant::now();
        let resolved = resolve_go_params(position, params, self.time_strategy);
        let deadline = search_deadline(&resolved, started_at);
        let max_depth = resolved.depth.or(self.search.config().max_depth());

        let report = self.search.search_with_depth(position, deadline, max_depth)?;
        let info_lines = self.build_info_lines(position, &report, &resolved);

        Ok(match report.outcome {
            SearchOutcome::Found(best) => EngineOutput {
                best_move: Some(best.mv),
                score: Some(best.score),
                depth: best.depth,
                info_lines,
            },
            SearchOutcome::NoLegalMove => EngineOutput {
                info_lines,
                ..EngineOutput::default()
            },
        })
    }
}
