//! Standalone engine-vs-engine series runner on Connect Four.
//!
//! Run with:
//! `cargo run --release --bin engine_match_series`
//! `cargo run --release --bin engine_match_series -- --verbose`
//! `RUST_LOG=debug cargo run --release --bin engine_match_series`

use hive_engine::engines::engine_iterative::IterativeEngine;
use hive_engine::engines::engine_trait::{Engine, GoParams};
use hive_engine::errors::SearchResult;
use hive_engine::games::connect_four::ConnectFour;
use hive_engine::search::enumeration_order::EnumerationOrder;
use hive_engine::search::search_config::SearchConfig;
use hive_engine::utils::engine_match_harness::{play_engine_match_series, MatchConfig, MatchSeriesConfig};

fn main() -> SearchResult<()> {
    env_logger::init();
    let verbose = std::env::args().any(|a| a == "--verbose" || a == "-v");

    // Customize these two factories to compare configurations.
    let player1 = || -> SearchResult<Box<dyn Engine<ConnectFour>>> {
        let config = SearchConfig::new().with_cache_budget_bytes(16 * 1024 * 1024)?;
        Ok(Box::new(IterativeEngine::with_name("full-width", config)?))
    };
    let player2 = || -> SearchResult<Box<dyn Engine<ConnectFour>>> {
        let config = SearchConfig::new()
            .with_cache_budget_bytes(16 * 1024 * 1024)?
            .with_max_branching_factor(4)?
            .with_root_order(EnumerationOrder::Skip);
        Ok(Box::new(IterativeEngine::with_name("capped-4", config)?))
    };

    let stats = play_engine_match_series(
        player1,
        player2,
        &ConnectFour::new(),
        MatchSeriesConfig {
            games: 10,
            base_seed: 1234,
            per_game: MatchConfig {
                max_plies: 42,
                opening_min_plies: 2,
                opening_max_plies: 6,
                go_params: GoParams {
                    movetime_ms: Some(50),
                    ..GoParams::default()
                },
            },
            verbose,
        },
    )?;

    println!("{}", stats.report());
    println!("outcomes: {:?}", stats.outcomes);
    Ok(())
}
