//! Crate root module declarations for the board game search engine.
//!
//! This file exposes all top-level subsystems (position model contract,
//! bounded caches, search, engines, a reference game and utility helpers) so
//! binaries, benches and external tooling can import stable module paths.

pub mod errors;

pub mod position {
    pub mod position_model;
}

pub mod cache {
    pub mod bounded_cache;
    pub mod table_io;
    pub mod transposition_table;
}

pub mod search {
    pub mod enumeration_order;
    pub mod heuristic_weights;
    pub mod move_ranking;
    pub mod search_config;
    pub mod search_engine;
}

pub mod engines {
    pub mod engine_iterative;
    pub mod engine_trait;
    pub mod time_management;
}

pub mod games {
    pub mod connect_four;
}

pub mod utils {
    pub mod engine_match_harness;
}
