//! Minimal head-to-head engine match harness for local testing.
//!
//! This module runs two `Engine` implementations against each other on any
//! position model, with an optional seeded random opening prefix.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;

use log::info;

use crate::engines::engine_trait::{Engine, GoParams};
use crate::errors::{PositionError, SearchResult};
use crate::position::position_model::{GameOutcome, PositionModel};

/// Which side of the board, by move order from the starting position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    fn to_move_at(ply: usize) -> Self {
        if ply % 2 == 0 {
            Seat::First
        } else {
            Seat::Second
        }
    }

    fn opposite(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Win(Seat),
    Draw,
    DrawMaxPlies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerId {
    Player1,
    Player2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesOutcome {
    PlayerWin { player: PlayerId, seat: Seat },
    Draw,
    DrawMaxPlies,
}

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub max_plies: u16,
    pub opening_min_plies: u8,
    pub opening_max_plies: u8,
    pub go_params: GoParams,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_plies: 300,
            opening_min_plies: 2,
            opening_max_plies: 8,
            go_params: GoParams::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchResult<P> {
    pub outcome: MatchOutcome,
    pub final_position: P,
    pub opening_moves: Vec<String>,
    pub played_moves: Vec<String>,
    pub first_move_count: u32,
    pub second_move_count: u32,
    pub first_total_time_ns: u128,
    pub second_total_time_ns: u128,
}

#[derive(Debug, Clone)]
pub struct MatchSeriesConfig {
    pub games: u16,
    pub base_seed: u64,
    pub per_game: MatchConfig,
    pub verbose: bool,
}

impl Default for MatchSeriesConfig {
    fn default() -> Self {
        Self {
            games: 9,
            base_seed: 0,
            per_game: MatchConfig::default(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchSeriesStats {
    pub games: u16,
    pub player1_wins: u16,
    pub player2_wins: u16,
    pub draws: u16,
    pub outcomes: Vec<SeriesOutcome>,
    pub player1_moves: u32,
    pub player2_moves: u32,
    pub player1_total_time_ns: u128,
    pub player2_total_time_ns: u128,
    pub player1_avg_move_time_ms: f64,
    pub player2_avg_move_time_ms: f64,
    pub overall_avg_move_time_ms: f64,
}

impl MatchSeriesStats {
    pub fn report(&self) -> String {
        format!(
            "games={} player1_wins={} player2_wins={} draws={} p1_avg_ms={:.3} p2_avg_ms={:.3} overall_avg_ms={:.3}",
            self.games,
            self.player1_wins,
            self.player2_wins,
            self.draws,
            self.player1_avg_move_time_ms,
            self.player2_avg_move_time_ms,
            self.overall_avg_move_time_ms
        )
    }
}

/// Play a single seeded engine-vs-engine match.
///
/// `engine_first` plays the side to move at `start`; the random opening
/// prefix may hand the first engine move to either seat.
pub fn play_engine_match<P: PositionModel + 'static>(
    mut engine_first: Box<dyn Engine<P>>,
    mut engine_second: Box<dyn Engine<P>>,
    start: &P,
    seed: u64,
    config: MatchConfig,
) -> SearchResult<MatchResult<P>> {
    engine_first.new_game();
    engine_second.new_game();

    let (mut position, opening_moves) = apply_seeded_random_opening(
        start,
        seed,
        config.opening_min_plies,
        config.opening_max_plies,
    )?;

    let mut result = MatchResult {
        outcome: MatchOutcome::DrawMaxPlies,
        final_position: start.clone(),
        opening_moves,
        played_moves: Vec::new(),
        first_move_count: 0,
        second_move_count: 0,
        first_total_time_ns: 0,
        second_total_time_ns: 0,
    };
    let mut ply = result.opening_moves.len();

    for _ in 0..config.max_plies {
        let mover = Seat::to_move_at(ply);
        let legal_moves = position.legal_moves();

        if let Some(outcome) = position.outcome() {
            result.outcome = match outcome {
                GameOutcome::SideToMoveWins => MatchOutcome::Win(mover),
                GameOutcome::SideToMoveLoses => MatchOutcome::Win(mover.opposite()),
                GameOutcome::Draw => MatchOutcome::Draw,
            };
            result.final_position = position;
            return Ok(result);
        }
        if legal_moves.is_empty() {
            result.outcome = MatchOutcome::Draw;
            result.final_position = position;
            return Ok(result);
        }

        let started = Instant::now();
        let out = match mover {
            Seat::First => engine_first.choose_move(&position, &config.go_params)?,
            Seat::Second => engine_second.choose_move(&position, &config.go_params)?,
        };
        let elapsed_ns = started.elapsed().as_nanos();

        match mover {
            Seat::First => {
                result.first_move_count = result.first_move_count.saturating_add(1);
                result.first_total_time_ns = result.first_total_time_ns.saturating_add(elapsed_ns);
            }
            Seat::Second => {
                result.second_move_count = result.second_move_count.saturating_add(1);
                result.second_total_time_ns = result.second_total_time_ns.saturating_add(elapsed_ns);
            }
        }

        let chosen = out.best_move.ok_or_else(|| {
            PositionError::Inconsistent("engine returned no move with legal moves available".to_owned())
        })?;
        if !legal_moves.contains(&chosen) {
            return Err(PositionError::IllegalMove(chosen.to_string()).into());
        }

        result.played_moves.push(chosen.to_string());
        position.make_move(&chosen)?;
        ply += 1;
    }

    result.final_position = position;
    Ok(result)
}

/// Play a series of matches and aggregate win/loss/draw statistics.
///
/// Seats are randomized each game (deterministic from `base_seed`).
pub fn play_engine_match_series<P, F1, F2>(
    player1_factory: F1,
    player2_factory: F2,
    start: &P,
    config: MatchSeriesConfig,
) -> SearchResult<MatchSeriesStats>
where
    P: PositionModel + 'static,
    F1: Fn() -> SearchResult<Box<dyn Engine<P>>>,
    F2: Fn() -> SearchResult<Box<dyn Engine<P>>>,
{
    let mut stats = MatchSeriesStats {
        games: config.games,
        ..MatchSeriesStats::default()
    };
    let mut seat_rng = StdRng::seed_from_u64(config.base_seed ^ 0xA5A5_5A5A_0123_4567);

    for i in 0..config.games {
        let player1_first = seat_rng.random_bool(0.5);
        let seed = config.base_seed.wrapping_add(u64::from(i));
        if config.verbose {
            let (first, second) = if player1_first {
                ("Player1", "Player2")
            } else {
                ("Player2", "Player1")
            };
            println!(
                "[series] game {}/{} seed={} first={} second={}",
                i + 1,
                config.games,
                seed,
                first,
                second
            );
        }

        let result = if player1_first {
            play_engine_match(player1_factory()?, player2_factory()?, start, seed, config.per_game.clone())?
        } else {
            play_engine_match(player2_factory()?, player1_factory()?, start, seed, config.per_game.clone())?
        };

        let (p1_moves, p2_moves, p1_ns, p2_ns) = if player1_first {
            (
                result.first_move_count,
                result.second_move_count,
                result.first_total_time_ns,
                result.second_total_time_ns,
            )
        } else {
            (
                result.second_move_count,
                result.first_move_count,
                result.second_total_time_ns,
                result.first_total_time_ns,
            )
        };
        stats.player1_moves = stats.player1_moves.saturating_add(p1_moves);
        stats.player2_moves = stats.player2_moves.saturating_add(p2_moves);
        stats.player1_total_time_ns = stats.player1_total_time_ns.saturating_add(p1_ns);
        stats.player2_total_time_ns = stats.player2_total_time_ns.saturating_add(p2_ns);

        let mapped = match result.outcome {
            MatchOutcome::Win(seat) => {
                let player = match (seat, player1_first) {
                    (Seat::First, true) | (Seat::Second, false) => PlayerId::Player1,
                    _ => PlayerId::Player2,
                };
                match player {
                    PlayerId::Player1 => stats.player1_wins += 1,
                    PlayerId::Player2 => stats.player2_wins += 1,
                }
                SeriesOutcome::PlayerWin { player, seat }
            }
            MatchOutcome::Draw => {
                stats.draws += 1;
                SeriesOutcome::Draw
            }
            MatchOutcome::DrawMaxPlies => {
                stats.draws += 1;
                SeriesOutcome::DrawMaxPlies
            }
        };
        stats.outcomes.push(mapped);
        info!("game {}/{} seed {seed}: {mapped:?}", i + 1, config.games);

        if config.verbose {
            println!(
                "[series] game {}/{} result={:?} moves={} p1_wins={} p2_wins={} draws={}\n",
                i + 1,
                config.games,
                mapped,
                result.played_moves.join(" "),
                stats.player1_wins,
                stats.player2_wins,
                stats.draws
            );
        }
    }

    stats.player1_avg_move_time_ms = avg_ns_per_move_ms(stats.player1_total_time_ns, stats.player1_moves);
    stats.player2_avg_move_time_ms = avg_ns_per_move_ms(stats.player2_total_time_ns, stats.player2_moves);

    let total_ns = stats
        .player1_total_time_ns
        .saturating_add(stats.player2_total_time_ns);
    let total_moves = stats.player1_moves.saturating_add(stats.player2_moves);
    stats.overall_avg_move_time_ms = avg_ns_per_move_ms(total_ns, total_moves);

    Ok(stats)
}

#[inline]
fn avg_ns_per_move_ms(total_ns: u128, moves: u32) -> f64 {
    if moves == 0 {
        0.0
    } else {
        (total_ns as f64) / (moves as f64) / 1_000_000.0
    }
}

/// Play a seeded number of uniformly random legal moves from `initial`.
/// Stops early if the game ends.
fn apply_seeded_random_opening<P: PositionModel>(
    initial: &P,
    seed: u64,
    min_plies: u8,
    max_plies: u8,
) -> SearchResult<(P, Vec<String>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut position = initial.clone();
    let mut opening_moves = Vec::<String>::new();

    let low = min_plies.min(max_plies);
    let high = max_plies.max(min_plies);
    let target_plies = if low == high {
        low
    } else {
        rng.random_range(low..=high)
    };

    for _ in 0..target_plies {
        if position.outcome().is_some() {
            break;
        }
        let legal_moves = position.legal_moves();
        if legal_moves.is_empty() {
            break;
        }
        let chosen = &legal_moves[rng.random_range(0..legal_moves.len())];
        opening_moves.push(chosen.to_string());
        position.make_move(chosen)?;
    }

    Ok((position, opening_moves))
}
