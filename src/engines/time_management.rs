//! Reusable time-management strategies for engine move budgeting.
//!
//! Callers pass raw clock data (`remaining/increment/movetime`) and the engine
//! decides the final per-move allocation based on strategy, then turns it
//! into a search deadline.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::engines::engine_trait::GoParams;
use crate::position::position_model::{GamePhase, PositionModel};

/// Budget used when neither a movetime, a clock nor a depth is given.
pub const DEFAULT_MOVETIME_MS: u64 = 1_000;
/// Deadline horizon for depth-only searches.
const UNBOUNDED_SEARCH: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeManagementStrategy {
    /// Fixed rule: spend 1/20th of remaining clock.
    Fraction20,
    /// Adaptive rule using clock, increment and game phase.
    #[default]
    Adaptive,
}

impl fmt::Display for TimeManagementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeManagementStrategy::Fraction20 => f.write_str("Fraction20"),
            TimeManagementStrategy::Adaptive => f.write_str("Adaptive"),
        }
    }
}

impl FromStr for TimeManagementStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adaptive" => Ok(TimeManagementStrategy::Adaptive),
            "fraction20" | "legacy" | "simple" => Ok(TimeManagementStrategy::Fraction20),
            _ => Err(format!("unknown time strategy '{s}'")),
        }
    }
}

/// Fill in `movetime_ms` from the clock when the caller did not fix one.
pub fn resolve_go_params<P: PositionModel>(
    position: &P,
    params: &GoParams,
    strategy: TimeManagementStrategy,
) -> GoParams {
    if params.movetime_ms.is_some() {
        return params.clone();
    }

    let mut resolved = params.clone();
    if let Some(remaining) = params.remaining_ms {
        resolved.movetime_ms = Some(match strategy {
            TimeManagementStrategy::Fraction20 => (remaining / 20).max(1),
            TimeManagementStrategy::Adaptive => {
                adaptive_budget_ms(position.phase(), remaining, params.increment_ms, params.movestogo)
            }
        });
    }

    resolved
}

/// Deadline for resolved params, measured from `started_at`.
pub fn search_deadline(resolved: &GoParams, started_at: Instant) -> Instant {
    let budget = match (resolved.movetime_ms, resolved.depth) {
        (Some(ms), _) => Duration::from_millis(ms),
        (None, Some(_)) => UNBOUNDED_SEARCH,
        (None, None) => Duration::from_millis(DEFAULT_MOVETIME_MS),
    };
    started_at + budget
}

fn adaptive_budget_ms(
    phase: GamePhase,
    remaining_ms: u64,
    inc_ms: Option<u64>,
    movestogo: Option<u16>,
) -> u64 {
    let expected_moves_left = match (movestogo, phase) {
        (Some(mtg), _) => u64::from(mtg.max(1)),
        (None, GamePhase::Opening) => 30,
        (None, GamePhase::Endgame) => 15,
    };

    let reserve = (remaining_ms / 25).max(100).min(remaining_ms.saturating_sub(1));
    let usable = remaining_ms.saturating_sub(reserve);
    let base = usable / expected_moves_left;
    let inc_bonus = inc_ms.unwrap_or(0).saturating_mul(3) / 4;
    let panic = if remaining_ms < 2_000 {
        remaining_ms / 12
    } else {
        0
    };
    let target = base.saturating_add(inc_bonus).saturating_add(panic);

    let min_budget = if remaining_ms < 1_000 { 5 } else { 15 };
    let max_budget = (remaining_ms / 4).max(1);
    target.clamp(min_budget.min(max_budget), max_budget).max(1)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{resolve_go_params, search_deadline, TimeManagementStrategy, DEFAULT_MOVETIME_MS};
    use crate::engines::engine_trait::GoParams;
    use crate::games::connect_four::ConnectFour;

    #[test]
    fn explicit_movetime_wins_over_clock() {
        let params = GoParams {
            movetime_ms: Some(250),
            remaining_ms: Some(60_000),
            ..GoParams::default()
        };
        let resolved = resolve_go_params(&ConnectFour::new(), &params, TimeManagementStrategy::Adaptive);
        assert_eq!(resolved.movetime_ms, Some(250));
    }

    #[test]
    fn fraction20_spends_a_twentieth() {
        let params = GoParams {
            remaining_ms: Some(20_000),
            ..GoParams::default()
        };
        let resolved =
            resolve_go_params(&ConnectFour::new(), &params, TimeManagementStrategy::Fraction20);
        assert_eq!(resolved.movetime_ms, Some(1_000));
    }

    #[test]
    fn adaptive_budget_stays_within_a_quarter_of_the_clock() {
        for remaining in [50u64, 900, 1_500, 10_000, 300_000] {
            let params = GoParams {
                remaining_ms: Some(remaining),
                increment_ms: Some(2_000),
                ..GoParams::default()
            };
            let resolved =
                resolve_go_params(&ConnectFour::new(), &params, TimeManagementStrategy::Adaptive);
            let budget = resolved.movetime_ms.expect("clock given");
            assert!(budget >= 1);
            assert!(budget <= (remaining / 4).max(1), "remaining {remaining} budget {budget}");
        }
    }

    #[test]
    fn deadline_falls_back_to_default_movetime() {
        let now = Instant::now();
        assert_eq!(
            search_deadline(&GoParams::default(), now),
            now + Duration::from_millis(DEFAULT_MOVETIME_MS)
        );
        let depth_only = GoParams {
            depth: Some(3),
            ..GoParams::default()
        };
        assert!(search_deadline(&depth_only, now) > now + Duration::from_secs(3600));
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!(
            "fraction20".parse::<TimeManagementStrategy>(),
            Ok(TimeManagementStrategy::Fraction20)
        );
        assert_eq!(
            "Adaptive".parse::<TimeManagementStrategy>(),
            Ok(TimeManagementStrategy::Adaptive)
        );
        assert!("sudden".parse::<TimeManagementStrategy>().is_err());
    }
}
