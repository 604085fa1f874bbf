//! Candidate move paired with its evaluation.
//!
//! Rankings order by score only, higher first. Depth and move identity take
//! part in equality but never in ordering, so equal scores tie. Sorting uses a
//! stable sort, which means ties keep first-seen precedence. A candidate that
//! has not been scored yet carries no score and always sorts last.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct MoveRanking<M> {
    pub mv: M,
    pub score: Option<f64>,
    pub depth: u32,
}

impl<M> MoveRanking<M> {
    pub fn unevaluated(mv: M) -> Self {
        Self {
            mv,
            score: None,
            depth: 0,
        }
    }

    pub fn evaluated(mv: M, score: f64, depth: u32) -> Self {
        Self {
            mv,
            score: Some(score),
            depth,
        }
    }

    #[inline]
    pub fn is_evaluated(&self) -> bool {
        self.score.is_some()
    }

    /// `Less` when `self` ranks ahead of `other`.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        match (self.score, other.score) {
            (Some(a), Some(b)) => b.total_cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Strictly better score than `other`.
    #[inline]
    pub fn is_better_than(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Less
    }
}

/// Stable sort, best first.
pub fn sort_rankings<M>(rankings: &mut [MoveRanking<M>]) {
    rankings.sort_by(MoveRanking::rank_cmp);
}

/// First of the best-scored rankings, or `None` when nothing was evaluated.
pub fn best_ranking<M>(rankings: &[MoveRanking<M>]) -> Option<&MoveRanking<M>> {
    rankings
        .iter()
        .filter(|r| r.is_evaluated())
        .fold(None, |best: Option<&MoveRanking<M>>, candidate| match best {
            Some(current) if !candidate.is_better_than(current) => Some(current),
            _ => Some(candidate),
        })
}
