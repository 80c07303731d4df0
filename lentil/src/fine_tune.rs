//! Iterative narrowing of close calls.
//!
//! When the top two labels of a column score within a threshold of
//! each other, the candidates are rescored on the markers that
//! separate them only. Each round is an explicit [`FineTuneRound`]
//! value derived from the previous one.

use crate::reference::ReferenceModel;
use matrix_util::ranking::scaled_ranks_at;
use ndarray::ArrayView1;

/// How fine-tuning of one column ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FineTuneStatus {
    /// Disabled, or the first-round margin was already wide enough
    NotNeeded,
    /// A single candidate remained
    Resolved,
    /// The candidate set stopped shrinking
    Stalled,
    /// The round limit was hit with several candidates left; the
    /// reported label is the best of the last round
    CapReached,
}

/// Candidates of one round, the marker positions they were scored on
/// and their scores (aligned with `candidates`)
#[derive(Debug, Clone, PartialEq)]
pub struct FineTuneRound {
    pub candidates: Vec<usize>,
    pub features: Vec<usize>,
    pub scores: Vec<f32>,
}

impl FineTuneRound {
    /// Round zero: every label scored on the whole marker subset
    pub fn initial(scores: &[f32], num_features: usize) -> Self {
        Self {
            candidates: (0..scores.len()).collect(),
            features: (0..num_features).collect(),
            scores: scores.to_vec(),
        }
    }

    /// The best candidate and its margin over the runner-up (0 with a
    /// single candidate). Ties go to the smaller label.
    pub fn best(&self) -> (usize, f32) {
        let (best, delta) = best_and_margin(&self.scores);
        (self.candidates[best], delta)
    }

    /// Candidates scoring within `threshold` of the best
    pub fn within_threshold(&self, threshold: f32) -> Vec<usize> {
        let top = self
            .scores
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        self.candidates
            .iter()
            .zip(self.scores.iter())
            .filter(|(_, &s)| top - s <= threshold)
            .map(|(&l, _)| l)
            .collect()
    }

    /// Rescore `candidates` on the markers that separate them
    ///
    /// * `query_ranks` - average ranks of the query over the marker subset
    fn next(
        candidates: Vec<usize>,
        query_ranks: ArrayView1<f32>,
        model: &ReferenceModel,
        quantile: f32,
    ) -> Self {
        let mut features = model.markers().union_over(&candidates);
        if features.is_empty() {
            features = (0..model.num_features()).collect();
        }
        let query = scaled_ranks_at(query_ranks, &features);
        let scores = candidates
            .iter()
            .map(|&l| model.profiles(l).quantile_score_at(&query, &features, quantile))
            .collect();
        Self {
            candidates,
            features,
            scores,
        }
    }
}

/// Index of the largest score (first one on ties) and its margin over
/// the second largest
pub(crate) fn best_and_margin(scores: &[f32]) -> (usize, f32) {
    let mut best = 0;
    for (k, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] {
            best = k;
        }
    }
    let runner_up = scores
        .iter()
        .enumerate()
        .filter(|&(k, _)| k != best)
        .map(|(_, &s)| s)
        .fold(f32::NEG_INFINITY, f32::max);
    let delta = if runner_up.is_finite() {
        scores[best] - runner_up
    } else {
        0.
    };
    (best, delta)
}

pub(crate) struct FineTuneOutcome {
    pub best: usize,
    pub delta: f32,
    pub status: FineTuneStatus,
    pub rounds: usize,
}

/// Narrow down the candidates of one column
///
/// * `query_ranks` - average ranks of the query over the marker subset
/// * `first_round` - scores of every label on the whole subset
/// * `max_rounds` - round limit
pub(crate) fn fine_tune(
    query_ranks: ArrayView1<f32>,
    first_round: &[f32],
    model: &ReferenceModel,
    quantile: f32,
    threshold: f32,
    max_rounds: usize,
) -> FineTuneOutcome {
    let mut current = FineTuneRound::initial(first_round, model.num_features());
    let mut rounds = 0;

    loop {
        let (best, delta) = current.best();
        let finish = |status| FineTuneOutcome {
            best,
            delta,
            status,
            rounds,
        };

        let kept = current.within_threshold(threshold);
        if kept.len() <= 1 {
            return finish(FineTuneStatus::Resolved);
        }
        if kept.len() == current.candidates.len() {
            return finish(FineTuneStatus::Stalled);
        }
        if rounds >= max_rounds {
            return finish(FineTuneStatus::CapReached);
        }

        current = FineTuneRound::next(kept, query_ranks, model, quantile);
        rounds += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_and_ties() {
        assert_eq!(best_and_margin(&[0.2, 0.5, 0.4]).0, 1);
        assert!((best_and_margin(&[0.2, 0.5, 0.4]).1 - 0.1).abs() < 1e-6);
        assert_eq!(best_and_margin(&[0.3, 0.3]), (0, 0.0));
        assert_eq!(best_and_margin(&[0.7]), (0, 0.0));
    }

    #[test]
    fn candidates_within_threshold() {
        let round = FineTuneRound {
            candidates: vec![0, 2, 5],
            features: vec![0, 1],
            scores: vec![0.50, 0.47, 0.10],
        };
        assert_eq!(round.best(), (0, 0.50 - 0.47));
        assert_eq!(round.within_threshold(0.05), vec![0, 2]);
        assert_eq!(round.within_threshold(0.0), vec![0]);
        assert_eq!(round.within_threshold(f32::INFINITY), vec![0, 2, 5]);
    }
}
