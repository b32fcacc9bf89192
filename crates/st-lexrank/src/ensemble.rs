// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Seed-ensemble aggregation of per-axis word scores.
//!
//! Embedding training and random initialisation both inject run-to-run
//! variance. Summing each word's axis scores across several seeded runs
//! suppresses words that only rank highly under one lucky draw: a word
//! scoring consistently mid-field overtakes a single-seed outlier.

use ndarray::{Array2, Array3, ArrayView2};
use rayon::prelude::*;
use tracing::warn;

use st_parafac::{decompose, SliceConstraints, SolverOptions};

use crate::corpus::Vocabulary;
use crate::ranking::{axis_rankings, RankedWord};
use crate::{LexRankError, LexRankResult, Scalar};

/// Per-word, per-axis running totals across ensemble runs.
#[derive(Clone, Debug)]
pub struct EnsembleScores {
    totals: Array2<Scalar>,
    runs: usize,
}

impl EnsembleScores {
    /// Starts an empty accumulator for `words × axes` scores.
    pub fn new(words: usize, axes: usize) -> Self {
        Self {
            totals: Array2::zeros((words, axes)),
            runs: 0,
        }
    }

    /// Adds one run's word-factor scores to the running totals.
    ///
    /// Scores are summed, never averaged.
    pub fn merge(&mut self, word_factor: ArrayView2<'_, Scalar>) -> LexRankResult<()> {
        let (got_rows, got_cols) = word_factor.dim();
        let (rows, cols) = self.totals.dim();
        if (got_rows, got_cols) != (rows, cols) {
            return Err(LexRankError::ScoreShapeMismatch {
                got_rows,
                got_cols,
                rows,
                cols,
            });
        }
        self.totals += &word_factor;
        self.runs += 1;
        Ok(())
    }

    /// Number of runs merged so far.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Totals accumulated so far.
    pub fn totals(&self) -> ArrayView2<'_, Scalar> {
        self.totals.view()
    }

    /// Ranks the vocabulary by the accumulated totals.
    pub fn rankings(&self, vocabulary: &Vocabulary) -> LexRankResult<Vec<Vec<RankedWord>>> {
        axis_rankings(self.totals.view(), vocabulary)
    }
}

/// Configuration for a seed ensemble.
#[derive(Clone, Debug)]
pub struct EnsembleConfig {
    pub rank: usize,
    pub constraints: SliceConstraints,
    pub solver: SolverOptions,
    pub seeds: Vec<u64>,
}

/// Outcome of an ensemble: accumulated scores plus how many seeds failed.
#[derive(Clone, Debug)]
pub struct EnsembleOutcome {
    pub scores: EnsembleScores,
    pub skipped: usize,
}

/// Runs the build-then-decompose pipeline once per seed and sums the
/// resulting word-factor scores.
///
/// The runs share no state and execute in parallel; totals are combined only
/// after every run has finished. A failed seed forfeits its contribution —
/// it is logged and skipped rather than aborting the ensemble — but if every
/// seed fails the error surfaces.
pub fn run_ensemble<F>(
    vocabulary: &Vocabulary,
    config: &EnsembleConfig,
    build: F,
) -> LexRankResult<EnsembleOutcome>
where
    F: Fn(u64) -> LexRankResult<Array3<Scalar>> + Sync,
{
    if config.seeds.is_empty() {
        return Err(LexRankError::NoSeeds);
    }

    let runs: Vec<Option<Array2<Scalar>>> = config
        .seeds
        .par_iter()
        .map(|&seed| {
            let options = SolverOptions {
                seed: Some(seed),
                ..config.solver.clone()
            };
            let run = build(seed).and_then(|tensor| {
                decompose(&tensor, config.rank, &config.constraints, &options)
                    .map_err(LexRankError::from)
            });
            match run {
                Ok(mut decomposition) => Some(decomposition.factors.swap_remove(0)),
                Err(error) => {
                    warn!(seed, %error, "ensemble run failed; skipping");
                    None
                }
            }
        })
        .collect();

    let mut scores = EnsembleScores::new(vocabulary.len(), config.rank);
    let mut skipped = 0;
    for word_factor in runs {
        match word_factor {
            Some(factor) => scores.merge(factor.view())?,
            None => skipped += 1,
        }
    }
    if scores.runs() == 0 {
        return Err(LexRankError::AllRunsFailed);
    }
    Ok(EnsembleOutcome { scores, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn vocab(words: &[&str]) -> Vocabulary {
        Vocabulary::new(words.iter().map(|w| w.to_string()).collect()).unwrap()
    }

    #[test]
    fn summation_turns_rotated_rankings_into_a_tie() {
        // Three runs that rank the words 3/2/1, 1/3/2, and 2/1/3: summing
        // (not averaging) must leave every word at exactly 6 per axis.
        let vocabulary = vocab(&["ame", "bada", "chikai"]);
        let mut scores = EnsembleScores::new(3, 1);
        scores.merge(array![[3.0], [2.0], [1.0]].view()).unwrap();
        scores.merge(array![[1.0], [3.0], [2.0]].view()).unwrap();
        scores.merge(array![[2.0], [1.0], [3.0]].view()).unwrap();

        assert_eq!(scores.runs(), 3);
        let rankings = scores.rankings(&vocabulary).unwrap();
        assert!(rankings[0].iter().all(|entry| entry.score == 6.0));
        let order: Vec<&str> = rankings[0].iter().map(|e| e.word.as_str()).collect();
        assert_eq!(order, ["ame", "bada", "chikai"]);
    }

    #[test]
    fn merge_rejects_mismatched_score_shapes() {
        let mut scores = EnsembleScores::new(2, 3);
        let err = scores.merge(array![[1.0, 2.0], [3.0, 4.0]].view()).unwrap_err();
        assert!(matches!(err, LexRankError::ScoreShapeMismatch { .. }));
    }

    #[test]
    fn failed_seeds_are_skipped_not_fatal() {
        let vocabulary = vocab(&["a", "b", "c", "d"]);
        let config = EnsembleConfig {
            rank: 3,
            constraints: SliceConstraints::complementary(0.5).unwrap(),
            solver: SolverOptions {
                max_iterations: 10,
                tolerance: 1e-6,
                ..SolverOptions::default()
            },
            seeds: vec![1, 13, 2],
        };

        let outcome = run_ensemble(&vocabulary, &config, |seed| {
            if seed == 13 {
                // Wrong slice count: the solver rejects it and the run is
                // forfeited.
                Ok(Array3::ones((4, 3, 3)))
            } else {
                let mut rng = StdRng::seed_from_u64(seed);
                Ok(Array3::from_shape_fn((4, 3, 2), |_| rng.gen_range(0.1..1.1)))
            }
        })
        .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.scores.runs(), 2);
        assert_eq!(outcome.scores.totals().dim(), (4, 3));
    }

    #[test]
    fn empty_and_all_failed_ensembles_surface_errors() {
        let vocabulary = vocab(&["a"]);
        let config = EnsembleConfig {
            rank: 3,
            constraints: SliceConstraints::complementary(0.5).unwrap(),
            solver: SolverOptions::default(),
            seeds: vec![],
        };
        assert!(matches!(
            run_ensemble(&vocabulary, &config, |_| Ok(Array3::ones((1, 1, 2)))),
            Err(LexRankError::NoSeeds)
        ));

        let config = EnsembleConfig {
            seeds: vec![1, 2],
            ..config
        };
        let result = run_ensemble(&vocabulary, &config, |_| {
            Ok(Array3::zeros((1, 1, 2)))
        });
        assert!(matches!(result, Err(LexRankError::AllRunsFailed)));
    }
}
