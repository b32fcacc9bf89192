// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Corpus-contrast vocabulary ranking over slice-constrained CP factors.
//!
//! Two aligned word-embedding matrices — one per corpus, equal vocabulary
//! and dimensionality — are stacked into a `(words, dims, 2)` tensor and
//! decomposed with [`st_parafac`]. The word factor that comes back carries
//! one column per latent axis; sorting the vocabulary by each column yields
//! the "distinctive to A", "neutral", and "distinctive to B" word lists.
//! An ensemble layer repeats the pipeline across seeds and sums the scores
//! so that no single initialisation decides the final ordering.

pub mod corpus;
pub mod ensemble;
pub mod ranking;

use ndarray::ArrayView2;
use thiserror::Error;

pub use st_parafac::{Scalar, SliceConstraints, SolverOptions};

pub use corpus::{stack_embeddings, Vocabulary};
pub use ensemble::{run_ensemble, EnsembleConfig, EnsembleOutcome, EnsembleScores};
pub use ranking::{axis_rankings, shared_top_words, RankedWord};

/// Result alias used throughout the crate.
pub type LexRankResult<T> = Result<T, LexRankError>;

/// Errors surfaced by the ranking layer.
#[derive(Debug, Error)]
pub enum LexRankError {
    #[error(transparent)]
    Parafac(#[from] st_parafac::ParafacError),
    #[error(
        "embedding matrices disagree: corpus A is {a_rows}x{a_cols}, corpus B is {b_rows}x{b_cols}"
    )]
    EmbeddingShapeMismatch {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },
    #[error("vocabulary lists {words} words but the scores have {rows} rows")]
    VocabularySize { words: usize, rows: usize },
    #[error("vocabulary contains duplicate word '{word}'")]
    DuplicateWord { word: String },
    #[error("score matrix is {got_rows}x{got_cols} but the running totals are {rows}x{cols}")]
    ScoreShapeMismatch {
        got_rows: usize,
        got_cols: usize,
        rows: usize,
        cols: usize,
    },
    #[error("ensemble requires at least one seed")]
    NoSeeds,
    #[error("every ensemble run failed")]
    AllRunsFailed,
}

/// Stacks two corpus embedding matrices, decomposes with the supplied
/// constraints, and ranks the vocabulary along each latent axis.
pub fn distinct_words(
    corpus_a: ArrayView2<'_, Scalar>,
    corpus_b: ArrayView2<'_, Scalar>,
    vocabulary: &Vocabulary,
    rank: usize,
    constraints: &SliceConstraints,
    options: &SolverOptions,
) -> LexRankResult<Vec<Vec<RankedWord>>> {
    let tensor = stack_embeddings(corpus_a, corpus_b)?;
    let decomposition = st_parafac::decompose(&tensor, rank, constraints, options)?;
    axis_rankings(decomposition.word_factor().view(), vocabulary)
}
