// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Slice-constrained CANDECOMP/PARAFAC decomposition.
//!
//! Factorises a three-way stack of two corpus embedding matrices into
//! per-word, per-dimension, and per-slice factor matrices, holding the slice
//! factor fixed to caller-supplied affinity rows. Pinning that mode gives
//! every latent axis a stable meaning across runs — "distinctive to corpus
//! A", "neutral", "distinctive to corpus B" — which is what makes the
//! downstream vocabulary rankings comparable between seeds.

pub mod determinism;
pub mod init;
pub mod solver;

use thiserror::Error;

/// Primary floating-point scalar for the decomposition.
pub type Scalar = f64;

/// Result alias used throughout the crate.
pub type ParafacResult<T> = Result<T, ParafacError>;

/// Errors surfaced by the initialiser and solver.
#[derive(Debug, Error)]
pub enum ParafacError {
    #[error("decomposition rank must be positive")]
    ZeroRank,
    #[error("tensor mode {mode} has zero extent")]
    EmptyMode { mode: usize },
    #[error("slice constraints cover exactly {expected} slices, tensor has {got}")]
    SliceCountMismatch { expected: usize, got: usize },
    #[error("constraint row {row} has length {got}, expected rank {expected}")]
    ConstraintLength {
        row: usize,
        got: usize,
        expected: usize,
    },
    #[error("constraint row {row} contains a non-finite entry")]
    NonFiniteConstraint { row: usize },
    #[error("max_iterations must be positive")]
    ZeroIterations,
    #[error("tolerance must be positive and finite, got {tolerance}")]
    InvalidTolerance { tolerance: Scalar },
    #[error("input tensor has zero Frobenius norm")]
    DegenerateTensor,
    #[error("normal-equations matrix is singular at pivot {pivot} ({value:.3e})")]
    SingularGram { pivot: usize, value: Scalar },
    #[error("reconstruction error became non-finite at iteration {iteration}")]
    NonFiniteError { iteration: usize },
    #[error("complementary weight must lie strictly inside (0, 1), got {weight}")]
    WeightOutOfRange { weight: Scalar },
}

pub use init::initialize_factors;
pub use solver::{decompose, Decomposition, SliceConstraints, SolverOptions, SLICE_COUNT};
