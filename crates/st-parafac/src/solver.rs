// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Alternating least squares with a pinned slice mode.
//!
//! The solver factorises a `(words, dims, 2)` embedding stack as a rank-R
//! CP model `X ≈ Σᵣ aᵣ ⊗ bᵣ ⊗ cᵣ`, alternating normal-equations solves for
//! the word and dimension factors while the slice factor stays fixed to the
//! caller's affinity rows. With rows such as `[w, 1-w, 0]` / `[0, 1-w, w]`
//! axis 0 loads on slice 0 only, axis 2 on slice 1 only, and axis 1 on both
//! equally — the "distinctive to A / neutral / distinctive to B" reading the
//! ranking layer depends on.
//!
//! Each sweep updates the free modes in order, then appends the relative
//! reconstruction error `‖X − X̂‖_F / ‖X‖_F` to a trace; once two entries
//! exist, a consecutive delta below the tolerance stops the run. Exhausting
//! the iteration budget is not an error — the caller receives the best
//! factors found together with the full trace.

use ndarray::{Array1, Array2, Array3};
use tracing::{debug, info};

use crate::determinism;
use crate::init::initialize_factors;
use crate::{ParafacError, ParafacResult, Scalar};

/// Number of modes the solver handles.
const MODES: usize = 3;
/// Index of the pinned slice mode.
const SLICE_MODE: usize = 2;
/// Extent the slice mode must have for the constraint rows to pin it.
pub const SLICE_COUNT: usize = 2;

/// Fixed rows for the slice factor matrix, one per corpus slice.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceConstraints {
    rows: [Array1<Scalar>; SLICE_COUNT],
}

impl SliceConstraints {
    /// Builds constraints from one affinity row per corpus slice.
    pub fn new(first: Vec<Scalar>, second: Vec<Scalar>) -> Self {
        Self {
            rows: [Array1::from(first), Array1::from(second)],
        }
    }

    /// Complementary affinity pair `[w, 1-w, 0]` / `[0, 1-w, w]` for a
    /// rank-3 decomposition.
    pub fn complementary(weight: Scalar) -> ParafacResult<Self> {
        if !weight.is_finite() || weight <= 0.0 || weight >= 1.0 {
            return Err(ParafacError::WeightOutOfRange { weight });
        }
        let neutral = 1.0 - weight;
        Ok(Self::new(
            vec![weight, neutral, 0.0],
            vec![0.0, neutral, weight],
        ))
    }

    /// The pinned rows, slice-major.
    pub fn rows(&self) -> &[Array1<Scalar>; SLICE_COUNT] {
        &self.rows
    }

    fn validate(&self, rank: usize) -> ParafacResult<()> {
        for (row, values) in self.rows.iter().enumerate() {
            if values.len() != rank {
                return Err(ParafacError::ConstraintLength {
                    row,
                    got: values.len(),
                    expected: rank,
                });
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(ParafacError::NonFiniteConstraint { row });
            }
        }
        Ok(())
    }
}

/// Knobs for a single ALS run.
#[derive(Clone, Debug)]
pub struct SolverOptions {
    /// Hard bound on ALS sweeps.
    pub max_iterations: usize,
    /// Stop once consecutive relative reconstruction errors differ by less
    /// than this.
    pub tolerance: Scalar,
    /// Seed for the factor initialiser; `None` defers to the deterministic
    /// environment configuration, then OS entropy.
    pub seed: Option<u64>,
    /// Forwarded to the initialiser's absolute-value pass.
    pub non_negative_init: bool,
    /// Promote per-iteration diagnostics from `debug!` to `info!`.
    pub verbose: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-8,
            seed: None,
            non_negative_init: false,
            verbose: false,
        }
    }
}

/// Factor matrices plus the reconstruction-error trace of the run that
/// produced them.
#[derive(Clone, Debug)]
pub struct Decomposition {
    /// One `(extent, rank)` factor matrix per mode; the slice factor equals
    /// the constraint rows exactly.
    pub factors: Vec<Array2<Scalar>>,
    /// Relative reconstruction error after each completed sweep.
    pub rec_errors: Vec<Scalar>,
    /// Number of sweeps performed.
    pub iterations: usize,
    /// Whether the consecutive-delta test fired before the budget ran out.
    pub converged: bool,
}

impl Decomposition {
    /// Per-word scores, one column per latent axis.
    pub fn word_factor(&self) -> &Array2<Scalar> {
        &self.factors[0]
    }
}

/// Rank-R CP decomposition of `tensor` with the slice mode pinned to
/// `constraints`.
///
/// All configuration is validated before the first sweep; numerical failures
/// inside a sweep (singular normal equations, non-finite error) propagate to
/// the caller, who may retry with another seed.
pub fn decompose(
    tensor: &Array3<Scalar>,
    rank: usize,
    constraints: &SliceConstraints,
    options: &SolverOptions,
) -> ParafacResult<Decomposition> {
    let (words, dims, slices) = tensor.dim();
    if rank == 0 {
        return Err(ParafacError::ZeroRank);
    }
    for (mode, extent) in [words, dims, slices].into_iter().enumerate() {
        if extent == 0 {
            return Err(ParafacError::EmptyMode { mode });
        }
    }
    if slices != SLICE_COUNT {
        return Err(ParafacError::SliceCountMismatch {
            expected: SLICE_COUNT,
            got: slices,
        });
    }
    constraints.validate(rank)?;
    if options.max_iterations == 0 {
        return Err(ParafacError::ZeroIterations);
    }
    if !options.tolerance.is_finite() || options.tolerance <= 0.0 {
        return Err(ParafacError::InvalidTolerance {
            tolerance: options.tolerance,
        });
    }

    let norm = tensor.iter().map(|v| v * v).sum::<Scalar>().sqrt();
    if norm == 0.0 {
        return Err(ParafacError::DegenerateTensor);
    }

    let mut rng = determinism::rng_from_optional(options.seed, "st.parafac.init");
    let mut factors = initialize_factors(
        &[words, dims, slices],
        rank,
        &mut rng,
        options.non_negative_init,
    )?;
    pin_slice_rows(&mut factors[SLICE_MODE], constraints);

    let mut rec_errors: Vec<Scalar> = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    for iteration in 0..options.max_iterations {
        iterations = iteration + 1;
        for mode in 0..MODES {
            if mode == SLICE_MODE {
                // pinned: excluded from optimisation
                continue;
            }
            let gram = gram_hadamard(&factors, mode, rank);
            let design = khatri_rao_skip(&factors, mode);
            let target = unfold(tensor, mode).dot(&design);
            factors[mode] = solve_normal_equations(&gram, &target)?;
        }

        let rec_error = relative_error(tensor, &factors, norm);
        if !rec_error.is_finite() {
            return Err(ParafacError::NonFiniteError {
                iteration: iterations,
            });
        }
        let delta = rec_errors.last().map(|previous| (previous - rec_error).abs());
        rec_errors.push(rec_error);
        if options.verbose {
            info!(iteration = iterations, rec_error, delta = ?delta, "als sweep");
        } else {
            debug!(iteration = iterations, rec_error, delta = ?delta, "als sweep");
        }
        if let Some(delta) = delta {
            if delta < options.tolerance {
                converged = true;
                break;
            }
        }
    }

    // The slice factor must equal the constraint rows bit-for-bit on exit.
    pin_slice_rows(&mut factors[SLICE_MODE], constraints);

    Ok(Decomposition {
        factors,
        rec_errors,
        iterations,
        converged,
    })
}

fn pin_slice_rows(slice_factor: &mut Array2<Scalar>, constraints: &SliceConstraints) {
    for (row, pinned) in constraints.rows().iter().enumerate() {
        slice_factor.row_mut(row).assign(pinned);
    }
}

/// Mode-`mode` unfolding: that axis becomes the rows and the remaining axes
/// flatten into columns in axis order, last varying fastest.
fn unfold(tensor: &Array3<Scalar>, mode: usize) -> Array2<Scalar> {
    let (words, dims, slices) = tensor.dim();
    match mode {
        0 => {
            let mut out = Array2::zeros((words, dims * slices));
            for ((i, j, k), &value) in tensor.indexed_iter() {
                out[[i, j * slices + k]] = value;
            }
            out
        }
        1 => {
            let mut out = Array2::zeros((dims, words * slices));
            for ((i, j, k), &value) in tensor.indexed_iter() {
                out[[j, i * slices + k]] = value;
            }
            out
        }
        _ => {
            let mut out = Array2::zeros((slices, words * dims));
            for ((i, j, k), &value) in tensor.indexed_iter() {
                out[[k, i * dims + j]] = value;
            }
            out
        }
    }
}

/// Column-wise Kronecker product of two factor matrices.
fn khatri_rao(left: &Array2<Scalar>, right: &Array2<Scalar>) -> Array2<Scalar> {
    let (left_rows, rank) = left.dim();
    let (right_rows, _) = right.dim();
    let mut out = Array2::zeros((left_rows * right_rows, rank));
    for a in 0..left_rows {
        for b in 0..right_rows {
            for r in 0..rank {
                out[[a * right_rows + b, r]] = left[[a, r]] * right[[b, r]];
            }
        }
    }
    out
}

/// Khatri–Rao product of every factor except `skip`, in mode order.
fn khatri_rao_skip(factors: &[Array2<Scalar>], skip: usize) -> Array2<Scalar> {
    match skip {
        0 => khatri_rao(&factors[1], &factors[2]),
        1 => khatri_rao(&factors[0], &factors[2]),
        _ => khatri_rao(&factors[0], &factors[1]),
    }
}

/// Hadamard product of the Gram matrices of every factor except `skip`.
fn gram_hadamard(factors: &[Array2<Scalar>], skip: usize, rank: usize) -> Array2<Scalar> {
    let mut gram = Array2::ones((rank, rank));
    for (mode, factor) in factors.iter().enumerate() {
        if mode == skip {
            continue;
        }
        gram = gram * factor.t().dot(factor);
    }
    gram
}

/// Solves `gram · xᵀ = targetᵀ` for every row of `target` through a Cholesky
/// factorisation of the normal-equations matrix.
///
/// The Gram product is symmetric positive definite for well-posed inputs, so
/// the triangular factor replaces an explicit inverse. A non-positive or
/// non-finite pivot surfaces [`ParafacError::SingularGram`].
fn solve_normal_equations(
    gram: &Array2<Scalar>,
    target: &Array2<Scalar>,
) -> ParafacResult<Array2<Scalar>> {
    let rank = gram.nrows();
    let mut lower = Array2::<Scalar>::zeros((rank, rank));
    for row in 0..rank {
        for col in 0..=row {
            let mut sum = gram[[row, col]];
            for k in 0..col {
                sum -= lower[[row, k]] * lower[[col, k]];
            }
            if row == col {
                if !sum.is_finite() || sum <= 0.0 {
                    return Err(ParafacError::SingularGram {
                        pivot: row,
                        value: sum,
                    });
                }
                lower[[row, col]] = sum.sqrt();
            } else {
                lower[[row, col]] = sum / lower[[col, col]];
            }
        }
    }

    let rows = target.nrows();
    let mut solution = Array2::<Scalar>::zeros((rows, rank));
    let mut forward = vec![0.0; rank];
    for i in 0..rows {
        for r in 0..rank {
            let mut sum = target[[i, r]];
            for k in 0..r {
                sum -= lower[[r, k]] * forward[k];
            }
            forward[r] = sum / lower[[r, r]];
        }
        for r in (0..rank).rev() {
            let mut sum = forward[r];
            for k in r + 1..rank {
                sum -= lower[[k, r]] * solution[[i, k]];
            }
            solution[[i, r]] = sum / lower[[r, r]];
        }
    }
    Ok(solution)
}

/// Rebuilds the rank-R model tensor from the current factors.
fn reconstruct(factors: &[Array2<Scalar>], dim: (usize, usize, usize)) -> Array3<Scalar> {
    let rank = factors[0].ncols();
    let mut out = Array3::zeros(dim);
    for ((i, j, k), value) in out.indexed_iter_mut() {
        let mut acc = 0.0;
        for r in 0..rank {
            acc += factors[0][[i, r]] * factors[1][[j, r]] * factors[2][[k, r]];
        }
        *value = acc;
    }
    out
}

/// Relative Frobenius reconstruction error against the original tensor.
fn relative_error(tensor: &Array3<Scalar>, factors: &[Array2<Scalar>], norm: Scalar) -> Scalar {
    let model = reconstruct(factors, tensor.dim());
    let residual: Scalar = tensor
        .iter()
        .zip(model.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    residual.sqrt() / norm
}
