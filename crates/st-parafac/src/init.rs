// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Reproducible random starting points for the factor matrices.

use ndarray::Array2;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

use crate::{ParafacError, ParafacResult, Scalar};

/// Draws one `(extent, rank)` factor matrix per tensor mode, i.i.d. uniform
/// over `[0, 1)`, from the supplied generator.
///
/// Entries are drawn row-major per mode, modes in tensor-axis order, so an
/// identical seed and shape reproduce bit-identical factors. When
/// `non_negative` is set every entry passes through `abs` — a no-op for the
/// uniform range, kept so initialisers drawing from wider ranges can share
/// the interface.
pub fn initialize_factors(
    shape: &[usize],
    rank: usize,
    rng: &mut StdRng,
    non_negative: bool,
) -> ParafacResult<Vec<Array2<Scalar>>> {
    if rank == 0 {
        return Err(ParafacError::ZeroRank);
    }
    for (mode, &extent) in shape.iter().enumerate() {
        if extent == 0 {
            return Err(ParafacError::EmptyMode { mode });
        }
    }

    let unit = Uniform::new(0.0, 1.0);
    let mut factors = Vec::with_capacity(shape.len());
    for &extent in shape {
        let mut data: Vec<Scalar> = Vec::with_capacity(extent * rank);
        data.resize_with(extent * rank, || unit.sample(rng));
        if non_negative {
            for value in &mut data {
                *value = value.abs();
            }
        }
        let factor = Array2::from_shape_vec((extent, rank), data)
            .expect("row-major buffer matches factor shape");
        factors.push(factor);
    }
    Ok(factors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn factors_match_the_mode_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        let factors = initialize_factors(&[5, 4, 2], 3, &mut rng, false).unwrap();
        assert_eq!(factors.len(), 3);
        assert_eq!(factors[0].shape(), &[5, 3]);
        assert_eq!(factors[1].shape(), &[4, 3]);
        assert_eq!(factors[2].shape(), &[2, 3]);
        assert!(factors.iter().flatten().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn identical_seeds_draw_identical_factors() {
        let mut first = StdRng::seed_from_u64(2018);
        let mut second = StdRng::seed_from_u64(2018);
        let left = initialize_factors(&[6, 3, 2], 3, &mut first, false).unwrap();
        let right = initialize_factors(&[6, 3, 2], 3, &mut second, false).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn absolute_value_pass_is_a_no_op_for_the_uniform_draw() {
        let mut first = StdRng::seed_from_u64(11);
        let mut second = StdRng::seed_from_u64(11);
        let plain = initialize_factors(&[4, 4, 2], 2, &mut first, false).unwrap();
        let folded = initialize_factors(&[4, 4, 2], 2, &mut second, true).unwrap();
        assert_eq!(plain, folded);
    }

    #[test]
    fn invalid_shapes_fail_fast() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            initialize_factors(&[4, 4, 2], 0, &mut rng, false),
            Err(ParafacError::ZeroRank)
        ));
        assert!(matches!(
            initialize_factors(&[4, 0, 2], 3, &mut rng, false),
            Err(ParafacError::EmptyMode { mode: 1 })
        ));
    }
}
