//! Eigen-decomposition helpers for the subspace trainer.

use nalgebra::{Cholesky, DMatrix, SymmetricEigen};

use crate::error::{Error, Result};

/// Eigenvalues below this fraction of the largest are treated as zero.
const EIGEN_TOLERANCE: f64 = 1e-10;

/// Ridge added to the within-class scatter, relative to the mean scatter trace.
const RIDGE: f64 = 1e-9;

/// Eigenpairs of a symmetric matrix, sorted by descending eigenvalue.
///
/// Column `i` of the returned matrix belongs to eigenvalue `i`.
pub(crate) fn sorted_symmetric_eigen(m: DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
    let n = m.nrows();
    let eig = SymmetricEigen::new(m);

    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let vectors = DMatrix::from_fn(n, order.len(), |r, c| eig.eigenvectors[(r, order[c])]);
    (values, vectors)
}

/// Number of leading eigenvalues that are significantly positive, capped at `max`.
fn significant(values: &[f64], max: usize) -> usize {
    let top = values.first().copied().unwrap_or(0.0);
    if top <= 0.0 {
        return 0;
    }
    values
        .iter()
        .take(max)
        .take_while(|&&v| v > top * EIGEN_TOLERANCE)
        .count()
}

/// Orthonormal principal axes of mean-centred data.
///
/// `centered` holds one sample per column (pixels x samples). When there are
/// more pixels than samples the eigenvectors are recovered from the small
/// sample-by-sample Gram matrix instead of the pixel covariance.
/// Returns a pixels x k basis with k <= `max_components`.
pub(crate) fn principal_components(centered: &DMatrix<f64>, max_components: usize) -> DMatrix<f64> {
    let (dim, samples) = centered.shape();

    if dim > samples {
        let gram = centered.tr_mul(centered);
        let (values, vectors) = sorted_symmetric_eigen(gram);
        let keep = significant(&values, max_components);

        let mut basis = DMatrix::<f64>::zeros(dim, keep);
        for i in 0..keep {
            // |A v| = sqrt(lambda) > 0 for every kept eigenpair
            let mut axis = centered * vectors.column(i);
            let norm = axis.norm();
            axis /= norm;
            basis.set_column(i, &axis);
        }
        basis
    } else {
        let covariance = centered * centered.transpose();
        let (values, vectors) = sorted_symmetric_eigen(covariance);
        let keep = significant(&values, max_components);
        vectors.columns(0, keep).into_owned()
    }
}

/// Solve `between * w = lambda * within * w` and return the leading `count`
/// eigenvalues with their unit-length eigenvectors as columns.
///
/// The problem is reduced to a symmetric one through the Cholesky factor of
/// the (ridge-regularised) within-class scatter.
pub(crate) fn discriminant_axes(
    between: &DMatrix<f64>,
    within: &DMatrix<f64>,
    count: usize,
) -> Result<(Vec<f64>, DMatrix<f64>)> {
    let k = within.nrows();
    let scale = (within.trace() + between.trace()) / k as f64;
    let ridge = RIDGE * scale.max(f64::MIN_POSITIVE);

    let mut regularized = within.clone();
    for i in 0..k {
        regularized[(i, i)] += ridge;
    }

    let singular = || Error::InsufficientData("within-class scatter is singular".into());
    let l = Cholesky::new(regularized).ok_or_else(singular)?.l();

    // M = L^-1 * Sb * L^-T
    let half = l.solve_lower_triangular(between).ok_or_else(singular)?;
    let m = l
        .solve_lower_triangular(&half.transpose())
        .ok_or_else(singular)?;
    let m = (&m + m.transpose()) * 0.5;

    let (values, vectors) = sorted_symmetric_eigen(m);
    let count = count.min(values.len());

    let mut axes = DMatrix::<f64>::zeros(k, count);
    for i in 0..count {
        let v = vectors.column(i).into_owned();
        let mut w = l.tr_solve_lower_triangular(&v).ok_or_else(singular)?;
        let norm = w.norm();
        if norm > 0.0 {
            w /= norm;
        }
        axes.set_column(i, &w);
    }

    Ok((values[..count].to_vec(), axes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eigenpairs_sorted_descending() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 3.0]);
        let (values, vectors) = sorted_symmetric_eigen(m);

        assert!((values[0] - 5.0).abs() < 1e-12);
        assert!((values[1] - 3.0).abs() < 1e-12);
        assert!((values[2] - 1.0).abs() < 1e-12);
        assert!((vectors[(1, 0)].abs() - 1.0).abs() < 1e-12);
        assert!((vectors[(2, 1)].abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn gram_and_covariance_paths_agree() {
        // Two samples in three dimensions along a single direction
        let centered = DMatrix::from_column_slice(3, 2, &[1.0, 2.0, 2.0, -1.0, -2.0, -2.0]);
        let basis = principal_components(&centered, 10);
        assert_eq!(basis.ncols(), 1);
        let axis = basis.column(0);
        assert!((axis.norm() - 1.0).abs() < 1e-12);
        assert!((axis[0].abs() - 1.0 / 3.0).abs() < 1e-12);

        // Four samples in two dimensions uses the covariance path
        let centered = DMatrix::from_column_slice(
            2,
            4,
            &[3.0, 0.1, -3.0, -0.1, 1.0, -0.1, -1.0, 0.1],
        );
        let basis = principal_components(&centered, 10);
        assert_eq!(basis.ncols(), 2);
        assert!(basis.column(0)[0].abs() > basis.column(0)[1].abs());
    }

    #[test]
    fn component_cap_is_respected() {
        let centered = DMatrix::from_fn(6, 4, |r, c| ((r * 7 + c * 3) % 5) as f64 - 2.0);
        let basis = principal_components(&centered, 1);
        assert_eq!(basis.ncols(), 1);
    }

    #[test]
    fn zero_variance_yields_no_components() {
        let centered = DMatrix::zeros(4, 3);
        assert_eq!(principal_components(&centered, 5).ncols(), 0);
    }

    #[test]
    fn discriminant_axis_follows_class_separation() {
        // Between-class spread along x only, within-class spread isotropic
        let between = DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 0.0]);
        let within = DMatrix::identity(2, 2);
        let (values, axes) = discriminant_axes(&between, &within, 1).unwrap();

        assert_eq!(axes.ncols(), 1);
        assert!((values[0] - 4.0).abs() < 1e-6);
        assert!((axes[(0, 0)].abs() - 1.0).abs() < 1e-9);
        assert!(axes[(1, 0)].abs() < 1e-9);
    }

    #[test]
    fn zero_within_scatter_is_regularised() {
        let between = DMatrix::from_element(1, 1, 10.0);
        let within = DMatrix::zeros(1, 1);
        let (values, axes) = discriminant_axes(&between, &within, 1).unwrap();
        assert!(values[0] > 0.0);
        assert!((axes[(0, 0)].abs() - 1.0).abs() < 1e-12);
    }
}
