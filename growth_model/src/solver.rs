//! Ridge-penalized least squares over small dense systems

use crate::error::{GrowthModelError, Result};

/// Jitter added to the normal-equation diagonal so unpenalized columns
/// still produce a positive-definite system
const DIAGONAL_JITTER: f64 = 1e-8;

/// Solve `(XᵀX + Λ) β = Xᵀy` where `Λ` is the diagonal of per-column
/// ridge penalties.
///
/// `rows` holds the design matrix row-wise; every row must have
/// `penalties.len()` entries. The systems here are tiny (tens of
/// columns), so the normal equations with a dense Cholesky solve are
/// adequate.
pub fn ridge_solve(rows: &[Vec<f64>], targets: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    let p = penalties.len();
    if rows.len() != targets.len() {
        return Err(GrowthModelError::Numerical(format!(
            "design has {} rows but {} targets",
            rows.len(),
            targets.len()
        )));
    }
    if rows.is_empty() || p == 0 {
        return Err(GrowthModelError::Numerical(
            "empty design matrix".to_string(),
        ));
    }

    // Normal equations, row-major
    let mut gram = vec![0.0; p * p];
    let mut moment = vec![0.0; p];
    for (row, &y) in rows.iter().zip(targets.iter()) {
        debug_assert_eq!(row.len(), p);
        for i in 0..p {
            moment[i] += row[i] * y;
            for j in 0..=i {
                gram[i * p + j] += row[i] * row[j];
            }
        }
    }
    // Mirror the lower triangle and apply the ridge diagonal
    for i in 0..p {
        for j in 0..i {
            gram[j * p + i] = gram[i * p + j];
        }
        gram[i * p + i] += penalties[i] + DIAGONAL_JITTER;
    }

    cholesky_solve(&gram, &moment, p)
}

/// Solve `A β = b` for symmetric positive-definite `A` (row-major)
fn cholesky_solve(a: &[f64], b: &[f64], n: usize) -> Result<Vec<f64>> {
    // Factor A = L Lᵀ
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }
            if i == j {
                // Also traps NaN from a poisoned design
                if !(sum > 0.0) {
                    return Err(GrowthModelError::Numerical(
                        "normal equations are not positive definite".to_string(),
                    ));
                }
                l[i * n + i] = sum.sqrt();
            } else {
                l[i * n + j] = sum / l[j * n + j];
            }
        }
    }

    // Forward substitution: L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i * n + k] * z[k];
        }
        z[i] = sum / l[i * n + i];
    }

    // Back substitution: Lᵀ β = z
    let mut beta = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[k * n + i] * beta[k];
        }
        beta[i] = sum / l[i * n + i];
    }
    Ok(beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_exact_line() {
        // y = 3 + 2x, no penalty
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let targets: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();
        let beta = ridge_solve(&rows, &targets, &[0.0, 0.0]).unwrap();
        assert_relative_eq!(beta[0], 3.0, max_relative = 1e-6);
        assert_relative_eq!(beta[1], 2.0, max_relative = 1e-6);
    }

    #[test]
    fn penalty_shrinks_coefficients() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let targets: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();

        let loose = ridge_solve(&rows, &targets, &[0.0, 0.1]).unwrap();
        let tight = ridge_solve(&rows, &targets, &[0.0, 1000.0]).unwrap();
        assert!(tight[1].abs() < loose[1].abs());
        assert!(tight[1].abs() < 2.0);
    }

    #[test]
    fn underdetermined_system_is_solvable_with_ridge() {
        // 3 observations, 6 columns
        let rows = vec![
            vec![1.0, 0.5, 0.2, 0.9, 0.1, 0.3],
            vec![1.0, 0.1, 0.8, 0.2, 0.7, 0.4],
            vec![1.0, 0.9, 0.3, 0.4, 0.6, 0.5],
        ];
        let targets = vec![1.0, 2.0, 3.0];
        let beta = ridge_solve(&rows, &targets, &vec![0.5; 6]).unwrap();
        assert_eq!(beta.len(), 6);
        assert!(beta.iter().all(|b| b.is_finite()));
    }

    #[test]
    fn poisoned_input_errors_instead_of_propagating_nan() {
        let rows = vec![vec![1.0, f64::NAN], vec![1.0, 2.0]];
        let targets = vec![1.0, 2.0];
        assert!(ridge_solve(&rows, &targets, &[0.0, 0.0]).is_err());
    }

    #[test]
    fn mismatched_shapes_error() {
        let rows = vec![vec![1.0, 2.0]];
        assert!(ridge_solve(&rows, &[1.0, 2.0], &[0.0, 0.0]).is_err());
        assert!(ridge_solve(&[], &[], &[0.0]).is_err());
    }
}
