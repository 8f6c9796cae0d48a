//! Polynomial time expansion and closed-form ridge regression.
//!
//! Ridge fits an intercept: columns and target are centred, the penalty
//! applies to the slope coefficients only, and the intercept is recovered
//! from the means.  Solved in `f64` by Gaussian elimination with partial
//! pivoting; the system is at most `degree × degree`.

use serde::{Deserialize, Serialize};

/// Maps a scalar `t` to `[t, t², …, t^degree]` (no bias column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    pub degree: u8,
}

impl PolynomialFeatures {
    pub fn expand(&self, t: f64) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.degree as usize);
        let mut p = 1.0;
        for _ in 0..self.degree {
            p *= t;
            out.push(p);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeModel {
    pub intercept: f64,
    pub coef: Vec<f64>,
}

impl RidgeModel {
    /// Fit on design rows `x` (all the same width) against `y`.
    ///
    /// `None` if there are no rows or the normal equations are singular.
    pub fn fit(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Option<Self> {
        let n = x.len();
        if n == 0 || n != y.len() {
            return None;
        }
        let d = x[0].len();
        let nf = n as f64;

        let mut x_mean = vec![0.0; d];
        for row in x {
            for (m, v) in x_mean.iter_mut().zip(row) {
                *m += v / nf;
            }
        }
        let y_mean = y.iter().sum::<f64>() / nf;

        // (XcᵀXc + αI) w = Xcᵀ yc
        let mut a = vec![vec![0.0; d]; d];
        let mut b = vec![0.0; d];
        for (row, &yi) in x.iter().zip(y) {
            let yc = yi - y_mean;
            for i in 0..d {
                let xi = row[i] - x_mean[i];
                b[i] += xi * yc;
                for j in 0..d {
                    a[i][j] += xi * (row[j] - x_mean[j]);
                }
            }
        }
        for (i, r) in a.iter_mut().enumerate() {
            r[i] += alpha;
        }

        let coef = solve(a, b)?;
        let intercept = y_mean - coef.iter().zip(&x_mean).map(|(w, m)| w * m).sum::<f64>();
        Some(Self { intercept, coef })
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        self.intercept + self.coef.iter().zip(x).map(|(w, v)| w * v).sum::<f64>()
    }

    /// Coefficient of determination.  A constant target scores 1.0 when
    /// fitted exactly and 0.0 otherwise.
    pub fn r2(&self, x: &[Vec<f64>], y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (row, &yi) in x.iter().zip(y) {
            ss_res += (yi - self.predict(row)).powi(2);
            ss_tot += (yi - mean).powi(2);
        }
        if ss_tot <= f64::EPSILON {
            return if ss_res <= 1e-9 { 1.0 } else { 0.0 };
        }
        1.0 - ss_res / ss_tot
    }
}

fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let d = b.len();
    for col in 0..d {
        let pivot = (col..d).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..d {
            let f = a[row][col] / a[col][col];
            for k in col..d {
                a[row][k] -= f * a[col][k];
            }
            b[row] -= f * b[col];
        }
    }
    let mut w = vec![0.0; d];
    for row in (0..d).rev() {
        let tail: f64 = (row + 1..d).map(|k| a[row][k] * w[k]).sum();
        w[row] = (b[row] - tail) / a[row][row];
    }
    w.iter().all(|v| v.is_finite()).then_some(w)
}
