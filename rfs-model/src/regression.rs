//! Ordinary least squares on a small polynomial basis.
//!
//! Fits are solved with a Householder QR factorisation of the column-scaled
//! Vandermonde matrix, which keeps the linear water-difference fit (x around
//! 1e6) and the cubic level fit (x around 1) equally well conditioned.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rfs_core::{Result, RfsError};

/// Relative size below which a diagonal entry of R counts as zero.
const RANK_TOLERANCE: f64 = 1e-12;

/// A polynomial in ascending powers: `c[0] + c[1] x + c[2] x^2 + ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Horner evaluation.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + c)
    }

    pub fn is_finite(&self) -> bool {
        self.coefficients.iter().all(|c| c.is_finite())
    }

    /// Least-squares fit of `y` on powers `0..=degree` of `x`.
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<Self> {
        if x.len() != y.len() {
            return Err(RfsError::DegenerateFit(format!(
                "{} x values but {} y values",
                x.len(),
                y.len()
            )));
        }
        let n_coef = degree + 1;
        if x.len() < n_coef {
            return Err(RfsError::DegenerateFit(format!(
                "{} rows cannot determine {} coefficients",
                x.len(),
                n_coef
            )));
        }

        let design: Vec<Vec<f64>> = x
            .iter()
            .map(|&xi| (0..n_coef).map(|p| xi.powi(p as i32)).collect())
            .collect();
        let coefficients = least_squares(design, y)?;
        let poly = Self::new(coefficients);
        if !poly.is_finite() {
            return Err(RfsError::DegenerateFit(
                "fit produced non-finite coefficients".into(),
            ));
        }
        Ok(poly)
    }
}

/// Solve `min |A b - y|` for a row-major design matrix with at least as many
/// rows as columns.
pub fn least_squares(mut design: Vec<Vec<f64>>, y: &[f64]) -> Result<Vec<f64>> {
    let m = design.len();
    let p = design.first().map_or(0, Vec::len);
    if p == 0 || m < p {
        return Err(RfsError::DegenerateFit(format!(
            "design matrix is {}x{}, need at least as many rows as columns",
            m, p
        )));
    }

    if let Some(i) = design.iter().position(|row| row.len() != p) {
        return Err(RfsError::DegenerateFit(format!(
            "design row {} has {} columns, expected {}",
            i,
            design[i].len(),
            p
        )));
    }
    if y.len() != m {
        return Err(RfsError::DegenerateFit(format!(
            "{} design rows but {} targets",
            m,
            y.len()
        )));
    }

    // Column scaling; undone on the solution.
    let mut scales = vec![0.0_f64; p];
    for row in &design {
        for (j, v) in row.iter().enumerate() {
            scales[j] = scales[j].max(v.abs());
        }
    }
    if let Some(j) = scales.iter().position(|s| *s == 0.0 || !s.is_finite()) {
        return Err(RfsError::DegenerateFit(format!(
            "design column {} is all zero or non-finite",
            j
        )));
    }
    for row in design.iter_mut() {
        for (v, s) in row.iter_mut().zip(&scales) {
            *v /= s;
        }
    }

    let mut rhs = y.to_vec();
    for k in 0..p {
        let norm = (k..m).map(|i| design[i][k].powi(2)).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Err(RfsError::DegenerateFit(format!(
                "design column {} is linearly dependent",
                k
            )));
        }
        let alpha = if design[k][k] > 0.0 { -norm } else { norm };
        let mut v: Vec<f64> = (k..m).map(|i| design[i][k]).collect();
        v[0] -= alpha;
        let v_norm2: f64 = v.iter().map(|x| x * x).sum();
        if v_norm2 == 0.0 {
            continue;
        }

        for j in k..p {
            let dot: f64 = (k..m).map(|i| v[i - k] * design[i][j]).sum();
            let factor = 2.0 * dot / v_norm2;
            for i in k..m {
                design[i][j] -= factor * v[i - k];
            }
        }
        let dot: f64 = (k..m).map(|i| v[i - k] * rhs[i]).sum();
        let factor = 2.0 * dot / v_norm2;
        for i in k..m {
            rhs[i] -= factor * v[i - k];
        }
    }

    let max_diag = (0..p).map(|k| design[k][k].abs()).fold(0.0, f64::max);
    let mut solution = vec![0.0; p];
    for k in (0..p).rev() {
        let r_kk = design[k][k];
        if r_kk.abs() <= RANK_TOLERANCE * max_diag {
            return Err(RfsError::DegenerateFit(format!(
                "design matrix is rank deficient at column {}",
                k
            )));
        }
        let tail: f64 = ((k + 1)..p).map(|j| design[k][j] * solution[j]).sum();
        solution[k] = (rhs[k] - tail) / r_kk;
    }

    Ok(solution
        .into_iter()
        .zip(scales)
        .map(|(b, s)| b / s)
        .collect())
}

/// Row indices of a shuffled train/test split.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded generator and hold out
/// `ceil(n * test_fraction)` rows for testing.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Split {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n);
    let train = indices.split_off(n_test);
    Split {
        train,
        test: indices,
    }
}

/// Mean squared error. Range: [0, inf), 0 = perfect.
pub fn mean_squared_error(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len() as f64;
    observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum::<f64>()
        / n
}

/// Coefficient of determination. Range: (-inf, 1], 1 = perfect.
pub fn r2_score(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Sample standard deviation (`ddof = 1`). `None` for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Train/test scores of a fit made on the training part of a split.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationStats {
    pub n_train: usize,
    pub n_test: usize,
    pub mse_train: f64,
    pub mse_test: f64,
    pub r2_train: f64,
    pub r2_test: f64,
}

/// Fit on `split.train` and score on both halves.
///
/// Returns `None` when either half is too small to fit or score; the
/// validation numbers are informational only.
pub fn validate_fit(x: &[f64], y: &[f64], degree: usize, split: &Split) -> Option<ValidationStats> {
    if split.test.is_empty() || split.train.len() <= degree {
        return None;
    }
    let pick = |idx: &[usize], v: &[f64]| idx.iter().map(|&i| v[i]).collect::<Vec<f64>>();
    let (x_train, y_train) = (pick(&split.train, x), pick(&split.train, y));
    let (x_test, y_test) = (pick(&split.test, x), pick(&split.test, y));

    let model = Polynomial::fit(&x_train, &y_train, degree).ok()?;
    let fit_train: Vec<f64> = x_train.iter().map(|&v| model.evaluate(v)).collect();
    let fit_test: Vec<f64> = x_test.iter().map(|&v| model.evaluate(v)).collect();

    Some(ValidationStats {
        n_train: x_train.len(),
        n_test: x_test.len(),
        mse_train: mean_squared_error(&y_train, &fit_train),
        mse_test: mean_squared_error(&y_test, &fit_test),
        r2_train: r2_score(&y_train, &fit_train),
        r2_test: r2_score(&y_test, &fit_test),
    })
}
