//! Dense linear algebra for correlation matrices.
//!
//! This module provides:
//! - [`CorrelationMatrix`]: validated, symmetric, unit-diagonal matrix
//! - [`CholeskyFactor`]: lower-triangular factor used to correlate normals
//! - [`PsdRepair`]: record of an eigenvalue-floor substitution
//!
//! Dimensions are small (one row per risk factor), so the symmetric
//! eigen-decomposition uses the cyclic Jacobi method on a row-major `Vec<f64>`.

use crate::types::ConfigError;
use serde::{Deserialize, Serialize};

/// Tolerance for symmetry and unit-diagonal checks.
const STRUCTURE_TOL: f64 = 1e-9;

/// Eigenvalues at or above this are treated as non-negative.
pub const PSD_TOLERANCE: f64 = -1e-10;

/// Pivots below this magnitude are treated as exact zeros during Cholesky.
const PIVOT_EPS: f64 = 1e-12;

/// Maximum number of Jacobi sweeps.
const MAX_SWEEPS: usize = 100;

/// Record of a PSD repair applied to a correlation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsdRepair {
    /// Most negative eigenvalue of the input matrix.
    pub min_eigenvalue: f64,
    /// Floor the negative eigenvalues were clipped to.
    pub floor: f64,
}

/// A validated correlation matrix stored row-major.
///
/// Construction checks that the matrix is square, symmetric, has a unit
/// diagonal and entries in `[-1, 1]`. Positive semi-definiteness is checked
/// separately by [`CorrelationMatrix::cholesky`] or [`CorrelationMatrix::prepare`]
/// so that callers can choose whether to repair.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl CorrelationMatrix {
    /// Identity correlation of the given dimension.
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![0.0; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = 1.0;
        }
        Self { dim, data }
    }

    /// Build from row vectors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedCorrelation`] if the rows are ragged,
    /// the matrix is asymmetric, the diagonal is not one, or any entry lies
    /// outside `[-1, 1]`.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ConfigError> {
        let dim = rows.len();
        let mut data = Vec::with_capacity(dim * dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(ConfigError::MalformedCorrelation(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    dim
                )));
            }
            data.extend_from_slice(row);
        }
        Self::new(dim, data)
    }

    /// Build from a row-major buffer.
    ///
    /// # Errors
    ///
    /// See [`CorrelationMatrix::from_rows`].
    pub fn new(dim: usize, data: Vec<f64>) -> Result<Self, ConfigError> {
        if data.len() != dim * dim {
            return Err(ConfigError::MalformedCorrelation(format!(
                "buffer of length {} cannot hold a {}x{} matrix",
                data.len(),
                dim,
                dim
            )));
        }
        for i in 0..dim {
            let d = data[i * dim + i];
            if (d - 1.0).abs() > STRUCTURE_TOL {
                return Err(ConfigError::MalformedCorrelation(format!(
                    "diagonal entry {} is {}, expected 1",
                    i, d
                )));
            }
            for j in 0..dim {
                let a = data[i * dim + j];
                if !a.is_finite() || a.abs() > 1.0 + STRUCTURE_TOL {
                    return Err(ConfigError::MalformedCorrelation(format!(
                        "entry ({}, {}) = {} is outside [-1, 1]",
                        i, j, a
                    )));
                }
                if (a - data[j * dim + i]).abs() > STRUCTURE_TOL {
                    return Err(ConfigError::MalformedCorrelation(format!(
                        "entries ({}, {}) and ({}, {}) differ",
                        i, j, j, i
                    )));
                }
            }
        }
        Ok(Self { dim, data })
    }

    /// Matrix dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Entry at row `i`, column `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    /// Eigenvalues and eigenvectors of the matrix.
    ///
    /// Returns `(eigenvalues, vectors)` where `vectors` is row-major and its
    /// column `k` is the eigenvector for `eigenvalues[k]`.
    pub fn symmetric_eigen(&self) -> (Vec<f64>, Vec<f64>) {
        let n = self.dim;
        let mut a = self.data.clone();
        let mut v = Self::identity(n).data;

        for _sweep in 0..MAX_SWEEPS {
            let mut off = 0.0;
            for p in 0..n {
                for q in (p + 1)..n {
                    off += a[p * n + q] * a[p * n + q];
                }
            }
            if off < 1e-24 {
                break;
            }

            for p in 0..n {
                for q in (p + 1)..n {
                    let apq = a[p * n + q];
                    if apq.abs() < 1e-300 {
                        continue;
                    }
                    let theta = (a[q * n + q] - a[p * n + p]) / (2.0 * apq);
                    let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                    let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                    let c = 1.0 / (t * t + 1.0).sqrt();
                    let s = t * c;

                    for k in 0..n {
                        let akp = a[k * n + p];
                        let akq = a[k * n + q];
                        a[k * n + p] = c * akp - s * akq;
                        a[k * n + q] = s * akp + c * akq;
                    }
                    for k in 0..n {
                        let apk = a[p * n + k];
                        let aqk = a[q * n + k];
                        a[p * n + k] = c * apk - s * aqk;
                        a[q * n + k] = s * apk + c * aqk;
                    }
                    for k in 0..n {
                        let vkp = v[k * n + p];
                        let vkq = v[k * n + q];
                        v[k * n + p] = c * vkp - s * vkq;
                        v[k * n + q] = s * vkp + c * vkq;
                    }
                }
            }
        }

        let eigenvalues = (0..n).map(|i| a[i * n + i]).collect();
        (eigenvalues, v)
    }

    /// Smallest eigenvalue.
    pub fn min_eigenvalue(&self) -> f64 {
        let (values, _) = self.symmetric_eigen();
        values.into_iter().fold(f64::INFINITY, f64::min)
    }

    /// Clip negative eigenvalues to `floor` and rescale to unit diagonal.
    ///
    /// The result is the nearest correlation matrix in the eigenvalue-clipping
    /// sense: `V · diag(max(λ, floor)) · Vᵀ`, normalised so every diagonal
    /// entry is exactly one.
    pub fn clip_eigenvalues(&self, floor: f64) -> Self {
        let n = self.dim;
        let (values, vectors) = self.symmetric_eigen();
        let clipped: Vec<f64> = values.iter().map(|&l| l.max(floor)).collect();

        let mut rebuilt = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                rebuilt[i * n + j] = (0..n)
                    .map(|k| vectors[i * n + k] * clipped[k] * vectors[j * n + k])
                    .sum();
            }
        }

        let scale: Vec<f64> = (0..n).map(|i| rebuilt[i * n + i].sqrt()).collect();
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                data[i * n + j] = if i == j {
                    1.0
                } else {
                    let sym = 0.5 * (rebuilt[i * n + j] + rebuilt[j * n + i]);
                    (sym / (scale[i] * scale[j])).clamp(-1.0, 1.0)
                };
            }
        }
        Self { dim: n, data }
    }

    /// Cholesky factor `L` with `L · Lᵀ = self`.
    ///
    /// Singular but positive semi-definite matrices (e.g. two perfectly
    /// correlated factors) are accepted: a zero pivot yields a zero column.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotPositiveSemiDefinite`] when a pivot is
    /// materially negative.
    pub fn cholesky(&self) -> Result<CholeskyFactor, ConfigError> {
        let n = self.dim;
        let mut lower = vec![0.0; n * n];

        for j in 0..n {
            let mut pivot = self.get(j, j);
            for k in 0..j {
                pivot -= lower[j * n + k] * lower[j * n + k];
            }

            if pivot < -1e-8 {
                return Err(ConfigError::NotPositiveSemiDefinite {
                    min_eigenvalue: self.min_eigenvalue(),
                });
            }

            if pivot <= PIVOT_EPS {
                // Zero column: the factor is a linear combination of earlier ones.
                continue;
            }

            let ljj = pivot.sqrt();
            lower[j * n + j] = ljj;
            for i in (j + 1)..n {
                let mut s = self.get(i, j);
                for k in 0..j {
                    s -= lower[i * n + k] * lower[j * n + k];
                }
                lower[i * n + j] = s / ljj;
            }
        }

        Ok(CholeskyFactor { dim: n, lower })
    }

    /// Validate positive semi-definiteness, repairing if a floor is given.
    ///
    /// # Arguments
    ///
    /// * `eigenvalue_floor` - Floor used to clip negative eigenvalues; `None`
    ///   makes a non-PSD matrix a hard error
    ///
    /// # Returns
    ///
    /// The Cholesky factor of the (possibly repaired) matrix, and a
    /// [`PsdRepair`] record when a repair took place.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotPositiveSemiDefinite`] when the matrix has a
    /// negative eigenvalue and no floor is configured.
    pub fn prepare(
        &self,
        eigenvalue_floor: Option<f64>,
    ) -> Result<(CholeskyFactor, Option<PsdRepair>), ConfigError> {
        let min_eigenvalue = self.min_eigenvalue();
        if min_eigenvalue >= PSD_TOLERANCE {
            return Ok((self.cholesky()?, None));
        }

        match eigenvalue_floor {
            Some(floor) if floor > 0.0 => {
                let repaired = self.clip_eigenvalues(floor);
                let factor = repaired.cholesky()?;
                Ok((
                    factor,
                    Some(PsdRepair {
                        min_eigenvalue,
                        floor,
                    }),
                ))
            }
            _ => Err(ConfigError::NotPositiveSemiDefinite { min_eigenvalue }),
        }
    }
}

/// Lower-triangular Cholesky factor.
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    dim: usize,
    lower: Vec<f64>,
}

impl CholeskyFactor {
    /// Factor dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Entry `L[i][j]`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.lower[i * self.dim + j]
    }

    /// Correlate independent normals: `out = L · z`.
    ///
    /// # Panics
    ///
    /// Panics if `z` or `out` is shorter than the factor dimension.
    #[inline]
    pub fn apply(&self, z: &[f64], out: &mut [f64]) {
        let n = self.dim;
        for i in 0..n {
            let row = &self.lower[i * n..i * n + i + 1];
            out[i] = row.iter().zip(&z[..=i]).map(|(l, x)| l * x).sum();
        }
    }
}
