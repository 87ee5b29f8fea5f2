//! Marginal distributions and their quantile transforms.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Beta, ContinuousCDF};
use tranche_core::types::ConfigError;

/// Smallest uniform passed to a quantile function.
pub const U_CLAMP: f64 = 1e-12;

fn one() -> f64 {
    1.0
}

/// Marginal distribution of one risk factor.
///
/// Normal and lognormal marginals are mapped directly from the correlated
/// normal `z`; the others go through `u = Φ(z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Marginal {
    /// `mean + std_dev·z`.
    Normal {
        /// Mean
        #[serde(default)]
        mean: f64,
        /// Standard deviation
        #[serde(default = "one")]
        std_dev: f64,
    },
    /// `exp(mu + sigma·z)`; `mu` defaults to `−sigma²/2` so the mean is one.
    LogNormal {
        /// Location of the underlying normal
        #[serde(default)]
        mu: Option<f64>,
        /// Scale of the underlying normal
        sigma: f64,
    },
    /// Beta on `[lower, upper]`.
    Beta {
        /// First shape parameter
        alpha: f64,
        /// Second shape parameter
        beta: f64,
        /// Lower end of the support
        #[serde(default)]
        lower: f64,
        /// Upper end of the support
        #[serde(default = "one")]
        upper: f64,
    },
    /// One with probability `p`, else zero.
    Bernoulli {
        /// Success probability
        p: f64,
    },
    /// Uniform on `[min, max]`.
    Uniform {
        /// Lower bound
        #[serde(default)]
        min: f64,
        /// Upper bound
        #[serde(default = "one")]
        max: f64,
    },
}

/// A marginal with any distribution objects constructed up front.
#[derive(Debug, Clone)]
pub(crate) enum PreparedMarginal {
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Beta { dist: Beta, lower: f64, width: f64 },
    Bernoulli { p: f64 },
    Uniform { min: f64, width: f64 },
}

impl Marginal {
    /// Validate parameters and build the transform.
    pub(crate) fn prepare(&self, name: &str) -> Result<PreparedMarginal, ConfigError> {
        let invalid = |reason: &str| ConfigError::invalid(format!("factors.{}.marginal", name), reason);
        match *self {
            Marginal::Normal { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0 {
                    return Err(invalid("normal needs a finite mean and non-negative std_dev"));
                }
                Ok(PreparedMarginal::Normal { mean, std_dev })
            }
            Marginal::LogNormal { mu, sigma } => {
                if !sigma.is_finite() || sigma < 0.0 {
                    return Err(invalid("lognormal sigma must be non-negative"));
                }
                let mu = mu.unwrap_or(-0.5 * sigma * sigma);
                if !mu.is_finite() {
                    return Err(invalid("lognormal mu must be finite"));
                }
                Ok(PreparedMarginal::LogNormal { mu, sigma })
            }
            Marginal::Beta {
                alpha,
                beta,
                lower,
                upper,
            } => {
                if !(lower.is_finite() && upper.is_finite() && lower < upper) {
                    return Err(invalid("beta support must satisfy lower < upper"));
                }
                let dist = Beta::new(alpha, beta).map_err(|e| invalid(&e.to_string()))?;
                Ok(PreparedMarginal::Beta {
                    dist,
                    lower,
                    width: upper - lower,
                })
            }
            Marginal::Bernoulli { p } => {
                if !(0.0..=1.0).contains(&p) {
                    return Err(invalid("bernoulli p must lie in [0, 1]"));
                }
                Ok(PreparedMarginal::Bernoulli { p })
            }
            Marginal::Uniform { min, max } => {
                if !(min.is_finite() && max.is_finite() && min <= max) {
                    return Err(invalid("uniform bounds must satisfy min <= max"));
                }
                Ok(PreparedMarginal::Uniform {
                    min,
                    width: max - min,
                })
            }
        }
    }
}

impl PreparedMarginal {
    /// Marginal value for correlated normal `z` with `u = Φ(z)` already clamped.
    #[inline]
    pub(crate) fn transform(&self, z: f64, u: f64) -> f64 {
        match self {
            PreparedMarginal::Normal { mean, std_dev } => mean + std_dev * z,
            PreparedMarginal::LogNormal { mu, sigma } => (mu + sigma * z).exp(),
            PreparedMarginal::Beta { dist, lower, width } => lower + width * dist.inverse_cdf(u),
            PreparedMarginal::Bernoulli { p } => {
                if u > 1.0 - p {
                    1.0
                } else {
                    0.0
                }
            }
            PreparedMarginal::Uniform { min, width } => min + width * u,
        }
    }
}
