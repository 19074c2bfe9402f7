use eyre::{ensure, Result};
use ndarray::ArrayView1;
use serde_derive::{Deserialize, Serialize};

/// Parameters of the ordinal observation error model
///
/// - `s`: probability of observing the true titre
/// - `ea`: probability of observing a titre one unit away, split evenly between both sides
/// - `max_titre`: upper bound of the titre scale
///
/// All remaining mass is spread uniformly over the non-adjacent titres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationError {
    pub s: f64,
    pub ea: f64,
    pub max_titre: i64,
}

impl ObservationError {
    pub fn new(s: f64, ea: f64, max_titre: i64) -> Result<Self> {
        let error = ObservationError { s, ea, max_titre };
        error.validate()?;
        Ok(error)
    }

    /// Build from the `[S, EA, MAX_TITRE]` triple
    pub fn from_slice(params: &[f64]) -> Result<Self> {
        ensure!(
            params.len() == 3,
            "Observation error parameters are given as [S, EA, MAX_TITRE], found {} values",
            params.len()
        );
        Self::new(params[0], params[1], params[2] as i64)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_titre >= 3,
            "The maximum titre must be at least 3, found {}",
            self.max_titre
        );
        ensure!(
            self.s >= 0.0 && self.ea >= 0.0,
            "S and EA must be non-negative (S = {}, EA = {})",
            self.s,
            self.ea
        );
        ensure!(
            self.s + self.ea <= 1.0,
            "S + EA must not exceed 1 (S = {}, EA = {})",
            self.s,
            self.ea
        );
        Ok(())
    }

    /// Probability of observing `obs` when the true titre is `actual`
    pub fn probability(&self, actual: i64, obs: i64) -> f64 {
        obs_error(actual, obs, self.s, self.ea, self.max_titre)
    }

    /// Log-likelihood of an observed titre vector given the believed titres `y`
    pub fn log_likelihood(&self, y: ArrayView1<f64>, data: ArrayView1<f64>) -> f64 {
        obs_likelihood(y, data, self)
    }
}

/// Probability of a single observed titre given the believed true titre
///
/// Both saturating bins (0 and `max_titre`) receive the exact-match mass plus half of the
/// adjacent mass, less one share of the residual.
#[inline(always)]
pub fn obs_error(actual: i64, obs: i64, s: f64, ea: f64, max_titre: i64) -> f64 {
    let residual = (1.0 / (max_titre as f64 - 2.0)) * (1.0 - s - ea);
    if (actual == max_titre && obs == max_titre) || (actual == 0 && obs == 0) {
        s + ea / 2.0 - residual
    } else if actual == obs {
        s
    } else if actual.abs_diff(obs) == 1 {
        ea / 2.0
    } else {
        residual
    }
}

/// Sum of log-probabilities of `data` given the believed titres `y`
///
/// Believed titres are clamped to `[0, max_titre]` and both values are floored before
/// scoring. Infeasible error parameters show up as `-inf` or NaN.
///
/// Both vectors must have the same length; in release builds extra trailing values of the
/// longer one are ignored.
pub fn obs_likelihood(y: ArrayView1<f64>, data: ArrayView1<f64>, error: &ObservationError) -> f64 {
    debug_assert_eq!(
        y.len(),
        data.len(),
        "Believed and observed titre vectors differ in length"
    );
    let max_titre = error.max_titre as f64;
    let mut ln = 0.0;
    for (&believed, &observed) in y.iter().zip(data.iter()) {
        if believed.is_nan() || observed.is_nan() {
            return f64::NAN;
        }
        let believed = believed.clamp(0.0, max_titre);
        ln += error
            .probability(believed.floor() as i64, observed.floor() as i64)
            .ln();
    }
    ln
}
