//! Tolerance-driven harmonic truncation.
//!
//! An eccentric binary radiates at infinitely many harmonics of its orbital
//! frequency, but only a finite number are needed to recover all but a
//! fraction `tol` of the total GW luminosity.  [`HarmonicModel`] turns a
//! [`HarmonicTable`] into two functions of eccentricity:
//!
//! - [`HarmonicModel::harmonics_required`] — the smallest harmonic count `N`
//!   with `Σ_{n≤N} g(n, e) ≥ (1 − tol) F(e)`, monotonic non-decreasing in
//!   `e`, ceiling-rounded so it never under-counts;
//! - [`HarmonicModel::dominant_harmonic`] — the harmonic carrying the most
//!   power, rounded to the nearest integer.

use ndarray::Array1;

use crate::interp::{FillValue, Interp1d, InterpError};
use crate::tables::{HarmonicTable, TableError};

/// Errors raised while building a [`HarmonicModel`].
#[derive(Debug, thiserror::Error)]
pub enum HarmonicError {
    #[error("GW luminosity tolerance must lie in (0, 1), got {0}")]
    InvalidTolerance(f64),

    #[error("harmonic table unavailable: {0}")]
    Table(#[from] TableError),

    #[error("cannot interpolate harmonic counts: {0}")]
    Interp(#[from] InterpError),
}

/// Harmonic count for a truly circular binary.
pub const CIRCULAR_HARMONICS: usize = 2;

/// Harmonic-count and dominant-harmonic functions for one tolerance.
#[derive(Clone, Debug)]
pub struct HarmonicModel {
    gw_lum_tol: f64,
    e_max: f64,
    required_steps: Vec<usize>,
    required: Interp1d,
    dominant: Interp1d,
}

impl HarmonicModel {
    /// Build both functions from `table` for luminosity tolerance `gw_lum_tol`.
    pub fn build(table: &HarmonicTable, gw_lum_tol: f64) -> Result<Self, HarmonicError> {
        if !(gw_lum_tol > 0.0 && gw_lum_tol < 1.0) {
            return Err(HarmonicError::InvalidTolerance(gw_lum_tol));
        }

        let e_range = table.eccentricities().to_vec();
        let required_steps = required_counts(table, gw_lum_tol);
        let max_required = required_steps.iter().copied().max().unwrap_or(CIRCULAR_HARMONICS);

        let required = Interp1d::new(
            e_range.clone(),
            required_steps.iter().map(|&n| n as f64).collect(),
            FillValue {
                below: CIRCULAR_HARMONICS as f64,
                above: max_required as f64,
            },
        )?;

        let dominant_steps = dominant_harmonics(table);
        let max_dominant = dominant_steps.iter().copied().max().unwrap_or(CIRCULAR_HARMONICS);
        let dominant = Interp1d::new(
            e_range,
            dominant_steps.iter().map(|&n| n as f64).collect(),
            FillValue {
                below: CIRCULAR_HARMONICS as f64,
                above: max_dominant as f64,
            },
        )?;

        log::debug!(
            "Harmonic model built for tol={:.3e}: up to {} harmonics over {} eccentricities",
            gw_lum_tol,
            max_required,
            table.e_len(),
        );

        Ok(Self {
            gw_lum_tol,
            e_max: table.e_max(),
            required_steps,
            required,
            dominant,
        })
    }

    pub fn gw_lum_tol(&self) -> f64 {
        self.gw_lum_tol
    }

    /// Largest eccentricity the underlying table resolves.  Above it both
    /// functions return their last tabulated value.
    pub fn e_max(&self) -> f64 {
        self.e_max
    }

    /// Number of eccentricities in `ecc` beyond [`Self::e_max`].
    pub fn count_beyond_table(&self, ecc: &Array1<f64>) -> usize {
        ecc.iter().filter(|&&e| e > self.e_max).count()
    }

    /// Harmonic count needed at each grid eccentricity (non-decreasing).
    pub fn required_steps(&self) -> &[usize] {
        &self.required_steps
    }

    /// Largest harmonic count the table can demand.
    pub fn max_required(&self) -> usize {
        self.required_steps
            .iter()
            .copied()
            .max()
            .unwrap_or(CIRCULAR_HARMONICS)
    }

    /// Harmonics needed to capture `(1 − tol)` of the GW luminosity at `e`.
    pub fn harmonics_required(&self, e: f64) -> usize {
        let n = self.required.eval(e).ceil();
        if n.is_finite() {
            (n as usize).max(CIRCULAR_HARMONICS)
        } else {
            self.max_required()
        }
    }

    pub fn harmonics_required_array(&self, ecc: &Array1<f64>) -> Array1<usize> {
        ecc.mapv(|e| self.harmonics_required(e))
    }

    /// Harmonic index of peak luminosity at `e`.
    pub fn dominant_harmonic(&self, e: f64) -> usize {
        let n = self.dominant.eval(e).round();
        if n.is_finite() {
            (n as usize).max(CIRCULAR_HARMONICS)
        } else {
            CIRCULAR_HARMONICS
        }
    }

    pub fn dominant_harmonic_array(&self, ecc: &Array1<f64>) -> Array1<usize> {
        ecc.mapv(|e| self.dominant_harmonic(e))
    }
}

/// Step function of required harmonic counts, one per grid eccentricity.
///
/// Each grid point starts from the previous point's count and only ever adds
/// harmonics, so the result is non-decreasing.
fn required_counts(table: &HarmonicTable, gw_lum_tol: f64) -> Vec<usize> {
    let n_max = table.n_max();
    let mut needed = vec![0usize; table.e_len()];
    needed[0] = CIRCULAR_HARMONICS;

    for i in 1..table.e_len() {
        let row = table.g_vals.row(i);
        let target = (1.0 - gw_lum_tol) * table.f_vals[i];

        let mut count = needed[i - 1];
        let mut total: f64 = row.iter().take(count).sum();
        while total < target && count < n_max {
            count += 1;
            total += row[count - 1];
        }
        needed[i] = count;
    }
    needed
}

/// Harmonic index (1-based) of the first maximum of each table row.
fn dominant_harmonics(table: &HarmonicTable) -> Vec<usize> {
    table
        .g_vals
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (k, &g) in row.iter().enumerate() {
                if g > row[best] {
                    best = k;
                }
            }
            best + 1
        })
        .collect()
}
