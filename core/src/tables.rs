//! Harmonic-luminosity lookup tables and their providers.
//!
//! The harmonic model and the strain calculation both read precomputed grids
//! of `g(n, e)`.  Where those grids come from is a collaborator concern, so
//! the rest of the crate only sees the [`HarmonicTableProvider`] trait.  Two
//! implementations are provided:
//!
//! - [`PetersTables`] — evaluates the grids in-process from the Bessel-series
//!   form of `g(n, e)` (parallelised over eccentricity rows with rayon) and
//!   caches them, so repeated loads are free and idempotent.
//! - [`JsonTableReader`] — deserialises tables previously written with
//!   `serde_json`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::peters::{peters_f, peters_g};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised while building or loading lookup tables.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed table file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("table shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("invalid table grid: {0}")]
    BadGrid(String),
}

// ---------------------------------------------------------------------------
// Grid descriptions
// ---------------------------------------------------------------------------

/// Eccentricity/harmonic extent of a [`HarmonicTable`].
///
/// The default reaches `e = 0.99` with 10000 harmonics, where `Σ g(n, e)`
/// has converged to `F(e)`.  Going further gains nothing: the harmonic
/// buckets stop at 9999 harmonics, and `e = 0.995` already needs more than
/// that at the default tolerance.  Sources above `e_max` are clamped to the
/// last row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarmonicGrid {
    pub e_min: f64,
    pub e_max: f64,
    pub e_len: usize,
    pub n_max: usize,
}

impl Default for HarmonicGrid {
    fn default() -> Self {
        Self {
            e_min: 0.0,
            e_max: 0.99,
            e_len: 100,
            n_max: 10_000,
        }
    }
}

impl HarmonicGrid {
    fn validate(&self) -> Result<(), TableError> {
        if !(0.0..1.0).contains(&self.e_min) || !(self.e_min..1.0).contains(&self.e_max) {
            return Err(TableError::BadGrid(format!(
                "need 0 <= e_min < e_max < 1, got e_min={}, e_max={}",
                self.e_min, self.e_max
            )));
        }
        if self.e_min == self.e_max || self.e_len < 2 {
            return Err(TableError::BadGrid(format!(
                "eccentricity grid must span at least 2 distinct points (e_len={})",
                self.e_len
            )));
        }
        if self.n_max < 2 {
            return Err(TableError::BadGrid(format!(
                "need at least 2 harmonics, got n_max={}",
                self.n_max
            )));
        }
        Ok(())
    }

    /// `1 − logspace(log10(1 − e_min), log10(1 − e_max), e_len)`, which is
    /// increasing and densest near `e = 1`.
    pub fn eccentricities(&self) -> Array1<f64> {
        let lo = (1.0 - self.e_min).log10();
        let hi = (1.0 - self.e_max).log10();
        let step = (hi - lo) / (self.e_len - 1) as f64;
        Array1::from_iter((0..self.e_len).map(|i| 1.0 - 10f64.powf(lo + step * i as f64)))
    }
}

/// Extent of a [`FineGTable`]: harmonics `1..=n_max`, `e = linspace(0, 1, e_len)`.
///
/// Harmonics above `n_max` are evaluated from the Bessel series on every
/// call.  The default covers the first three harmonic buckets; the table
/// costs `8 · n_max · e_len` bytes (8 MB here) and `O(n_max²)` Bessel work
/// per row to build.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FineGrid {
    pub n_max: usize,
    pub e_len: usize,
}

impl Default for FineGrid {
    fn default() -> Self {
        Self {
            n_max: 1000,
            e_len: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// HarmonicTable
// ---------------------------------------------------------------------------

/// A computed row stops once `Σ g` is within this fraction of `F(e)`; the
/// remaining harmonics are stored as zero.
pub const TAIL_FRACTION: f64 = 1e-10;

/// `g(n, e)` over a log-in-(1 − e) eccentricity grid, plus `F(e)` on the same
/// grid.  `g_vals` has shape `(e_len, n_max)`; column `k` is harmonic `k + 1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarmonicTable {
    pub grid: HarmonicGrid,
    pub g_vals: Array2<f64>,
    pub f_vals: Array1<f64>,
}

impl HarmonicTable {
    pub fn new(grid: HarmonicGrid, g_vals: Array2<f64>, f_vals: Array1<f64>) -> Result<Self, TableError> {
        grid.validate()?;
        let expected = (grid.e_len, grid.n_max);
        if g_vals.dim() != expected {
            return Err(TableError::ShapeMismatch {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", g_vals.dim()),
            });
        }
        if f_vals.len() != grid.e_len {
            return Err(TableError::ShapeMismatch {
                expected: format!("({},)", grid.e_len),
                actual: format!("({},)", f_vals.len()),
            });
        }
        Ok(Self { grid, g_vals, f_vals })
    }

    /// Evaluate `g(n, e)` and `F(e)` on `grid` from the Peters formulas.
    ///
    /// Each row is filled up to the harmonic where the partial sum reaches
    /// `(1 − TAIL_FRACTION) F(e)`.
    pub fn from_peters(grid: HarmonicGrid) -> Result<Self, TableError> {
        grid.validate()?;
        let e_range = grid.eccentricities();
        let f_vals = e_range.mapv(peters_f);
        let mut g_vals = Array2::<f64>::zeros((grid.e_len, grid.n_max));
        g_vals
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i, mut row)| {
                let e = e_range[i];
                let target = (1.0 - TAIL_FRACTION) * f_vals[i];
                let mut total = 0.0;
                for (k, v) in row.iter_mut().enumerate() {
                    *v = peters_g(k as u32 + 1, e);
                    total += *v;
                    if total >= target {
                        break;
                    }
                }
            });
        Self::new(grid, g_vals, f_vals)
    }

    pub fn eccentricities(&self) -> Array1<f64> {
        self.grid.eccentricities()
    }

    pub fn n_max(&self) -> usize {
        self.grid.n_max
    }

    /// Largest tabulated eccentricity.
    pub fn e_max(&self) -> f64 {
        self.grid.e_max
    }

    pub fn e_len(&self) -> usize {
        self.grid.e_len
    }
}

// ---------------------------------------------------------------------------
// FineGTable
// ---------------------------------------------------------------------------

/// Dense `g(n, e)` grid used for per-source strain evaluation.
///
/// `values` has shape `(e_len, n_max)` over `e = linspace(0, 1, e_len)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FineGTable {
    pub grid: FineGrid,
    pub values: Array2<f64>,
}

impl FineGTable {
    pub fn new(grid: FineGrid, values: Array2<f64>) -> Result<Self, TableError> {
        if grid.e_len < 2 || grid.n_max < 1 {
            return Err(TableError::BadGrid(format!(
                "fine grid needs e_len >= 2 and n_max >= 1, got {:?}",
                grid
            )));
        }
        let expected = (grid.e_len, grid.n_max);
        if values.dim() != expected {
            return Err(TableError::ShapeMismatch {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", values.dim()),
            });
        }
        Ok(Self { grid, values })
    }

    pub fn from_peters(grid: FineGrid) -> Result<Self, TableError> {
        if grid.e_len < 2 {
            return Err(TableError::BadGrid("fine grid needs e_len >= 2".into()));
        }
        let step = 1.0 / (grid.e_len - 1) as f64;
        let mut values = Array2::<f64>::zeros((grid.e_len, grid.n_max));
        values
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i, mut row)| {
                // g(n, 1) is singular; keep the last row finite with e just below 1.
                let e = (i as f64 * step).min(1.0 - 1e-9);
                let target = (1.0 - TAIL_FRACTION) * peters_f(e);
                let mut total = 0.0;
                for (k, v) in row.iter_mut().enumerate() {
                    *v = peters_g(k as u32 + 1, e);
                    total += *v;
                    if total >= target {
                        break;
                    }
                }
            });
        Self::new(grid, values)
    }

    pub fn n_max(&self) -> usize {
        self.grid.n_max
    }

    /// Linear interpolation in `e` at integer harmonic `n`.
    ///
    /// Returns `None` when `n` lies outside the tabulated harmonics.
    pub fn lookup(&self, n: u32, e: f64) -> Option<f64> {
        let n = n as usize;
        if n == 0 || n > self.grid.n_max || e.is_nan() {
            return None;
        }
        let col = n - 1;
        let last = self.grid.e_len - 1;
        let pos = e.clamp(0.0, 1.0) * last as f64;
        let i = (pos.floor() as usize).min(last - 1);
        let t = pos - i as f64;
        let (g0, g1) = (self.values[[i, col]], self.values[[i + 1, col]]);
        Some(g0 + t * (g1 - g0))
    }
}

// ---------------------------------------------------------------------------
// Transfer function
// ---------------------------------------------------------------------------

/// Tabulated sky- and polarisation-averaged detector response `R(f/f*)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferTable {
    /// Dimensionless frequency `f / f*`, strictly increasing.
    pub f_over_fstar: Vec<f64>,
    pub response: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Source of the precomputed numerical tables.
///
/// Implementations must be idempotent: every call returns the same table.
pub trait HarmonicTableProvider: Send + Sync {
    /// Coarse `g(n, e)` / `F(e)` grid used to build the harmonic model.
    fn harmonic_table(&self) -> Result<Arc<HarmonicTable>, TableError>;

    /// Dense `g(n, e)` grid used for strain interpolation.
    fn fine_g_table(&self) -> Result<Arc<FineGTable>, TableError>;

    /// Exact detector response, if this provider has one.
    fn transfer_function(&self) -> Result<Option<Arc<TransferTable>>, TableError> {
        Ok(None)
    }
}

/// Warns, at most once per provider, that exact-response curves will fall
/// back to the analytic approximation.
#[derive(Debug, Default)]
struct ResponseFallback(AtomicBool);

impl ResponseFallback {
    /// Returns whether the warning was emitted by this call.
    fn note(&self, provider: &str) -> bool {
        if self.0.swap(true, Ordering::Relaxed) {
            return false;
        }
        log::warn!("{provider} has no tabulated detector response; exact-response curves use the analytic approximation");
        true
    }
}

impl Clone for ResponseFallback {
    fn clone(&self) -> Self {
        Self(AtomicBool::new(self.0.load(Ordering::Relaxed)))
    }
}

/// Tables evaluated from the Peters formulas on first use and then cached.
///
/// No detector response is tabulated, so a curve built with
/// `approximate_response = false` uses the analytic fit.
#[derive(Debug, Default)]
pub struct PetersTables {
    harmonic_grid: HarmonicGrid,
    fine_grid: FineGrid,
    harmonic: OnceLock<Arc<HarmonicTable>>,
    fine: OnceLock<Arc<FineGTable>>,
    response_fallback: ResponseFallback,
}

impl PetersTables {
    pub fn new(harmonic_grid: HarmonicGrid, fine_grid: FineGrid) -> Self {
        Self {
            harmonic_grid,
            fine_grid,
            harmonic: OnceLock::new(),
            fine: OnceLock::new(),
            response_fallback: ResponseFallback::default(),
        }
    }
}

impl HarmonicTableProvider for PetersTables {
    fn harmonic_table(&self) -> Result<Arc<HarmonicTable>, TableError> {
        if let Some(table) = self.harmonic.get() {
            return Ok(Arc::clone(table));
        }
        log::debug!("Evaluating harmonic table on {:?}", self.harmonic_grid);
        let table = Arc::new(HarmonicTable::from_peters(self.harmonic_grid)?);
        Ok(Arc::clone(self.harmonic.get_or_init(|| table)))
    }

    fn fine_g_table(&self) -> Result<Arc<FineGTable>, TableError> {
        if let Some(table) = self.fine.get() {
            return Ok(Arc::clone(table));
        }
        log::debug!("Evaluating fine g(n, e) table on {:?}", self.fine_grid);
        let table = Arc::new(FineGTable::from_peters(self.fine_grid)?);
        Ok(Arc::clone(self.fine.get_or_init(|| table)))
    }

    fn transfer_function(&self) -> Result<Option<Arc<TransferTable>>, TableError> {
        self.response_fallback.note("PetersTables");
        Ok(None)
    }
}

/// Reads tables serialised with `serde_json`.
#[derive(Clone, Debug)]
pub struct JsonTableReader {
    pub harmonic_path: PathBuf,
    pub fine_path: PathBuf,
    pub transfer_path: Option<PathBuf>,
    response_fallback: ResponseFallback,
}

impl JsonTableReader {
    pub fn new(harmonic_path: impl Into<PathBuf>, fine_path: impl Into<PathBuf>) -> Self {
        Self {
            harmonic_path: harmonic_path.into(),
            fine_path: fine_path.into(),
            transfer_path: None,
            response_fallback: ResponseFallback::default(),
        }
    }

    pub fn with_transfer_function(mut self, path: impl Into<PathBuf>) -> Self {
        self.transfer_path = Some(path.into());
        self
    }

    fn read<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, TableError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl HarmonicTableProvider for JsonTableReader {
    fn harmonic_table(&self) -> Result<Arc<HarmonicTable>, TableError> {
        let raw: HarmonicTable = Self::read(&self.harmonic_path)?;
        // Re-validate: the file may have been edited by hand.
        Ok(Arc::new(HarmonicTable::new(raw.grid, raw.g_vals, raw.f_vals)?))
    }

    fn fine_g_table(&self) -> Result<Arc<FineGTable>, TableError> {
        let raw: FineGTable = Self::read(&self.fine_path)?;
        Ok(Arc::new(FineGTable::new(raw.grid, raw.values)?))
    }

    fn transfer_function(&self) -> Result<Option<Arc<TransferTable>>, TableError> {
        match &self.transfer_path {
            Some(path) => Ok(Some(Arc::new(Self::read(path)?))),
            None => {
                self.response_fallback.note("JsonTableReader");
                Ok(None)
            }
        }
    }
}
