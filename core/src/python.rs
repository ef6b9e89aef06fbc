//! Python bindings (feature `python`).
//!
//! Inputs cross the boundary as plain lists in fixed units: masses in solar
//! masses, distances in kiloparsecs, orbital frequencies in hertz,
//! semi-major axes in AU and observation times in years.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::source::{SourceCollection, SourceConfig, SourceError, SourceParams};
use crate::tables::PetersTables;
use crate::types::TriState;
use crate::units::{Quantity, Unit};

fn to_py_err(err: SourceError) -> PyErr {
    match err {
        SourceError::Table(_) | SourceError::Harmonic(_) | SourceError::Sensitivity(_) => {
            PyRuntimeError::new_err(err.to_string())
        }
        _ => PyValueError::new_err(err.to_string()),
    }
}

fn rows(grid: Array2<f64>) -> Vec<Vec<f64>> {
    grid.outer_iter().map(|row| row.to_vec()).collect()
}

/// A batch of binaries with cached SNR.
#[pyclass(name = "Source")]
pub struct PySource {
    inner: SourceCollection,
}

#[pymethods]
impl PySource {
    #[new]
    #[pyo3(signature = (m_1, m_2, ecc, dist, f_orb=None, a=None, gw_lum_tol=0.05, stat_tol=0.01, n_proc=1, interpolate_g=true, interpolate_sc=true))]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        m_1: Vec<f64>,
        m_2: Vec<f64>,
        ecc: Vec<f64>,
        dist: Vec<f64>,
        f_orb: Option<Vec<f64>>,
        a: Option<Vec<f64>>,
        gw_lum_tol: f64,
        stat_tol: f64,
        n_proc: usize,
        interpolate_g: bool,
        interpolate_sc: bool,
    ) -> PyResult<Self> {
        let params = SourceParams {
            m_1: Quantity::from_vec(m_1, Unit::SolarMass),
            m_2: Quantity::from_vec(m_2, Unit::SolarMass),
            ecc: Array1::from(ecc),
            dist: Quantity::from_vec(dist, Unit::Kiloparsec),
            f_orb: f_orb.map(|f| Quantity::from_vec(f, Unit::Hertz)),
            a: a.map(|a| Quantity::from_vec(a, Unit::AstronomicalUnit)),
        };
        let config = SourceConfig {
            gw_lum_tol,
            stat_tol,
            n_proc,
            interpolate_g,
            interpolate_sc,
            ..SourceConfig::default()
        };
        let inner = SourceCollection::new(params, config, Arc::new(PetersTables::default())).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    #[getter]
    fn n_sources(&self) -> usize {
        self.inner.n_sources()
    }

    #[getter]
    fn ecc_threshold(&self) -> f64 {
        self.inner.ecc_threshold()
    }

    #[getter]
    fn snr(&self) -> Option<Vec<f64>> {
        self.inner.snr().map(|s| s.to_vec())
    }

    /// Compute (and cache) the SNR of every source.
    #[pyo3(signature = (t_obs=4.0, n_step=100))]
    fn get_snr(&mut self, t_obs: f64, n_step: usize) -> PyResult<Vec<f64>> {
        self.inner
            .get_snr(&Quantity::years(t_obs), n_step)
            .map(|s| s.to_vec())
            .map_err(to_py_err)
    }

    /// `None` means either, `True` only circular/stationary, `False` only
    /// eccentric/evolving.
    #[pyo3(signature = (circular=None, stationary=None, t_obs=4.0))]
    fn get_source_mask(&self, circular: Option<bool>, stationary: Option<bool>, t_obs: f64) -> PyResult<Vec<bool>> {
        self.inner
            .get_source_mask(TriState::from(circular), TriState::from(stationary), &Quantity::years(t_obs))
            .map(|m| m.to_vec())
            .map_err(to_py_err)
    }

    fn harmonics_required(&self) -> Vec<usize> {
        self.inner.harmonics_required().to_vec()
    }

    fn dominant_harmonic(&self) -> Vec<usize> {
        self.inner.dominant_harmonic().to_vec()
    }

    fn get_h_0_n(&self, harmonics: Vec<u32>) -> PyResult<Vec<Vec<f64>>> {
        self.inner.get_h_0_n(&harmonics, None).map(rows).map_err(to_py_err)
    }

    fn get_h_c_n(&self, harmonics: Vec<u32>) -> PyResult<Vec<Vec<f64>>> {
        self.inner.get_h_c_n(&harmonics, None).map(rows).map_err(to_py_err)
    }

    fn update_gw_lum_tol(&mut self, gw_lum_tol: f64) -> PyResult<()> {
        self.inner.update_gw_lum_tol(gw_lum_tol).map_err(to_py_err)
    }

    /// JSON summary of the last SNR dispatch, if any.
    fn last_report(&self) -> PyResult<Option<String>> {
        self.inner
            .last_report()
            .map(|r| r.to_json())
            .transpose()
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!(
            "Source(n_sources={}, gw_lum_tol={}, ecc_threshold={:.5})",
            self.inner.n_sources(),
            self.inner.gw_lum_tol(),
            self.inner.ecc_threshold()
        )
    }
}

/// The top-level Python module exposed by this crate.
#[pymodule]
fn lisasnr_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySource>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("__doc__", "Detectability of gravitational-wave binaries for LISA-like detectors.")?;
    Ok(())
}
