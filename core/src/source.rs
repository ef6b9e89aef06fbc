//! Batches of gravitational-wave sources and their detectability.
//!
//! A [`SourceCollection`] owns a batch of binaries (in SI units), the
//! harmonic model and circular threshold for its luminosity tolerance, the
//! `g(n, e)` evaluator and the sensitivity curve.  Its operations classify
//! the batch, compute strains and dispatch SNR calculations.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lisasnr_core::{PetersTables, Quantity, SourceCollection, SourceConfig, SourceParams, Unit};
//!
//! let params = SourceParams {
//!     m_1: Quantity::from_vec(vec![10.0], Unit::SolarMass),
//!     m_2: Quantity::from_vec(vec![10.0], Unit::SolarMass),
//!     ecc: vec![0.0].into(),
//!     dist: Quantity::from_vec(vec![1.0], Unit::Kiloparsec),
//!     f_orb: Some(Quantity::from_vec(vec![1.0], Unit::Millihertz)),
//!     a: None,
//! };
//! let mut sources = SourceCollection::new(params, SourceConfig::default(), Arc::new(PetersTables::default()))?;
//! let _snr = sources.get_snr(&Quantity::years(4.0), 100)?;
//! # Ok::<(), lisasnr_core::SourceError>(())
//! ```

use std::sync::Arc;

use log::warn;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::dispatch::Dispatcher;
use crate::eccentricity::{EccentricityClassifier, TransitionError};
use crate::harmonics::{HarmonicError, HarmonicModel};
use crate::orbit::{a_from_f_orb, chirp_mass, f_orb_from_a};
use crate::sensitivity::{SensitivityConfig, SensitivityCurve, SensitivityError};
use crate::stationarity::{stationary_mask, DEFAULT_STAT_TOL};
use crate::strain::{h_0_n, h_c_n, strain_grid, GFunction};
use crate::tables::{HarmonicTableProvider, TableError};
use crate::types::{BinaryArrays, DispatchReport, InvalidSelection, SnrMode, TriState};
use crate::units::{Dimension, Quantity, UnitError};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("either `f_orb` or `a` must be supplied")]
    MissingOrbit,

    #[error("`{name}` has {actual} entries, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Units(#[from] UnitError),

    #[error("eccentricity of source {index} must lie in [0, 1), got {value}")]
    InvalidEccentricity { index: usize, value: f64 },

    #[error(transparent)]
    InvalidSelection(#[from] InvalidSelection),

    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    #[error(transparent)]
    Harmonic(#[from] HarmonicError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Sensitivity(#[from] SensitivityError),
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Per-source inputs, unit-tagged.
///
/// At least one of `f_orb` and `a` must be present; the other is derived
/// with Kepler's third law.  When both are given both are kept as supplied
/// and are not checked against each other.
#[derive(Clone, Debug)]
pub struct SourceParams {
    pub m_1: Quantity<Array1<f64>>,
    pub m_2: Quantity<Array1<f64>>,
    pub ecc: Array1<f64>,
    pub dist: Quantity<Array1<f64>>,
    pub f_orb: Option<Quantity<Array1<f64>>>,
    pub a: Option<Quantity<Array1<f64>>>,
}

/// Tolerances and evaluation switches of a [`SourceCollection`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Fraction of GW luminosity that may be dropped by harmonic truncation.
    pub gw_lum_tol: f64,

    /// Largest fractional frequency drift for a stationary source.
    pub stat_tol: f64,

    /// Workers for the eccentric/evolving branch.
    pub n_proc: usize,

    /// Evaluate `g(n, e)` from the fine table instead of Bessel series.
    pub interpolate_g: bool,

    /// Tabulate the sensitivity curve instead of evaluating it per query.
    pub interpolate_sc: bool,

    pub sc_params: SensitivityConfig,

    pub mode: SnrMode,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            gw_lum_tol: 0.05,
            stat_tol: DEFAULT_STAT_TOL,
            n_proc: 1,
            interpolate_g: true,
            interpolate_sc: true,
            sc_params: SensitivityConfig::default(),
            mode: SnrMode::Auto,
        }
    }
}

// ---------------------------------------------------------------------------
// SourceCollection
// ---------------------------------------------------------------------------

pub struct SourceCollection {
    binaries: BinaryArrays,
    config: SourceConfig,
    provider: Arc<dyn HarmonicTableProvider>,
    harmonics: HarmonicModel,
    classifier: EccentricityClassifier,
    g: GFunction,
    curve: SensitivityCurve,
    snr: Option<Array1<f64>>,
    last_report: Option<DispatchReport>,
}

impl std::fmt::Debug for SourceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCollection")
            .field("n_sources", &self.n_sources())
            .field("config", &self.config)
            .field("ecc_threshold", &self.classifier.threshold())
            .finish_non_exhaustive()
    }
}

impl SourceCollection {
    /// Validate `params`, convert them to SI and build the models.
    pub fn new(
        params: SourceParams,
        config: SourceConfig,
        provider: Arc<dyn HarmonicTableProvider>,
    ) -> Result<Self, SourceError> {
        let binaries = validate(params)?;

        let table = provider.harmonic_table()?;
        let harmonics = HarmonicModel::build(&table, config.gw_lum_tol)?;
        let beyond_table = harmonics.count_beyond_table(&binaries.ecc);
        if beyond_table > 0 {
            warn!(
                "{} of {} sources exceed the harmonic table's e_max={}",
                beyond_table,
                binaries.len(),
                harmonics.e_max()
            );
        }
        let classifier = EccentricityClassifier::new(config.gw_lum_tol)?;
        let g = Self::g_function(provider.as_ref(), config.interpolate_g)?;
        let curve = Self::build_curve(provider.as_ref(), &config)?;

        log::info!(
            "Created collection of {} sources (circular below e={:.4})",
            binaries.len(),
            classifier.threshold()
        );

        Ok(Self {
            binaries,
            config,
            provider,
            harmonics,
            classifier,
            g,
            curve,
            snr: None,
            last_report: None,
        })
    }

    /// A collection whose SNR treats every source as stationary.
    pub fn stationary(
        params: SourceParams,
        config: SourceConfig,
        provider: Arc<dyn HarmonicTableProvider>,
    ) -> Result<Self, SourceError> {
        Self::new(
            params,
            SourceConfig {
                mode: SnrMode::Stationary,
                ..config
            },
            provider,
        )
    }

    /// A collection whose SNR treats every source as evolving.
    pub fn evolving(
        params: SourceParams,
        config: SourceConfig,
        provider: Arc<dyn HarmonicTableProvider>,
    ) -> Result<Self, SourceError> {
        Self::new(
            params,
            SourceConfig {
                mode: SnrMode::Evolving,
                ..config
            },
            provider,
        )
    }

    // -- accessors ----------------------------------------------------------

    pub fn n_sources(&self) -> usize {
        self.binaries.len()
    }

    /// Source parameters in SI units.
    pub fn binaries(&self) -> &BinaryArrays {
        &self.binaries
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn gw_lum_tol(&self) -> f64 {
        self.config.gw_lum_tol
    }

    pub fn stat_tol(&self) -> f64 {
        self.config.stat_tol
    }

    /// Eccentricity at or below which sources are circular.
    pub fn ecc_threshold(&self) -> f64 {
        self.classifier.threshold()
    }

    pub fn harmonic_model(&self) -> &HarmonicModel {
        &self.harmonics
    }

    pub fn sensitivity_curve(&self) -> &SensitivityCurve {
        &self.curve
    }

    /// SNR of the most recent [`SourceCollection::get_snr`] call.
    ///
    /// Not invalidated by later configuration changes.
    pub fn snr(&self) -> Option<&Array1<f64>> {
        self.snr.as_ref()
    }

    pub fn last_report(&self) -> Option<&DispatchReport> {
        self.last_report.as_ref()
    }

    // -- configuration updates ----------------------------------------------

    /// Change the luminosity tolerance, rebuilding the harmonic model and the
    /// circular threshold.  On error the collection is left unchanged.
    pub fn update_gw_lum_tol(&mut self, gw_lum_tol: f64) -> Result<(), SourceError> {
        let table = self.provider.harmonic_table()?;
        let harmonics = HarmonicModel::build(&table, gw_lum_tol)?;
        let classifier = EccentricityClassifier::new(gw_lum_tol)?;
        self.harmonics = harmonics;
        self.classifier = classifier;
        self.config.gw_lum_tol = gw_lum_tol;
        Ok(())
    }

    /// Replace the sensitivity-curve parameters.
    ///
    /// Returns whether the curve was rebuilt; identical parameters are a no-op.
    pub fn update_sc_params(&mut self, sc_params: SensitivityConfig) -> Result<bool, SourceError> {
        if sc_params == self.config.sc_params {
            return Ok(false);
        }
        let previous = std::mem::replace(&mut self.config.sc_params, sc_params);
        match self.set_sc(self.config.interpolate_sc) {
            Ok(()) => Ok(true),
            Err(err) => {
                self.config.sc_params = previous;
                Err(err)
            }
        }
    }

    /// Choose between the fine `g(n, e)` table and the exact Bessel series.
    pub fn set_g(&mut self, interpolate_g: bool) -> Result<(), SourceError> {
        self.g = Self::g_function(self.provider.as_ref(), interpolate_g)?;
        self.config.interpolate_g = interpolate_g;
        Ok(())
    }

    /// Rebuild the sensitivity curve, tabulated or analytic.
    pub fn set_sc(&mut self, interpolate_sc: bool) -> Result<(), SourceError> {
        let config = SourceConfig {
            interpolate_sc,
            ..self.config.clone()
        };
        self.curve = Self::build_curve(self.provider.as_ref(), &config)?;
        self.config.interpolate_sc = interpolate_sc;
        Ok(())
    }

    fn g_function(provider: &dyn HarmonicTableProvider, interpolate: bool) -> Result<GFunction, SourceError> {
        Ok(if interpolate {
            GFunction::Interpolated(provider.fine_g_table()?)
        } else {
            GFunction::Exact
        })
    }

    fn build_curve(provider: &dyn HarmonicTableProvider, config: &SourceConfig) -> Result<SensitivityCurve, SourceError> {
        let transfer = if config.sc_params.approximate_response {
            None
        } else {
            provider.transfer_function()?
        };
        let sc = config.sc_params.clone();
        let curve = if config.interpolate_sc {
            SensitivityCurve::interpolated(sc, transfer.as_deref())?
        } else {
            SensitivityCurve::analytic(sc, transfer.as_deref())?
        };
        Ok(curve)
    }

    // -- classification -----------------------------------------------------

    /// Mask of sources matching both selectors.
    ///
    /// The stationarity test is only evaluated when `stationary` is not
    /// [`TriState::Either`].
    pub fn get_source_mask(
        &self,
        circular: TriState,
        stationary: TriState,
        t_obs: &Quantity,
    ) -> Result<Array1<bool>, SourceError> {
        let t_obs = observation_time(t_obs)?;
        let circ = self.classifier.circular_mask(&self.binaries.ecc);
        let stat = match stationary {
            TriState::Either => Array1::from_elem(self.n_sources(), true),
            _ => stationary_mask(
                &self.binaries.m_c,
                &self.binaries.f_orb,
                &self.binaries.ecc,
                t_obs,
                self.config.stat_tol,
            ),
        };
        Ok(ndarray::Zip::from(&circ)
            .and(&stat)
            .map_collect(|&c, &s| circular.admits(c) && stationary.admits(s)))
    }

    /// [`SourceCollection::get_source_mask`] with selector strings
    /// (`"true"`, `"false"`, `"both"`).
    pub fn get_source_mask_str(&self, circular: &str, stationary: &str, t_obs: &Quantity) -> Result<Array1<bool>, SourceError> {
        let circular = TriState::parse("circular", circular)?;
        let stationary = TriState::parse("stationary", stationary)?;
        self.get_source_mask(circular, stationary, t_obs)
    }

    /// Harmonics needed for each source's eccentricity.
    pub fn harmonics_required(&self) -> Array1<usize> {
        self.harmonics.harmonics_required_array(&self.binaries.ecc)
    }

    /// Dominant harmonic for each source's eccentricity.
    pub fn dominant_harmonic(&self) -> Array1<usize> {
        self.harmonics.dominant_harmonic_array(&self.binaries.ecc)
    }

    // -- strain -------------------------------------------------------------

    /// Strain amplitude, shape `(selected sources, harmonics)`.
    pub fn get_h_0_n(&self, harmonics: &[u32], which: Option<&Array1<bool>>) -> Result<Array2<f64>, SourceError> {
        let b = self.subset(which)?;
        Ok(strain_grid(&b.m_c, &b.f_orb, &b.ecc, &b.dist, harmonics, |m, f, e, n, d| {
            h_0_n(m, f, e, n, d, &self.g)
        }))
    }

    /// Characteristic strain, shape `(selected sources, harmonics)`.
    pub fn get_h_c_n(&self, harmonics: &[u32], which: Option<&Array1<bool>>) -> Result<Array2<f64>, SourceError> {
        let b = self.subset(which)?;
        Ok(strain_grid(&b.m_c, &b.f_orb, &b.ecc, &b.dist, harmonics, |m, f, e, n, d| {
            h_c_n(m, f, e, n, d, &self.g)
        }))
    }

    // -- SNR ----------------------------------------------------------------

    /// SNR of every source, routed by classification (or by the forced
    /// mode).  The result is cached and returned.
    pub fn get_snr(&mut self, t_obs: &Quantity, n_step: usize) -> Result<Array1<f64>, SourceError> {
        let t_obs = observation_time(t_obs)?;
        check_n_step(n_step)?;

        let sc_t_obs = self.curve.config().t_obs;
        if (sc_t_obs - t_obs).abs() > 1e-9 * t_obs {
            warn!(
                "Sensitivity curve uses t_obs={:.4e} s but SNR requested for t_obs={:.4e} s; \
                 update the curve with update_sc_params to match",
                sc_t_obs, t_obs
            );
        }

        let (snr, report) = self.dispatcher().run(&self.binaries, t_obs, n_step, self.config.mode);
        self.snr = Some(snr.clone());
        self.last_report = Some(report);
        Ok(snr)
    }

    /// SNR treating the selected sources as stationary.
    pub fn get_snr_stationary(&self, t_obs: &Quantity, which: Option<&Array1<bool>>) -> Result<Array1<f64>, SourceError> {
        let t_obs = observation_time(t_obs)?;
        let b = self.subset(which)?;
        Ok(self.dispatcher().run(&b, t_obs, 2, SnrMode::Stationary).0)
    }

    /// SNR treating the selected sources as evolving.
    pub fn get_snr_evolving(
        &self,
        t_obs: &Quantity,
        n_step: usize,
        which: Option<&Array1<bool>>,
    ) -> Result<Array1<f64>, SourceError> {
        let t_obs = observation_time(t_obs)?;
        check_n_step(n_step)?;
        let b = self.subset(which)?;
        Ok(self.dispatcher().run(&b, t_obs, n_step, SnrMode::Evolving).0)
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher {
            harmonics: &self.harmonics,
            classifier: &self.classifier,
            curve: &self.curve,
            g: &self.g,
            stat_tol: self.config.stat_tol,
            n_proc: self.config.n_proc,
        }
    }

    fn subset(&self, which: Option<&Array1<bool>>) -> Result<BinaryArrays, SourceError> {
        match which {
            None => Ok(self.binaries.clone()),
            Some(mask) => {
                expect_len("which_sources", self.n_sources(), mask.len())?;
                let idx: Vec<usize> = mask
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &keep)| keep.then_some(i))
                    .collect();
                Ok(self.binaries.select(&idx))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate(params: SourceParams) -> Result<BinaryArrays, SourceError> {
    if params.f_orb.is_none() && params.a.is_none() {
        return Err(SourceError::MissingOrbit);
    }

    params.m_1.check("m_1", Dimension::Mass)?;
    params.m_2.check("m_2", Dimension::Mass)?;
    params.dist.check("dist", Dimension::Length)?;
    if let Some(f) = &params.f_orb {
        f.check("f_orb", Dimension::Frequency)?;
    }
    if let Some(a) = &params.a {
        a.check("a", Dimension::Length)?;
    }

    let n = params.m_1.len();
    expect_len("m_2", n, params.m_2.len())?;
    expect_len("ecc", n, params.ecc.len())?;
    expect_len("dist", n, params.dist.len())?;
    if let Some(f) = &params.f_orb {
        expect_len("f_orb", n, f.len())?;
    }
    if let Some(a) = &params.a {
        expect_len("a", n, a.len())?;
    }

    let m_1 = params.m_1.si();
    let m_2 = params.m_2.si();
    let (f_orb, a) = match (&params.f_orb, &params.a) {
        (Some(f), Some(a)) => (f.si(), a.si()),
        (Some(f), None) => {
            let f = f.si();
            let a = ndarray::Zip::from(&f)
                .and(&m_1)
                .and(&m_2)
                .map_collect(|&f, &m1, &m2| a_from_f_orb(f, m1, m2));
            (f, a)
        }
        (None, Some(a)) => {
            let a = a.si();
            let f = ndarray::Zip::from(&a)
                .and(&m_1)
                .and(&m_2)
                .map_collect(|&a, &m1, &m2| f_orb_from_a(a, m1, m2));
            (f, a)
        }
        (None, None) => return Err(SourceError::MissingOrbit),
    };
    let m_c = ndarray::Zip::from(&m_1).and(&m_2).map_collect(|&m1, &m2| chirp_mass(m1, m2));

    if let Some((index, &value)) = params
        .ecc
        .iter()
        .enumerate()
        .find(|(_, &e)| !(e.is_finite() && (0.0..1.0).contains(&e)))
    {
        return Err(SourceError::InvalidEccentricity { index, value });
    }

    Ok(BinaryArrays {
        m_1,
        m_2,
        m_c,
        ecc: params.ecc,
        dist: params.dist.si(),
        f_orb,
        a,
    })
}

fn expect_len(name: &'static str, expected: usize, actual: usize) -> Result<(), SourceError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SourceError::LengthMismatch {
            name,
            expected,
            actual,
        })
    }
}

fn observation_time(t_obs: &Quantity) -> Result<f64, SourceError> {
    t_obs.check("t_obs", Dimension::Time)?;
    let t = t_obs.si();
    if !(t > 0.0 && t.is_finite()) {
        return Err(SourceError::InvalidObservation(format!(
            "`t_obs` must be positive and finite, got {t} s"
        )));
    }
    Ok(t)
}

fn check_n_step(n_step: usize) -> Result<(), SourceError> {
    if n_step < 2 {
        return Err(SourceError::InvalidObservation(format!(
            "`n_step` must be at least 2, got {n_step}"
        )));
    }
    Ok(())
}
