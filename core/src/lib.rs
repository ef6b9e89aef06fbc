//! # lisasnr-core
//!
//! Detectability of compact-binary gravitational-wave sources for
//! space-based, LISA-like detectors, with optional Python bindings via
//! [PyO3](https://pyo3.rs).
//!
//! ## Overview
//!
//! Each binary in a batch is classified as circular or eccentric and as
//! stationary or evolving, then routed through the matching SNR formula:
//!
//! | Module           | Purpose                                                   |
//! |------------------|-----------------------------------------------------------|
//! | [`source`]       | Source batches and their public operations                |
//! | [`dispatch`]     | Four-way classification, harmonic buckets, scatter        |
//! | [`harmonics`]    | Harmonics needed for a luminosity tolerance               |
//! | [`eccentricity`] | Circular/eccentric threshold                              |
//! | [`stationarity`] | Stationary/evolving predicate                             |
//! | [`snr`]          | SNR formulas for the four branches                        |
//! | [`strain`]       | Per-harmonic strain and characteristic strain             |
//! | [`sensitivity`]  | Detector noise PSD and galactic confusion foreground      |
//! | [`tables`]       | Precomputed `g(n, e)` tables and their providers          |
//! | [`orbit`]        | Kepler relations and GW-driven inspiral                   |
//! | [`peters`]       | Bessel functions and the Peters `g(n, e)`, `F(e)`         |
//! | [`interp`]       | 1-D linear interpolation                                  |
//! | [`units`]        | Unit-tagged quantities                                    |
//! | [`types`]        | Shared data structures (selectors, modes, reports)        |
//!
//! ## Python usage
//!
//! Built with the `python` feature, the library exposes a module called
//! `lisasnr_core`:
//!
//! ```python
//! import lisasnr_core
//!
//! source = lisasnr_core.Source(m_1=[10.0], m_2=[10.0], ecc=[0.9],
//!                              dist=[1.0], f_orb=[1e-3])
//! print(source.get_snr(t_obs=4.0))
//! print(source.last_report())
//! ```

pub mod constants;
pub mod dispatch;
pub mod eccentricity;
pub mod harmonics;
pub mod interp;
pub mod orbit;
pub mod peters;
pub mod sensitivity;
pub mod snr;
pub mod source;
pub mod stationarity;
pub mod strain;
pub mod tables;
pub mod types;
pub mod units;

#[cfg(feature = "python")]
mod python;

// Re-export the most commonly used items at crate root for convenience.
pub use dispatch::{bucket_by_harmonics, Dispatcher, HarmonicBucket, HARMONIC_BUCKETS};
pub use eccentricity::{EccentricityClassifier, TransitionError};
pub use harmonics::{HarmonicError, HarmonicModel};
pub use sensitivity::{SensitivityConfig, SensitivityCurve, SensitivityError};
pub use source::{SourceCollection, SourceConfig, SourceError, SourceParams};
pub use strain::GFunction;
pub use tables::{FineGrid, HarmonicGrid, HarmonicTableProvider, JsonTableReader, PetersTables, TableError};
pub use types::{BinaryArrays, DispatchReport, SnrMode, TriState};
pub use units::{Quantity, Unit, UnitError};
