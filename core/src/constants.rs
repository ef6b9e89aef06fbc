//! Physical constants in SI units.
//!
//! Values follow CODATA 2018 / IAU 2015 nominal values, which is what the
//! astronomy community uses for population-synthesis catalogues.

/// Newtonian gravitational constant, m³ kg⁻¹ s⁻².
pub const G: f64 = 6.674_30e-11;

/// Speed of light in vacuum, m s⁻¹.
pub const C: f64 = 299_792_458.0;

/// Nominal solar mass, kg.
pub const M_SUN: f64 = 1.988_409_870_698_051e30;

/// Astronomical unit, m.
pub const AU: f64 = 1.495_978_707e11;

/// Parsec, m.
pub const PARSEC: f64 = 3.085_677_581_491_367e16;

/// Julian year, s.
pub const YEAR: f64 = 365.25 * 86_400.0;

/// Noise value returned for frequencies outside the sensitivity curve.
///
/// Large enough that any source at such a frequency contributes nothing to
/// the SNR.
pub const NOISE_CEILING: f64 = 1e30;
