//! Dimension-tagged quantities.
//!
//! Every physical input to a [`crate::SourceCollection`] arrives as a
//! [`Quantity`]: a value (scalar or array) together with the [`Unit`] it is
//! expressed in.  The collection converts everything to SI on the way in and
//! refuses quantities whose dimension does not match what the parameter
//! needs.  In particular a [`Unit::Dimensionless`] tag on a mass, distance
//! or frequency is treated as "units missing".

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::constants::{AU, M_SUN, PARSEC, YEAR};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Unit-tagging failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("`{name}` must have units of {expected}")]
    Missing {
        name: &'static str,
        expected: Dimension,
    },

    #[error("`{name}` must have units of {expected}, got {found}")]
    WrongDimension {
        name: &'static str,
        expected: Dimension,
        found: Dimension,
    },
}

// ---------------------------------------------------------------------------
// Dimension / Unit
// ---------------------------------------------------------------------------

/// Physical dimension of a quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Mass,
    Length,
    Frequency,
    Time,
    Dimensionless,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Mass => "mass",
            Self::Length => "length",
            Self::Frequency => "frequency",
            Self::Time => "time",
            Self::Dimensionless => "nothing (dimensionless)",
        };
        f.write_str(s)
    }
}

/// Units accepted at the public boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Kilogram,
    SolarMass,
    Metre,
    AstronomicalUnit,
    Parsec,
    Kiloparsec,
    Megaparsec,
    Hertz,
    Millihertz,
    Second,
    Year,
    Dimensionless,
}

impl Unit {
    /// Dimension this unit measures.
    pub fn dimension(self) -> Dimension {
        match self {
            Self::Kilogram | Self::SolarMass => Dimension::Mass,
            Self::Metre
            | Self::AstronomicalUnit
            | Self::Parsec
            | Self::Kiloparsec
            | Self::Megaparsec => Dimension::Length,
            Self::Hertz | Self::Millihertz => Dimension::Frequency,
            Self::Second | Self::Year => Dimension::Time,
            Self::Dimensionless => Dimension::Dimensionless,
        }
    }

    /// Multiplicative factor converting a value in this unit to SI.
    pub fn si_factor(self) -> f64 {
        match self {
            Self::Kilogram | Self::Metre | Self::Hertz | Self::Second | Self::Dimensionless => 1.0,
            Self::SolarMass => M_SUN,
            Self::AstronomicalUnit => AU,
            Self::Parsec => PARSEC,
            Self::Kiloparsec => 1e3 * PARSEC,
            Self::Megaparsec => 1e6 * PARSEC,
            Self::Millihertz => 1e-3,
            Self::Year => YEAR,
        }
    }
}

// ---------------------------------------------------------------------------
// Quantity
// ---------------------------------------------------------------------------

/// A value tagged with its unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantity<V = f64> {
    pub value: V,
    pub unit: Unit,
}

impl<V> Quantity<V> {
    pub fn new(value: V, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// An untagged value; rejected wherever a physical dimension is needed.
    pub fn untagged(value: V) -> Self {
        Self {
            value,
            unit: Unit::Dimensionless,
        }
    }

    /// Verify that this quantity measures `expected`.
    pub fn check(&self, name: &'static str, expected: Dimension) -> Result<(), UnitError> {
        let found = self.unit.dimension();
        if found == expected {
            Ok(())
        } else if found == Dimension::Dimensionless {
            Err(UnitError::Missing { name, expected })
        } else {
            Err(UnitError::WrongDimension {
                name,
                expected,
                found,
            })
        }
    }
}

impl Quantity<f64> {
    /// Value converted to SI.
    pub fn si(&self) -> f64 {
        self.value * self.unit.si_factor()
    }

    /// Observation-style durations are overwhelmingly given in years.
    pub fn years(value: f64) -> Self {
        Self::new(value, Unit::Year)
    }
}

impl Quantity<Array1<f64>> {
    pub fn from_vec(values: Vec<f64>, unit: Unit) -> Self {
        Self::new(Array1::from(values), unit)
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Values converted to SI.
    pub fn si(&self) -> Array1<f64> {
        let factor = self.unit.si_factor();
        self.value.mapv(|v| v * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solar_mass_converts_to_kilograms() {
        let m = Quantity::from_vec(vec![1.0, 10.0], Unit::SolarMass);
        let si = m.si();
        assert!((si[0] - M_SUN).abs() / M_SUN < 1e-15);
        assert!((si[1] - 10.0 * M_SUN).abs() / M_SUN < 1e-14);
    }

    #[test]
    fn untagged_quantity_reports_missing_units() {
        let q = Quantity::untagged(Array1::from(vec![1.0]));
        let err = q.check("m_1", Dimension::Mass).unwrap_err();
        assert_eq!(
            err,
            UnitError::Missing {
                name: "m_1",
                expected: Dimension::Mass
            }
        );
        assert!(err.to_string().contains("`m_1` must have units"));
    }

    #[test]
    fn wrong_dimension_is_distinguished_from_missing() {
        let q = Quantity::new(1.0, Unit::Hertz);
        assert!(matches!(
            q.check("dist", Dimension::Length),
            Err(UnitError::WrongDimension {
                found: Dimension::Frequency,
                ..
            })
        ));
        assert!(Quantity::years(4.0).check("t_obs", Dimension::Time).is_ok());
    }
}
