//! Common types shared across the detectability pipeline.
//!
//! These structures describe a batch of binaries in SI units, the selectors
//! used to slice a batch by classification, and the summary produced by
//! every SNR dispatch.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BinaryArrays
// ---------------------------------------------------------------------------

/// Per-source parameters of a batch, all in SI units and of equal length.
///
/// This is the view the strain and SNR formulas work on.  Subsets are taken
/// with [`BinaryArrays::select`] so that every formula sees only the sources
/// routed to it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BinaryArrays {
    /// Primary mass, kg.
    pub m_1: Array1<f64>,

    /// Secondary mass, kg.
    pub m_2: Array1<f64>,

    /// Chirp mass, kg.
    pub m_c: Array1<f64>,

    /// Initial eccentricity.
    pub ecc: Array1<f64>,

    /// Luminosity distance, m.
    pub dist: Array1<f64>,

    /// Initial orbital frequency, Hz.
    pub f_orb: Array1<f64>,

    /// Initial semi-major axis, m.
    pub a: Array1<f64>,
}

impl BinaryArrays {
    pub fn len(&self) -> usize {
        self.m_1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.m_1.is_empty()
    }

    /// Sources at positions `idx`, in that order.
    pub fn select(&self, idx: &[usize]) -> Self {
        let pick = |arr: &Array1<f64>| idx.iter().map(|&i| arr[i]).collect::<Array1<f64>>();
        Self {
            m_1: pick(&self.m_1),
            m_2: pick(&self.m_2),
            m_c: pick(&self.m_c),
            ecc: pick(&self.ecc),
            dist: pick(&self.dist),
            f_orb: pick(&self.f_orb),
            a: pick(&self.a),
        }
    }
}

// ---------------------------------------------------------------------------
// TriState
// ---------------------------------------------------------------------------

/// Three-valued classification filter: include sources that are in the
/// class, not in it, or either.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriState {
    #[default]
    Either,
    Yes,
    No,
}

impl TriState {
    /// Parse a selector string as accepted by the mask query.
    ///
    /// Accepts `true`/`false`/`both` (case-insensitive) and the aliases
    /// `yes`/`no`/`either`; `param` names the argument in the error.
    pub fn parse(param: &'static str, value: &str) -> Result<Self, InvalidSelection> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Ok(Self::Yes),
            "false" | "no" => Ok(Self::No),
            "both" | "either" | "none" => Ok(Self::Either),
            _ => Err(InvalidSelection {
                param,
                value: value.to_string(),
            }),
        }
    }

    /// Whether a source with classification `flag` passes this filter.
    pub fn admits(self, flag: bool) -> bool {
        match self {
            Self::Either => true,
            Self::Yes => flag,
            Self::No => !flag,
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::Either,
            Some(true) => Self::Yes,
            Some(false) => Self::No,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        Some(value).into()
    }
}

/// A selector string that is not a recognised [`TriState`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{param}` must be true, false or both, got {value:?}")]
pub struct InvalidSelection {
    pub param: &'static str,
    pub value: String,
}

// ---------------------------------------------------------------------------
// SnrMode
// ---------------------------------------------------------------------------

/// Which SNR path a collection takes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnrMode {
    /// Classify every source as stationary or evolving.
    #[default]
    Auto,
    /// Treat every source as stationary.
    Stationary,
    /// Treat every source as evolving.
    Evolving,
}

// ---------------------------------------------------------------------------
// DispatchReport
// ---------------------------------------------------------------------------

/// Membership of one harmonic bucket in a dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketReport {
    /// Lower bound on the required harmonic count (inclusive).
    pub lower: usize,

    /// Upper bound (exclusive); the bucket is evaluated with `upper - 1`
    /// harmonics.
    pub upper: usize,

    /// Whether the bucket holds stationary or evolving sources.
    pub stationary: bool,

    /// Number of sources evaluated in this bucket.
    pub sources: usize,
}

/// Summary of one SNR dispatch over a collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Observation time used, seconds.
    pub t_obs: f64,

    /// Total number of sources.
    pub total: usize,

    pub circular_stationary: usize,
    pub eccentric_stationary: usize,
    pub circular_evolving: usize,
    pub eccentric_evolving: usize,

    /// Sources more eccentric than the harmonic table reaches; their
    /// harmonic count is clamped to the table's last row.
    pub beyond_table: usize,

    /// Non-empty eccentric buckets, stationary first.
    pub buckets: Vec<BucketReport>,

    /// Wall-clock time of the dispatch in milliseconds.
    pub processing_time_ms: u64,
}

impl DispatchReport {
    /// Sources covered by one of the four branches.
    pub fn routed(&self) -> usize {
        self.circular_stationary + self.eccentric_stationary + self.circular_evolving + self.eccentric_evolving
    }

    /// Serialize to a pretty-printed JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tristate_parses_selector_strings() {
        assert_eq!(TriState::parse("circular", "True").unwrap(), TriState::Yes);
        assert_eq!(TriState::parse("circular", "false").unwrap(), TriState::No);
        assert_eq!(TriState::parse("circular", " both ").unwrap(), TriState::Either);
        let err = TriState::parse("stationary", "maybe").unwrap_err();
        assert_eq!(err.param, "stationary");
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn tristate_admits_matching_flags() {
        assert!(TriState::Either.admits(true) && TriState::Either.admits(false));
        assert!(TriState::Yes.admits(true) && !TriState::Yes.admits(false));
        assert!(TriState::No.admits(false) && !TriState::No.admits(true));
        assert_eq!(TriState::from(None), TriState::Either);
        assert_eq!(TriState::from(false), TriState::No);
    }

    #[test]
    fn select_keeps_requested_order() {
        let b = BinaryArrays {
            m_1: Array1::from(vec![1.0, 2.0, 3.0]),
            m_2: Array1::from(vec![4.0, 5.0, 6.0]),
            m_c: Array1::zeros(3),
            ecc: Array1::from(vec![0.0, 0.1, 0.2]),
            dist: Array1::ones(3),
            f_orb: Array1::ones(3),
            a: Array1::ones(3),
        };
        let sub = b.select(&[2, 0]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.m_1.to_vec(), vec![3.0, 1.0]);
        assert_eq!(sub.ecc.to_vec(), vec![0.2, 0.0]);
        assert!(b.select(&[]).is_empty());
    }

    #[test]
    fn report_serialises_to_json() {
        let report = DispatchReport {
            t_obs: 1.0,
            total: 3,
            circular_stationary: 2,
            eccentric_evolving: 1,
            buckets: vec![BucketReport {
                lower: 1,
                upper: 10,
                stationary: false,
                sources: 1,
            }],
            ..DispatchReport::default()
        };
        assert_eq!(report.routed(), 3);
        let json = report.to_json().unwrap();
        let back: DispatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
