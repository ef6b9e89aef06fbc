//! Circular/eccentric classification.
//!
//! A binary counts as circular while its `n = 2` harmonic alone still carries
//! at least `(1 − tol)` of the total GW luminosity.  The transition
//! eccentricity is located by scanning a fine, evenly spaced grid over low
//! eccentricities; for realistic tolerances the crossing always lies well
//! inside it.

use ndarray::Array1;

use crate::peters::{peters_f, peters_g};

/// Upper end of the eccentricity scan.
pub const TRANSITION_SCAN_MAX: f64 = 0.2;

/// Number of evenly spaced points in the scan, `0` included.
pub const TRANSITION_SCAN_POINTS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("GW luminosity tolerance must lie in (0, 1), got {0}")]
    InvalidTolerance(f64),

    #[error(
        "no circular/eccentric transition for tolerance {tol} within e <= {e_max}; \
         the n=2 harmonic never drops below the tolerance on the scanned range"
    )]
    NoTransition { tol: f64, e_max: f64 },
}

/// Eccentricity threshold for one luminosity tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EccentricityClassifier {
    gw_lum_tol: f64,
    threshold: f64,
}

impl EccentricityClassifier {
    pub fn new(gw_lum_tol: f64) -> Result<Self, TransitionError> {
        if !(gw_lum_tol > 0.0 && gw_lum_tol < 1.0) {
            return Err(TransitionError::InvalidTolerance(gw_lum_tol));
        }
        let threshold = find_eccentric_transition(gw_lum_tol)?;
        log::debug!("Eccentric transition at e={:.5} for tol={:.3e}", threshold, gw_lum_tol);
        Ok(Self {
            gw_lum_tol,
            threshold,
        })
    }

    pub fn gw_lum_tol(&self) -> f64 {
        self.gw_lum_tol
    }

    /// Eccentricity at or below which a binary is treated as circular.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_circular(&self, e: f64) -> bool {
        e <= self.threshold
    }

    pub fn circular_mask(&self, ecc: &Array1<f64>) -> Array1<bool> {
        ecc.mapv(|e| self.is_circular(e))
    }
}

/// Spacing of the scan grid.
pub fn scan_step() -> f64 {
    TRANSITION_SCAN_MAX / (TRANSITION_SCAN_POINTS - 1) as f64
}

/// First scanned eccentricity where `g(2, e) < (1 − tol) F(e)`.
pub fn find_eccentric_transition(gw_lum_tol: f64) -> Result<f64, TransitionError> {
    let step = scan_step();
    (0..TRANSITION_SCAN_POINTS)
        .map(|i| i as f64 * step)
        .find(|&e| peters_g(2, e) < (1.0 - gw_lum_tol) * peters_f(e))
        .ok_or(TransitionError::NoTransition {
            tol: gw_lum_tol,
            e_max: TRANSITION_SCAN_MAX,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circular_holds(e: f64, tol: f64) -> bool {
        peters_g(2, e) >= (1.0 - tol) * peters_f(e)
    }

    #[test]
    fn threshold_brackets_the_crossing() {
        for tol in [0.2, 0.05, 0.01] {
            let classifier = EccentricityClassifier::new(tol).unwrap();
            let e_t = classifier.threshold();
            assert!(e_t > 0.0 && e_t < TRANSITION_SCAN_MAX, "tol={tol}: {e_t}");
            assert!(circular_holds(e_t - scan_step(), tol));
            assert!(!circular_holds(e_t, tol));
        }
    }

    #[test]
    fn smaller_tolerance_moves_threshold_towards_zero() {
        let loose = EccentricityClassifier::new(0.1).unwrap();
        let tight = EccentricityClassifier::new(0.01).unwrap();
        assert!(tight.threshold() < loose.threshold());
    }

    #[test]
    fn mask_is_inclusive_at_threshold() {
        let classifier = EccentricityClassifier::new(0.05).unwrap();
        let t = classifier.threshold();
        let ecc = Array1::from(vec![0.0, t, t + 1e-9, 0.5]);
        assert_eq!(
            classifier.circular_mask(&ecc).to_vec(),
            vec![true, true, false, false]
        );
    }

    #[test]
    fn tolerance_of_one_never_crosses() {
        // (1 − tol) F(e) = 0 and g(2, e) ≥ 0, so the scan finds nothing.
        assert_eq!(
            find_eccentric_transition(1.0),
            Err(TransitionError::NoTransition {
                tol: 1.0,
                e_max: TRANSITION_SCAN_MAX
            })
        );
        assert!(matches!(
            EccentricityClassifier::new(-0.1),
            Err(TransitionError::InvalidTolerance(_))
        ));
    }
}
