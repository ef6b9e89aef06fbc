//! Stationary/evolving classification.
//!
//! GW emission shrinks the orbit, so the orbital frequency drifts upwards at
//! `ḟ_orb ∝ m_c^{5/3} f^{11/3} F(e)`.  Over an observation of length `t_obs`
//! a source is *stationary* when the fractional drift `ḟ_orb t_obs / f_orb`
//! stays below `stat_tol`; otherwise its frequency evolution has to be
//! integrated.

use ndarray::{Array1, Zip};

use crate::orbit::fn_dot;

/// Default fractional-drift tolerance.
pub const DEFAULT_STAT_TOL: f64 = 1e-2;

/// Fractional orbital-frequency change over `t_obs` (SI inputs).
pub fn fractional_drift(m_c: f64, f_orb_i: f64, ecc_i: f64, t_obs: f64) -> f64 {
    fn_dot(m_c, f_orb_i, ecc_i, 1) * t_obs / f_orb_i
}

/// Whether a single source is stationary over `t_obs`.
pub fn is_stationary(m_c: f64, f_orb_i: f64, ecc_i: f64, t_obs: f64, stat_tol: f64) -> bool {
    fractional_drift(m_c, f_orb_i, ecc_i, t_obs) < stat_tol
}

/// Elementwise [`is_stationary`] over a batch.
pub fn stationary_mask(
    m_c: &Array1<f64>,
    f_orb_i: &Array1<f64>,
    ecc_i: &Array1<f64>,
    t_obs: f64,
    stat_tol: f64,
) -> Array1<bool> {
    Zip::from(m_c)
        .and(f_orb_i)
        .and(ecc_i)
        .map_collect(|&m, &f, &e| is_stationary(m, f, e, t_obs, stat_tol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{M_SUN, YEAR};
    use crate::orbit::chirp_mass;

    fn m_c() -> f64 {
        chirp_mass(10.0 * M_SUN, 10.0 * M_SUN)
    }

    #[test]
    fn millihertz_circular_binary_is_stationary() {
        let drift = fractional_drift(m_c(), 1e-3, 0.0, 4.0 * YEAR);
        assert!(drift > 0.0 && drift < 1e-3, "drift = {drift}");
        assert!(is_stationary(m_c(), 1e-3, 0.0, 4.0 * YEAR, DEFAULT_STAT_TOL));
    }

    #[test]
    fn eccentricity_speeds_up_the_drift() {
        let circ = fractional_drift(m_c(), 1e-3, 0.0, 4.0 * YEAR);
        let ecc = fractional_drift(m_c(), 1e-3, 0.9, 4.0 * YEAR);
        assert!(ecc > 100.0 * circ);
        assert!(!is_stationary(m_c(), 1e-3, 0.9, 4.0 * YEAR, DEFAULT_STAT_TOL));
    }

    #[test]
    fn mask_is_elementwise() {
        let m = Array1::from(vec![m_c(); 3]);
        let f = Array1::from(vec![1e-4, 1e-3, 1e-2]);
        let e = Array1::from(vec![0.0; 3]);
        let mask = stationary_mask(&m, &f, &e, 4.0 * YEAR, DEFAULT_STAT_TOL);
        // Drift grows as f^{8/3}: 10 mHz is well into the evolving regime.
        assert_eq!(mask.to_vec(), vec![true, true, false]);
    }

    #[test]
    fn longer_observations_are_less_stationary() {
        let short = fractional_drift(m_c(), 3e-3, 0.1, 1.0 * YEAR);
        let long = fractional_drift(m_c(), 3e-3, 0.1, 4.0 * YEAR);
        assert!((long / short - 4.0).abs() < 1e-12);
    }
}
