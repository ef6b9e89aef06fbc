//! Leading-order strain of a (possibly eccentric) binary, per harmonic.
//!
//! ```text
//!   h_0,n = sqrt(2^{28/3} / 5) · (G m_c)^{5/3} / (c⁴ D) · (π f_orb)^{2/3} · sqrt(g(n,e)) / n
//!   h_c,n² = h_0,n² · f_n² / ḟ_n,         f_n = n f_orb
//! ```
//!
//! `h_0,n` is the sky-, inclination- and polarisation-averaged amplitude of
//! harmonic `n`; `h_c,n` is the characteristic strain accumulated while the
//! harmonic sweeps through frequency.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{Array1, Array2};

use crate::constants::{C, G};
use crate::orbit::fn_dot;
use crate::peters::peters_g;
use crate::tables::FineGTable;

/// How `g(n, e)` is evaluated during strain calculations.
#[derive(Clone, Debug)]
pub enum GFunction {
    /// Bessel-series evaluation on every call.
    Exact,
    /// Fine precomputed grid; harmonics beyond it fall back to [`GFunction::Exact`].
    Interpolated(Arc<FineGTable>),
}

impl GFunction {
    pub fn eval(&self, n: u32, e: f64) -> f64 {
        match self {
            Self::Exact => peters_g(n, e),
            Self::Interpolated(table) => table.lookup(n, e).unwrap_or_else(|| peters_g(n, e)),
        }
    }
}

/// Strain amplitude of harmonic `n` (SI inputs, dimensionless output).
pub fn h_0_n(m_c: f64, f_orb: f64, ecc: f64, n: u32, dist: f64, g: &GFunction) -> f64 {
    let prefac = (2f64.powf(28.0 / 3.0) / 5.0).sqrt() * G.powf(5.0 / 3.0) / C.powi(4);
    let n_dep = g.eval(n, ecc).max(0.0).sqrt() / n as f64;
    prefac * m_c.powf(5.0 / 3.0) / dist * (PI * f_orb).powf(2.0 / 3.0) * n_dep
}

/// Characteristic strain of harmonic `n` (SI inputs, dimensionless output).
pub fn h_c_n(m_c: f64, f_orb: f64, ecc: f64, n: u32, dist: f64, g: &GFunction) -> f64 {
    let h_0 = h_0_n(m_c, f_orb, ecc, n, dist, g);
    let f_n = n as f64 * f_orb;
    h_0 * f_n / fn_dot(m_c, f_orb, ecc, n).sqrt()
}

/// Evaluate `strain` for every (source, harmonic) pair.
///
/// Returns shape `(sources, harmonics)`.
pub fn strain_grid<F>(
    m_c: &Array1<f64>,
    f_orb: &Array1<f64>,
    ecc: &Array1<f64>,
    dist: &Array1<f64>,
    harmonics: &[u32],
    strain: F,
) -> Array2<f64>
where
    F: Fn(f64, f64, f64, u32, f64) -> f64,
{
    Array2::from_shape_fn((m_c.len(), harmonics.len()), |(i, k)| {
        strain(m_c[i], f_orb[i], ecc[i], harmonics[k], dist[i])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{M_SUN, PARSEC};
    use crate::orbit::chirp_mass;
    use crate::tables::FineGrid;

    #[test]
    fn circular_amplitude_matches_quadrupole_formula() {
        // Inclination-averaged h_0 = 8/√5 (G M_c)^{5/3} (π f_gw)^{2/3} / (c⁴ D) for n = 2.
        let m_c = chirp_mass(10.0 * M_SUN, 10.0 * M_SUN);
        let (f_orb, dist) = (1e-3, 1e3 * PARSEC);
        let expected = 8.0 / 5f64.sqrt() * (G * m_c).powf(5.0 / 3.0) * (PI * 2.0 * f_orb).powf(2.0 / 3.0)
            / (C.powi(4) * dist);
        let h = h_0_n(m_c, f_orb, 0.0, 2, dist, &GFunction::Exact);
        assert!((h - expected).abs() / expected < 1e-12, "{h} vs {expected}");
        assert_eq!(h_0_n(m_c, f_orb, 0.0, 3, dist, &GFunction::Exact), 0.0);
    }

    #[test]
    fn strain_falls_off_with_distance() {
        let m_c = chirp_mass(1.0 * M_SUN, 0.5 * M_SUN);
        let near = h_0_n(m_c, 2e-3, 0.3, 3, 1e3 * PARSEC, &GFunction::Exact);
        let far = h_0_n(m_c, 2e-3, 0.3, 3, 2e3 * PARSEC, &GFunction::Exact);
        assert!((near / far - 2.0).abs() < 1e-12);
    }

    #[test]
    fn characteristic_strain_counts_cycles() {
        let m_c = chirp_mass(10.0 * M_SUN, 10.0 * M_SUN);
        let (f_orb, dist) = (1e-3, 1e3 * PARSEC);
        let h_0 = h_0_n(m_c, f_orb, 0.0, 2, dist, &GFunction::Exact);
        let h_c = h_c_n(m_c, f_orb, 0.0, 2, dist, &GFunction::Exact);
        let cycles = (2.0 * f_orb).powi(2) / fn_dot(m_c, f_orb, 0.0, 2);
        assert!((h_c * h_c / (h_0 * h_0) - cycles).abs() / cycles < 1e-12);
    }

    #[test]
    fn interpolated_g_agrees_with_exact() {
        let table = Arc::new(FineGTable::from_peters(FineGrid { n_max: 20, e_len: 501 }).unwrap());
        let interp = GFunction::Interpolated(table);
        for (n, e) in [(2, 0.1), (5, 0.4), (12, 0.6)] {
            let exact = peters_g(n, e);
            assert!((interp.eval(n, e) - exact).abs() / exact < 1e-3, "n={n} e={e}");
        }
        // Beyond the grid the exact formula takes over.
        assert_eq!(interp.eval(40, 0.6), peters_g(40, 0.6));
    }

    #[test]
    fn strain_grid_has_source_by_harmonic_shape() {
        let m_c = Array1::from(vec![1e31, 2e31]);
        let f = Array1::from(vec![1e-3, 2e-3]);
        let e = Array1::from(vec![0.0, 0.5]);
        let d = Array1::from(vec![1e20, 1e20]);
        let grid = strain_grid(&m_c, &f, &e, &d, &[1, 2, 3], |m, fo, ec, n, di| {
            h_0_n(m, fo, ec, n, di, &GFunction::Exact)
        });
        assert_eq!(grid.dim(), (2, 3));
        assert_eq!(grid[[0, 0]], 0.0);
        assert!(grid[[1, 0]] > 0.0);
    }
}
