//! Signal-to-noise ratio formulas.
//!
//! Four closed-form or integrated expressions, one per classification branch:
//!
//! | Branch               | SNR²                                              |
//! |----------------------|---------------------------------------------------|
//! | circular stationary  | `h_0,2² t_obs / S_n(2 f_orb)`                     |
//! | eccentric stationary | `Σ_n h_0,n² t_obs / S_n(n f_orb)`                 |
//! | circular evolving    | `∫ h_c,2² / (f_2² S_n(f_2)) df_2`                 |
//! | eccentric evolving   | `Σ_n ∫ h_c,n² / (f_n² S_n(f_n)) df_n`             |
//!
//! Evolving sources are advanced over `t_evol = min(t_merge − 1 s, t_obs)` on
//! `n_step` uniform time samples; the integrals use the trapezoidal rule on
//! the (non-uniform) frequency samples.

use ndarray::Array1;
use rayon::prelude::*;

use crate::orbit::{evolution_time, evolve_circular, evolve_eccentric, t_merge_circ, t_merge_ecc, EvolutionTrack};
use crate::sensitivity::SensitivityCurve;
use crate::strain::{h_0_n, h_c_n, GFunction};
use crate::types::BinaryArrays;

/// Shared inputs of every SNR formula.
#[derive(Clone, Copy)]
pub struct SnrContext<'a> {
    pub curve: &'a SensitivityCurve,
    pub g: &'a GFunction,
    /// Observation time, seconds.
    pub t_obs: f64,
}

// ---------------------------------------------------------------------------
// Stationary
// ---------------------------------------------------------------------------

/// SNR of circular, stationary sources from the `n = 2` harmonic.
pub fn snr_circ_stationary(b: &BinaryArrays, ctx: SnrContext<'_>) -> Array1<f64> {
    (0..b.len())
        .map(|i| {
            let h_0 = h_0_n(b.m_c[i], b.f_orb[i], 0.0, 2, b.dist[i], ctx.g);
            h_0 * (ctx.t_obs / ctx.curve.eval(2.0 * b.f_orb[i])).sqrt()
        })
        .collect()
}

/// SNR of eccentric, stationary sources summed over harmonics `1..=n_harmonics`.
pub fn snr_ecc_stationary(b: &BinaryArrays, n_harmonics: u32, ctx: SnrContext<'_>) -> Array1<f64> {
    (0..b.len())
        .map(|i| {
            let rho2: f64 = (1..=n_harmonics)
                .map(|n| {
                    let h_0 = h_0_n(b.m_c[i], b.f_orb[i], b.ecc[i], n, b.dist[i], ctx.g);
                    h_0 * h_0 * ctx.t_obs / ctx.curve.eval(n as f64 * b.f_orb[i])
                })
                .sum();
            rho2.sqrt()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Evolving
// ---------------------------------------------------------------------------

/// SNR of circular sources whose frequency drifts during the observation.
pub fn snr_circ_evolving(b: &BinaryArrays, n_step: usize, ctx: SnrContext<'_>) -> Array1<f64> {
    (0..b.len())
        .map(|i| {
            let t_merge = t_merge_circ(b.m_1[i], b.m_2[i], b.a[i]);
            let t_evol = evolution_time(t_merge, ctx.t_obs);
            let track = evolve_circular(b.m_1[i], b.m_2[i], b.f_orb[i], t_evol, n_step);
            harmonic_integral(b.m_c[i], b.dist[i], &track, 2, ctx)
        })
        .map(f64::sqrt)
        .collect()
}

/// SNR of eccentric, evolving sources summed over harmonics `1..=n_harmonics`.
///
/// The batch is cut into `n_proc` contiguous slices evaluated on a dedicated
/// rayon pool; results are reassembled in source order.
pub fn snr_ecc_evolving(
    b: &BinaryArrays,
    n_harmonics: u32,
    n_step: usize,
    n_proc: usize,
    ctx: SnrContext<'_>,
) -> Array1<f64> {
    let one = |i: usize| {
        let t_merge = t_merge_ecc(b.m_1[i], b.m_2[i], b.a[i], b.ecc[i]);
        let t_evol = evolution_time(t_merge, ctx.t_obs);
        let track = evolve_eccentric(b.m_1[i], b.m_2[i], b.f_orb[i], b.ecc[i], t_evol, n_step);
        let rho2: f64 = (1..=n_harmonics)
            .map(|n| harmonic_integral(b.m_c[i], b.dist[i], &track, n, ctx))
            .sum();
        rho2.sqrt()
    };

    let slices = split_contiguous(b.len(), n_proc);
    if slices.len() <= 1 {
        return (0..b.len()).map(one).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(slices.len()).build();
    let parts: Vec<Vec<f64>> = match pool {
        Ok(pool) => pool.install(|| {
            slices
                .par_iter()
                .map(|range| range.clone().map(one).collect())
                .collect()
        }),
        Err(err) => {
            log::warn!("Could not start {} SNR workers ({}); running serially", slices.len(), err);
            slices.iter().map(|range| range.clone().map(one).collect()).collect()
        }
    };
    parts.into_iter().flatten().collect()
}

/// `∫ h_c,n² / (f_n² S_n(f_n)) df_n` along `track`.
fn harmonic_integral(m_c: f64, dist: f64, track: &EvolutionTrack, n: u32, ctx: SnrContext<'_>) -> f64 {
    let f_n: Vec<f64> = track.f_orb.iter().map(|&f| n as f64 * f).collect();
    let integrand: Vec<f64> = track
        .f_orb
        .iter()
        .zip(&track.ecc)
        .zip(&f_n)
        .map(|((&f_orb, &e), &fn_)| {
            let h_c = h_c_n(m_c, f_orb, e, n, dist, ctx.g);
            let y = h_c * h_c / (fn_ * fn_ * ctx.curve.eval(fn_));
            if y.is_finite() {
                y
            } else {
                0.0
            }
        })
        .collect();
    trapezoid(&integrand, &f_n)
}

/// Trapezoidal rule over samples `(x, y)`.
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| 0.5 * (xw[1] - xw[0]) * (yw[0] + yw[1]))
        .sum()
}

/// Split `0..len` into at most `parts` contiguous, non-empty ranges.
pub fn split_contiguous(len: usize, parts: usize) -> Vec<std::ops::Range<usize>> {
    let parts = parts.clamp(1, len.max(1));
    let (base, extra) = (len / parts, len % parts);
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for k in 0..parts {
        let end = start + base + usize::from(k < extra);
        if end > start {
            ranges.push(start..end);
        }
        start = end;
    }
    ranges
}
