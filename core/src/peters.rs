//! Peters & Mathews (1963) harmonic-luminosity functions.
//!
//! An eccentric binary radiates at every integer multiple `n` of its orbital
//! frequency.  The fraction of the circular-orbit luminosity carried by
//! harmonic `n` is `g(n, e)`, and the total enhancement over a circular orbit
//! is `F(e) = Σₙ g(n, e)`.
//!
//! `g(n, e)` needs Bessel functions of the first kind `J_{n±2}(n e)`; they are
//! evaluated with Miller's backward recurrence, which is stable for every
//! order below the starting index and gives all orders `0..=n+2` in one pass.

/// Rescale threshold for the backward recurrence.
const RECUR_BIG: f64 = 1e100;
const RECUR_SMALL: f64 = 1e-100;

/// Below this argument the two-term power series is exact to f64 precision.
const SMALL_ARGUMENT: f64 = 1e-12;

/// Bessel functions `J_0(x) ..= J_order(x)`.
pub fn bessel_j_upto(order: usize, x: f64) -> Vec<f64> {
    let mut out = vec![0.0; order + 1];
    if x == 0.0 {
        out[0] = 1.0;
        return out;
    }

    let x_abs = x.abs();
    if x_abs < SMALL_ARGUMENT {
        // Leading series term; the recurrence would overflow here.
        let half = 0.5 * x_abs;
        out[0] = 1.0 - half * half;
        let mut term = 1.0;
        for (k, v) in out.iter_mut().enumerate().skip(1) {
            term *= half / k as f64;
            *v = term;
        }
    } else {
        backward_recurrence(&mut out, x_abs);
    }

    if x < 0.0 {
        // J_k(-x) = (-1)^k J_k(x)
        out.iter_mut()
            .enumerate()
            .filter(|(k, _)| k % 2 == 1)
            .for_each(|(_, v)| *v = -*v);
    }
    out
}

fn backward_recurrence(out: &mut [f64], x_abs: f64) {
    let order = out.len() - 1;
    let top = order.max(x_abs.ceil() as usize);
    // Even start index comfortably above both the order and the argument.
    let mut start = top + 16 + (40.0 * top as f64).sqrt() as usize;
    start += start % 2;

    let mut j_above = 0.0; // J_{k+1}
    let mut j_here = 1.0; // J_k, arbitrary seed at k = start
    let mut even_sum = j_here;
    for k in (1..=start).rev() {
        let j_below = 2.0 * k as f64 / x_abs * j_here - j_above;
        j_above = j_here;
        j_here = j_below;

        if j_here.abs() > RECUR_BIG {
            j_here *= RECUR_SMALL;
            j_above *= RECUR_SMALL;
            even_sum *= RECUR_SMALL;
            out.iter_mut().for_each(|v| *v *= RECUR_SMALL);
        }

        let idx = k - 1;
        if idx > 0 && idx % 2 == 0 {
            even_sum += j_here;
        }
        if idx <= order {
            out[idx] = j_here;
        }
    }

    // Normalisation identity: 1 = J_0 + 2 Σ_{k≥1} J_{2k}.
    let norm = j_here + 2.0 * even_sum;
    out.iter_mut().for_each(|v| *v /= norm);
}

/// Relative GW power radiated into harmonic `n` at eccentricity `e`.
///
/// `g(2, 0) = 1` and `g(n, 0) = 0` for every other `n`.
pub fn peters_g(n: u32, e: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    let ni = n as i64;
    let j = bessel_j_upto(n as usize + 2, nf * e);
    let jk = |k: i64| -> f64 {
        if k >= 0 {
            j[k as usize]
        } else {
            let v = j[(-k) as usize];
            if k % 2 == 0 {
                v
            } else {
                -v
            }
        }
    };

    let (jm2, jm1, j0, jp1, jp2) = (jk(ni - 2), jk(ni - 1), jk(ni), jk(ni + 1), jk(ni + 2));
    let a = jm2 - 2.0 * e * jm1 + 2.0 / nf * j0 + 2.0 * e * jp1 - jp2;
    let b = jm2 - 2.0 * j0 + jp2;

    nf.powi(4) / 32.0 * (a * a + (1.0 - e * e) * b * b + 4.0 / (3.0 * nf * nf) * j0 * j0)
}

/// Total GW luminosity enhancement of an eccentric orbit over a circular one.
pub fn peters_f(e: f64) -> f64 {
    let e2 = e * e;
    (1.0 + 73.0 / 24.0 * e2 + 37.0 / 96.0 * e2 * e2) / (1.0 - e2).powf(3.5)
}
