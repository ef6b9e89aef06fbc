//! Classification and dispatch of a batch through the SNR formulas.
//!
//! ## Algorithm overview
//!
//! 1. **Stationarity** — each source's fractional frequency drift over
//!    `t_obs` is compared with `stat_tol` (skipped in forced modes).
//! 2. **Circularity** — sources with `e ≤ threshold` use the two-harmonic
//!    closed form; the rest are eccentric.
//! 3. **Harmonic buckets** — eccentric sources are grouped by the harmonic
//!    count they require into [`HARMONIC_BUCKETS`]; each bucket is evaluated
//!    once with `upper − 1` harmonics.  Empty buckets cost nothing.
//! 4. **Scatter** — every sub-result is written back at its source's
//!    original position, so each source is covered by exactly one branch.

use std::time::Instant;

use log::{debug, info, warn};
use ndarray::Array1;

use crate::eccentricity::EccentricityClassifier;
use crate::harmonics::HarmonicModel;
use crate::sensitivity::SensitivityCurve;
use crate::snr::{snr_circ_evolving, snr_circ_stationary, snr_ecc_evolving, snr_ecc_stationary, SnrContext};
use crate::stationarity::stationary_mask;
use crate::strain::GFunction;
use crate::types::{BinaryArrays, BucketReport, DispatchReport, SnrMode};

// ---------------------------------------------------------------------------
// Harmonic buckets
// ---------------------------------------------------------------------------

/// `[lower, upper)` ranges of required harmonic counts.
pub const HARMONIC_BUCKETS: [(usize, usize); 4] = [(1, 10), (10, 100), (100, 1000), (1000, 10_000)];

/// Eccentric sources sharing one harmonic cutoff.
#[derive(Clone, Debug, PartialEq)]
pub struct HarmonicBucket {
    pub lower: usize,
    pub upper: usize,
    /// Source positions in the batch.
    pub members: Vec<usize>,
}

impl HarmonicBucket {
    /// Number of harmonics summed for every member.
    pub fn cutoff(&self) -> u32 {
        (self.upper - 1) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Distribute `idx` over [`HARMONIC_BUCKETS`] by `counts` (aligned with `idx`).
///
/// All four buckets are returned, possibly empty.  Counts beyond the last
/// bucket are placed in it with a warning.
pub fn bucket_by_harmonics(idx: &[usize], counts: &[usize]) -> Vec<HarmonicBucket> {
    let mut buckets: Vec<HarmonicBucket> = HARMONIC_BUCKETS
        .iter()
        .map(|&(lower, upper)| HarmonicBucket {
            lower,
            upper,
            members: Vec::new(),
        })
        .collect();
    let last = buckets.len() - 1;

    let mut overflow = 0usize;
    for (&i, &count) in idx.iter().zip(counts) {
        let slot = match HARMONIC_BUCKETS.iter().position(|&(lo, hi)| count >= lo && count < hi) {
            Some(slot) => slot,
            None if count < HARMONIC_BUCKETS[0].0 => 0,
            None => {
                overflow += 1;
                last
            }
        };
        buckets[slot].members.push(i);
    }
    if overflow > 0 {
        warn!(
            "{} sources need at least {} harmonics; truncating them to {}",
            overflow,
            HARMONIC_BUCKETS[last].1,
            HARMONIC_BUCKETS[last].1 - 1
        );
    }
    buckets
}

/// Positions where `mask` is `true` and where it is `false`.
pub fn split_by_mask(positions: &[usize], mask: &Array1<bool>) -> (Vec<usize>, Vec<usize>) {
    positions.iter().copied().partition(|&i| mask[i])
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Read-only state needed to route a batch through the SNR formulas.
pub struct Dispatcher<'a> {
    pub harmonics: &'a HarmonicModel,
    pub classifier: &'a EccentricityClassifier,
    pub curve: &'a SensitivityCurve,
    pub g: &'a GFunction,
    pub stat_tol: f64,
    pub n_proc: usize,
}

impl<'a> Dispatcher<'a> {
    /// SNR of every source in `sources`, in input order.
    pub fn run(&self, sources: &BinaryArrays, t_obs: f64, n_step: usize, mode: SnrMode) -> (Array1<f64>, DispatchReport) {
        let start = Instant::now();
        let n = sources.len();
        info!(
            "Starting SNR dispatch: {} sources, t_obs={:.3e} s, mode={:?}",
            n, t_obs, mode
        );

        let stationary = match mode {
            SnrMode::Auto => stationary_mask(&sources.m_c, &sources.f_orb, &sources.ecc, t_obs, self.stat_tol),
            SnrMode::Stationary => Array1::from_elem(n, true),
            SnrMode::Evolving => Array1::from_elem(n, false),
        };
        let circular = self.classifier.circular_mask(&sources.ecc);
        let beyond_table = self.harmonics.count_beyond_table(&sources.ecc);
        if beyond_table > 0 {
            warn!(
                "{} sources have e > {} (harmonic table limit); their harmonic sums may fall short of the tolerance",
                beyond_table,
                self.harmonics.e_max()
            );
        }

        let all: Vec<usize> = (0..n).collect();
        let (stat_idx, evol_idx) = split_by_mask(&all, &stationary);
        let (circ_stat, ecc_stat) = split_by_mask(&stat_idx, &circular);
        let (circ_evol, ecc_evol) = split_by_mask(&evol_idx, &circular);

        let ctx = SnrContext {
            curve: self.curve,
            g: self.g,
            t_obs,
        };
        let mut snr = Array1::from_elem(n, f64::NAN);
        let mut report = DispatchReport {
            t_obs,
            total: n,
            circular_stationary: circ_stat.len(),
            eccentric_stationary: ecc_stat.len(),
            circular_evolving: circ_evol.len(),
            eccentric_evolving: ecc_evol.len(),
            beyond_table,
            ..DispatchReport::default()
        };

        if !circ_stat.is_empty() {
            debug!("circular/stationary: {} sources", circ_stat.len());
            scatter(&mut snr, &circ_stat, &snr_circ_stationary(&sources.select(&circ_stat), ctx));
        }
        if !circ_evol.is_empty() {
            debug!("circular/evolving: {} sources", circ_evol.len());
            scatter(&mut snr, &circ_evol, &snr_circ_evolving(&sources.select(&circ_evol), n_step, ctx));
        }

        for (idx, is_stationary) in [(&ecc_stat, true), (&ecc_evol, false)] {
            if idx.is_empty() {
                continue;
            }
            let counts: Vec<usize> = idx
                .iter()
                .map(|&i| self.harmonics.harmonics_required(sources.ecc[i]))
                .collect();
            for bucket in bucket_by_harmonics(idx, &counts) {
                if bucket.is_empty() {
                    continue;
                }
                debug!(
                    "eccentric/{}: {} sources with {} harmonics",
                    if is_stationary { "stationary" } else { "evolving" },
                    bucket.members.len(),
                    bucket.cutoff()
                );
                let subset = sources.select(&bucket.members);
                let values = if is_stationary {
                    snr_ecc_stationary(&subset, bucket.cutoff(), ctx)
                } else {
                    snr_ecc_evolving(&subset, bucket.cutoff(), n_step, self.n_proc, ctx)
                };
                scatter(&mut snr, &bucket.members, &values);
                report.buckets.push(BucketReport {
                    lower: bucket.lower,
                    upper: bucket.upper,
                    stationary: is_stationary,
                    sources: bucket.members.len(),
                });
            }
        }

        report.processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "SNR dispatch complete in {} ms: {} circ/stat, {} ecc/stat, {} circ/evol, {} ecc/evol",
            report.processing_time_ms,
            report.circular_stationary,
            report.eccentric_stationary,
            report.circular_evolving,
            report.eccentric_evolving,
        );
        (snr, report)
    }
}

fn scatter(out: &mut Array1<f64>, positions: &[usize], values: &Array1<f64>) {
    for (&i, &v) in positions.iter().zip(values) {
        out[i] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{M_SUN, PARSEC, YEAR};
    use crate::orbit::{a_from_f_orb, chirp_mass};
    use crate::sensitivity::SensitivityConfig;
    use crate::tables::{HarmonicGrid, HarmonicTable};

    #[test]
    fn buckets_are_lossless_and_disjoint() {
        let idx: Vec<usize> = (0..7).collect();
        let counts = [2, 9, 10, 99, 450, 1000, 12_000];
        let buckets = bucket_by_harmonics(&idx, &counts);
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0].members, vec![0, 1]);
        assert_eq!(buckets[1].members, vec![2, 3]);
        assert_eq!(buckets[2].members, vec![4]);
        assert_eq!(buckets[3].members, vec![5, 6]);

        let mut all: Vec<usize> = buckets.iter().flat_map(|b| b.members.clone()).collect();
        all.sort_unstable();
        assert_eq!(all, idx);
        assert_eq!(buckets.iter().map(|b| b.cutoff()).collect::<Vec<_>>(), vec![9, 99, 999, 9999]);
    }

    #[test]
    fn count_selects_first_bucket_whose_upper_exceeds_it() {
        for (count, upper) in [(2, 10), (9, 10), (10, 100), (999, 1000)] {
            let buckets = bucket_by_harmonics(&[0], &[count]);
            let hit: Vec<_> = buckets.iter().filter(|b| !b.is_empty()).collect();
            assert_eq!(hit.len(), 1);
            assert_eq!(hit[0].upper, upper, "count={count}");
        }
    }

    struct Fixture {
        harmonics: HarmonicModel,
        classifier: EccentricityClassifier,
        curve: SensitivityCurve,
        sources: BinaryArrays,
    }

    fn fixture() -> Fixture {
        let table = HarmonicTable::from_peters(HarmonicGrid {
            e_min: 0.0,
            e_max: 0.9,
            e_len: 20,
            n_max: 120,
        })
        .unwrap();
        let (m_1, m_2) = (10.0 * M_SUN, 10.0 * M_SUN);
        // Stationary circular, stationary eccentric, evolving circular, evolving eccentric,
        // and a slightly eccentric source below the circular threshold.
        let f_orb = vec![1e-3, 1e-3, 1e-2, 1e-2, 5e-4];
        let ecc = vec![0.0, 0.3, 0.0, 0.3, 0.05];
        let n = f_orb.len();
        Fixture {
            harmonics: HarmonicModel::build(&table, 0.05).unwrap(),
            classifier: EccentricityClassifier::new(0.05).unwrap(),
            curve: SensitivityCurve::analytic(
                SensitivityConfig {
                    approximate_response: true,
                    ..SensitivityConfig::default()
                },
                None,
            )
            .unwrap(),
            sources: BinaryArrays {
                m_1: Array1::from_elem(n, m_1),
                m_2: Array1::from_elem(n, m_2),
                m_c: Array1::from_elem(n, chirp_mass(m_1, m_2)),
                a: f_orb.iter().map(|&f| a_from_f_orb(f, m_1, m_2)).collect(),
                ecc: Array1::from(ecc),
                dist: Array1::from_elem(n, 1e3 * PARSEC),
                f_orb: Array1::from(f_orb),
            },
        }
    }

    static EXACT: GFunction = GFunction::Exact;

    fn dispatcher(fx: &Fixture) -> Dispatcher<'_> {
        Dispatcher {
            harmonics: &fx.harmonics,
            classifier: &fx.classifier,
            curve: &fx.curve,
            g: &EXACT,
            stat_tol: 1e-2,
            n_proc: 2,
        }
    }

    #[test]
    fn every_source_is_routed_exactly_once() {
        let fx = fixture();
        let (snr, report) = dispatcher(&fx).run(&fx.sources, 4.0 * YEAR, 24, SnrMode::Auto);
        assert_eq!(report.total, 5);
        assert_eq!(report.routed(), 5);
        assert_eq!(report.circular_stationary, 2);
        assert_eq!(report.eccentric_stationary, 1);
        assert_eq!(report.circular_evolving, 1);
        assert_eq!(report.eccentric_evolving, 1);
        assert!(snr.iter().all(|v| v.is_finite() && *v >= 0.0), "{snr}");
        // Only the first bucket is populated at e = 0.3.
        assert_eq!(report.buckets.len(), 2);
        assert!(report.buckets.iter().all(|b| b.upper == 10 && b.sources == 1));
    }

    #[test]
    fn batch_result_is_the_union_of_subsets() {
        let fx = fixture();
        let d = dispatcher(&fx);
        let t_obs = 4.0 * YEAR;
        let (full, _) = d.run(&fx.sources, t_obs, 24, SnrMode::Auto);

        let stationary = stationary_mask(&fx.sources.m_c, &fx.sources.f_orb, &fx.sources.ecc, t_obs, 1e-2);
        let (stat, evol) = split_by_mask(&(0..5).collect::<Vec<_>>(), &stationary);
        let (s, _) = d.run(&fx.sources.select(&stat), t_obs, 24, SnrMode::Stationary);
        let (e, _) = d.run(&fx.sources.select(&evol), t_obs, 24, SnrMode::Evolving);

        for (k, &i) in stat.iter().enumerate() {
            assert_eq!(full[i], s[k]);
        }
        for (k, &i) in evol.iter().enumerate() {
            assert_eq!(full[i], e[k]);
        }
    }

    #[test]
    fn sources_past_the_table_are_reported() {
        let fx = fixture();
        let d = dispatcher(&fx);
        let (_, report) = d.run(&fx.sources, YEAR, 8, SnrMode::Stationary);
        assert_eq!(report.beyond_table, 0);

        let mut sources = fx.sources.select(&[1, 3]);
        sources.ecc[1] = 0.95;
        let (snr, report) = d.run(&sources, YEAR, 8, SnrMode::Stationary);
        assert_eq!(report.beyond_table, 1);
        assert_eq!(report.eccentric_stationary, 2);
        assert!(snr.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn forced_modes_route_whole_batch() {
        let fx = fixture();
        let d = dispatcher(&fx);
        let (_, stat) = d.run(&fx.sources, YEAR, 24, SnrMode::Stationary);
        assert_eq!(stat.circular_evolving + stat.eccentric_evolving, 0);
        let (_, evol) = d.run(&fx.sources, YEAR, 24, SnrMode::Evolving);
        assert_eq!(evol.circular_stationary + evol.eccentric_stationary, 0);
        assert!(evol.buckets.iter().all(|b| !b.stationary));
    }
}
