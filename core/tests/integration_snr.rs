//! Integration tests: source collections end to end.
//!
//! Exercises the public batch API: construction, classification masks,
//! harmonic truncation and SNR dispatch over mixed batches.

use std::sync::Arc;

use lisasnr_core::constants::YEAR;
use lisasnr_core::{
    FineGrid, HarmonicGrid, HarmonicTableProvider, PetersTables, Quantity, SensitivityConfig, SnrMode,
    SourceCollection, SourceConfig, SourceParams, TriState, Unit,
};
use ndarray::Array1;

fn provider() -> Arc<dyn HarmonicTableProvider> {
    Arc::new(PetersTables::new(
        HarmonicGrid {
            e_min: 0.0,
            e_max: 0.95,
            e_len: 40,
            n_max: 400,
        },
        FineGrid { n_max: 50, e_len: 400 },
    ))
}

fn config() -> SourceConfig {
    SourceConfig {
        sc_params: SensitivityConfig {
            approximate_response: true,
            ..SensitivityConfig::default()
        },
        n_proc: 2,
        ..SourceConfig::default()
    }
}

fn batch(ecc: &[f64], f_orb_hz: &[f64], dist_kpc: &[f64]) -> SourceParams {
    let n = ecc.len();
    SourceParams {
        m_1: Quantity::from_vec(vec![10.0; n], Unit::SolarMass),
        m_2: Quantity::from_vec(vec![10.0; n], Unit::SolarMass),
        ecc: Array1::from(ecc.to_vec()),
        dist: Quantity::from_vec(dist_kpc.to_vec(), Unit::Kiloparsec),
        f_orb: Some(Quantity::from_vec(f_orb_hz.to_vec(), Unit::Hertz)),
        a: None,
    }
}

#[test]
fn circular_millihertz_binary_is_circular_and_stationary() {
    let mut sources = SourceCollection::new(batch(&[0.0], &[1e-3], &[1.0]), config(), provider()).unwrap();
    let t_obs = Quantity::years(4.0);
    let mask = sources.get_source_mask(TriState::Yes, TriState::Yes, &t_obs).unwrap();
    assert_eq!(mask.to_vec(), vec![true]);

    let snr = sources.get_snr(&t_obs, 100).unwrap();
    assert!(snr[0].is_finite() && snr[0] > 0.0);
    let report = sources.last_report().unwrap();
    assert_eq!(report.circular_stationary, 1);
    assert_eq!(report.routed(), 1);
}

#[test]
fn highly_eccentric_binary_is_summed_over_many_harmonics() {
    let mut sources = SourceCollection::new(batch(&[0.9], &[1e-3], &[1.0]), config(), provider()).unwrap();
    let t_obs = Quantity::years(4.0);
    assert_eq!(
        sources.get_source_mask(TriState::No, TriState::Either, &t_obs).unwrap().to_vec(),
        vec![true]
    );
    let n = sources.harmonics_required()[0];
    assert!(n > 10, "e = 0.9 needs many harmonics, got {n}");
    assert!(sources.dominant_harmonic()[0] > 2);

    let snr = sources.get_snr(&t_obs, 16).unwrap();
    assert!(snr[0].is_finite() && snr[0] > 0.0);
    let report = sources.last_report().unwrap();
    assert_eq!(report.buckets.len(), 1);
    assert!(report.buckets[0].lower <= n && n < report.buckets[0].upper);
}

#[test]
fn sources_beyond_the_harmonic_table_are_flagged_in_the_report() {
    let mut sources =
        SourceCollection::stationary(batch(&[0.5, 0.97], &[1e-5, 1e-5], &[1.0, 1.0]), config(), provider()).unwrap();
    assert_eq!(sources.harmonic_model().e_max(), 0.95);
    let snr = sources.get_snr(&Quantity::years(4.0), 2).unwrap();
    assert!(snr.iter().all(|v| v.is_finite() && *v > 0.0));
    let report = sources.last_report().unwrap();
    assert_eq!(report.beyond_table, 1);
    assert!(report.to_json().unwrap().contains("\"beyond_table\": 1"));
}

#[test]
fn snr_scales_inversely_with_distance() {
    let mut sources = SourceCollection::new(
        batch(&[0.0, 0.0, 0.4, 0.4], &[2e-3, 2e-3, 2e-3, 2e-3], &[1.0, 3.0, 1.0, 3.0]),
        config(),
        provider(),
    )
    .unwrap();
    let snr = sources.get_snr(&Quantity::years(4.0), 50).unwrap();
    assert!((snr[0] / snr[1] - 3.0).abs() < 1e-9);
    assert!((snr[2] / snr[3] - 3.0).abs() < 1e-9);
}

#[test]
fn mixed_batch_equals_union_of_stationary_and_evolving_parts() {
    let ecc = [0.0, 0.3, 0.0, 0.3, 0.6, 0.02];
    let f = [1e-3, 1e-3, 1e-2, 1e-2, 3e-3, 5e-4];
    let dist = [1.0; 6];
    let t_obs = Quantity::years(4.0);

    let mut sources = SourceCollection::new(batch(&ecc, &f, &dist), config(), provider()).unwrap();
    let full = sources.get_snr(&t_obs, 32).unwrap();
    assert!(full.iter().all(|v| v.is_finite() && *v >= 0.0));

    let stat = sources.get_source_mask(TriState::Either, TriState::Yes, &t_obs).unwrap();
    let evol = stat.mapv(|s| !s);
    assert!(stat.iter().any(|&s| s) && evol.iter().any(|&e| e));

    let s = sources.get_snr_stationary(&t_obs, Some(&stat)).unwrap();
    let e = sources.get_snr_evolving(&t_obs, 32, Some(&evol)).unwrap();
    let (mut si, mut ei) = (s.iter(), e.iter());
    for (i, &is_stat) in stat.iter().enumerate() {
        let part = if is_stat { si.next() } else { ei.next() };
        assert_eq!(Some(&full[i]), part, "source {i}");
    }
}

#[test]
fn forced_modes_agree_for_negligible_drift() {
    let p = batch(&[0.0, 0.3], &[5e-4, 5e-4], &[1.0, 1.0]);
    let t_obs = Quantity::years(4.0);
    let mut stat = SourceCollection::stationary(p.clone(), config(), provider()).unwrap();
    let mut evol = SourceCollection::evolving(p, config(), provider()).unwrap();
    assert_eq!(evol.config().mode, SnrMode::Evolving);

    let a = stat.get_snr(&t_obs, 2).unwrap();
    let b = evol.get_snr(&t_obs, 200).unwrap();
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() / x < 0.02, "{x} vs {y}");
    }
}

#[test]
fn tighter_tolerance_reclassifies_near_threshold_sources() {
    let mut sources = SourceCollection::new(batch(&[0.05], &[1e-3], &[1.0]), config(), provider()).unwrap();
    let t_obs = Quantity::years(4.0);
    assert!(sources.get_source_mask(TriState::Yes, TriState::Either, &t_obs).unwrap()[0]);
    sources.update_gw_lum_tol(0.01).unwrap();
    assert!(!sources.get_source_mask(TriState::Yes, TriState::Either, &t_obs).unwrap()[0]);
}

#[test]
fn curve_observation_time_follows_sc_params() {
    let mut sources = SourceCollection::new(batch(&[0.0], &[1e-3], &[1.0]), config(), provider()).unwrap();
    let four = sources.get_snr(&Quantity::years(4.0), 10).unwrap()[0];

    let one_year = SensitivityConfig {
        t_obs: YEAR,
        ..sources.config().sc_params.clone()
    };
    assert!(sources.update_sc_params(one_year).unwrap());
    let one = sources.get_snr(&Quantity::years(1.0), 10).unwrap()[0];
    // Shorter mission: fewer cycles, louder foreground.
    assert!(one < four);
    assert!(sources.snr().is_some());
}
