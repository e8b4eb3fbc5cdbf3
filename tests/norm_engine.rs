use rf_tools::config::{BaseSet, NormConfig, NormMethod, Scoring, Window};
use rf_tools::norm::engine::{self, zarringhalam};
use rf_tools::scoring::{RawScores, Skip};

fn raw(scores: &[f64]) -> RawScores {
    RawScores {
        scores: scores.to_vec(),
        masked: vec![false; scores.len()],
    }
}

fn rouskin_config(norm: NormMethod) -> NormConfig {
    let mut config = NormConfig::new(Scoring::Rouskin, norm);
    config.nan_threshold = 1;
    config
}

#[test]
fn winsorized_profile_concentrates_signal() {
    // single transcript-wide window over a sparse count profile
    let mut config = rouskin_config(NormMethod::Winsor90);
    config.window = Window::Bases(10);
    config.offset = Window::Bases(10);

    let scores = [0.0, 0.0, 5.0, 0.0, 0.0, 10.0, 0.0, 0.0, 5.0, 0.0];
    let profile = engine::normalize(&config, "ACGUACGUAC", &raw(&scores)).unwrap();

    for (i, value) in profile.iter().enumerate() {
        assert!(
            (0.0..=1.0).contains(value),
            "position {} out of bounds: {}",
            i,
            value
        );
    }
    // q95 of the window is 7.75, so 5 -> 5/7.75 and 10 caps at 1
    assert!((profile[2] - 5.0 / 7.75).abs() < 1e-9);
    assert!((profile[5] - 1.0).abs() < 1e-9);
    assert!((profile[8] - 5.0 / 7.75).abs() < 1e-9);
    for i in [0, 1, 3, 4, 6, 7, 9] {
        assert_eq!(profile[i], 0.0);
    }
}

#[test]
fn non_reactive_positions_are_nan() {
    let mut config = rouskin_config(NormMethod::Winsor90);
    config.reactive = BaseSet::parse("AC").unwrap();
    config.window = Window::Bases(8);
    config.offset = Window::Bases(8);

    let scores = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let profile = engine::normalize(&config, "ACGTACGT", &raw(&scores)).unwrap();

    for (i, base) in "ACGTACGT".chars().enumerate() {
        if base == 'G' || base == 'T' {
            assert!(profile[i].is_nan(), "position {} should be NaN", i);
        } else {
            assert!(profile[i].is_finite());
        }
    }
}

#[test]
fn masked_positions_are_nan_and_skip_class_statistics() {
    let mut config = rouskin_config(NormMethod::Winsor90);
    config.window = Window::Bases(8);
    config.offset = Window::Bases(8);

    let mut raw = raw(&[1.0, 2.0, 3.0, 4.0, 100.0, 6.0, 7.0, 8.0]);
    raw.masked[4] = true;
    let profile = engine::normalize(&config, "ACGTACGT", &raw).unwrap();

    assert!(profile[4].is_nan());
    // the masked 100.0 must not inflate the window scale
    let mut values: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0, 6.0, 7.0, 8.0];
    let q95 = rf_tools::math::stats::quantile(&mut values, 0.95);
    assert!((profile[7] - (8.0 / q95).min(1.0)).abs() < 1e-9);
}

#[test]
fn raw_mode_copies_scores() {
    let mut config = rouskin_config(NormMethod::TwoEight);
    config.raw = true;
    config.reactive = BaseSet::parse("A").unwrap();

    let profile = engine::normalize(&config, "ACAC", &raw(&[3.0, 4.0, 5.0, 6.0])).unwrap();
    assert_eq!(profile[0], 3.0);
    assert!(profile[1].is_nan());
    assert_eq!(profile[2], 5.0);
    assert!(profile[3].is_nan());
}

#[test]
fn fully_masked_transcript_is_rejected() {
    let config = rouskin_config(NormMethod::Winsor90);
    let mut raw = raw(&[1.0, 2.0, 3.0]);
    raw.masked = vec![true, true, true];
    let err = engine::normalize(&config, "ACG", &raw).unwrap_err();
    assert!(matches!(err, Skip::LowCoverage(_)));
}

#[test]
fn two_eight_undefined_for_small_classes() {
    // k = 6 makes round(0.08 k) = 0, so the class is undefined and
    // every position ends up with an empty accumulator
    let mut config = rouskin_config(NormMethod::TwoEight);
    config.window = Window::Bases(6);
    config.offset = Window::Bases(6);

    let result = engine::normalize(&config, "ACGTAC", &raw(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    assert!(matches!(result, Err(Skip::LowCoverage(_))));
}

#[test]
fn two_eight_scales_by_top_band_average() {
    let mut config = rouskin_config(NormMethod::TwoEight);
    config.window = Window::Bases(7);
    config.offset = Window::Bases(7);

    let scores = [7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
    let profile = engine::normalize(&config, "ACGTACG", &raw(&scores)).unwrap();
    // k = 7: p2 = 0, p8 = 1, average of the two largest = 6.5
    for (i, &score) in scores.iter().enumerate() {
        assert!((profile[i] - score / 6.5).abs() < 1e-9);
    }
}

#[test]
fn overlapping_windows_average_their_contributions() {
    let mut config = rouskin_config(NormMethod::Winsor90);
    config.window = Window::Bases(4);
    config.offset = Window::Bases(2);

    let scores = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let profile = engine::normalize(&config, "ACGTAC", &raw(&scores)).unwrap();

    assert_eq!(profile.len(), 6);
    assert!(profile.iter().all(|v| v.is_finite() && *v >= 0.0 && *v <= 1.0));
    // the last base is covered by the trailing window
    assert!(profile[5] > 0.0);
}

#[test]
fn sparse_stride_leaves_untouched_positions_nan() {
    // offset wider than the window tiles with gaps; bases no window
    // ever covers stay NaN
    let mut config = rouskin_config(NormMethod::Winsor90);
    config.window = Window::Bases(4);
    config.offset = Window::Bases(6);

    let scores: Vec<f64> = (1..=10).map(|v| v as f64).collect();
    let profile = engine::normalize(&config, "ACGTACGTAC", &raw(&scores)).unwrap();

    for i in [0, 1, 2, 3, 6, 7, 8, 9] {
        assert!(profile[i].is_finite(), "position {} should be covered", i);
    }
    assert!(profile[4].is_nan());
    assert!(profile[5].is_nan());
}

#[test]
fn independent_classes_are_scaled_separately() {
    let mut config = rouskin_config(NormMethod::Winsor90);
    config.reactive = BaseSet::parse("AC").unwrap();
    config.independent = true;
    config.window = Window::Bases(8);
    config.offset = Window::Bases(8);

    // A positions carry large scores, C positions small ones; with
    // independent scaling both classes reach their own ceiling
    let scores = [100.0, 1.0, 200.0, 2.0, 100.0, 1.0, 200.0, 2.0];
    let profile = engine::normalize(&config, "ACACACAC", &raw(&scores)).unwrap();

    let a_max = profile
        .iter()
        .step_by(2)
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    let c_max = profile
        .iter()
        .skip(1)
        .step_by(2)
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    assert!((a_max - 1.0).abs() < 1e-9);
    assert!((c_max - 1.0).abs() < 1e-9);
}

#[test]
fn box_plot_normalizes_against_top_decile() {
    let mut config = rouskin_config(NormMethod::BoxPlot);
    config.window = Window::Bases(20);
    config.offset = Window::Bases(20);

    let scores: Vec<f64> = (1..=20).map(|v| v as f64).collect();
    let profile = engine::normalize(&config, &"AC".repeat(10), &raw(&scores)).unwrap();

    // k = 20: one outlier removed, top round(0.1 * 20) = 2 of the rest
    // average to (19 + 18) / 2 = 18.5
    assert!((profile[0] - 1.0 / 18.5).abs() < 1e-9);
    assert!((profile[18] - 19.0 / 18.5).abs() < 1e-9);
}

#[test]
fn zarringhalam_remap_bins() {
    let mut profile = vec![0.0, 0.25, 0.30, 0.70, 1.4, f64::NAN];
    zarringhalam(&mut profile);
    assert!((profile[0] - 0.0).abs() < 1e-12);
    assert!((profile[1] - 0.35).abs() < 1e-12);
    assert!((profile[2] - 0.55).abs() < 1e-12);
    assert!((profile[3] - 0.85).abs() < 1e-12);
    assert!((profile[4] - 1.0).abs() < 1e-12);
    assert!(profile[5].is_nan());
}

#[test]
fn remapped_profiles_stay_in_unit_interval() {
    let mut config = rouskin_config(NormMethod::TwoEight);
    config.remap = true;
    config.window = Window::Bases(16);
    config.offset = Window::Bases(16);

    let scores: Vec<f64> = (0..16).map(|v| v as f64).collect();
    let profile = engine::normalize(&config, &"ACGT".repeat(4), &raw(&scores)).unwrap();
    for value in profile.iter().filter(|v| v.is_finite()) {
        assert!((0.0..=1.0).contains(value));
    }
}
