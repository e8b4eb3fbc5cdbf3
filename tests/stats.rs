use rf_tools::math::stats::{
    Combination, Tail, bh_adjust, chi_squared_sf, combine_p, fisher_exact, log_base, maprange,
    mean, median, normal_sf, quantile, stdev,
};

#[test]
fn mean_and_stdev_basic() {
    let v = vec![1.0, 2.0, 3.0, 4.0];
    assert!((mean(&v) - 2.5).abs() < 1e-12);
    // population stdev, n divisor
    assert!((stdev(&v) - (1.25f64).sqrt()).abs() < 1e-12);
}

#[test]
fn mean_rejects_non_numeric() {
    assert!(mean(&[]).is_nan());
    assert!(mean(&[1.0, f64::NAN]).is_nan());
    assert!(stdev(&[1.0, f64::INFINITY]).is_nan());
}

#[test]
fn quantile_interpolates() {
    let mut v = vec![4.0, 1.0, 2.0, 3.0];
    assert!((quantile(&mut v, 0.5) - 2.5).abs() < 1e-12);
    let mut v = vec![10.0, 0.0];
    assert!((quantile(&mut v, 0.25) - 2.5).abs() < 1e-12);
    let mut empty: Vec<f64> = Vec::new();
    assert_eq!(quantile(&mut empty, 0.5), 0.0);
}

#[test]
fn median_odd_even() {
    let mut v1 = vec![3.0, 1.0, 2.0];
    assert_eq!(median(&mut v1), 2.0);
    let mut v2 = vec![4.0, 1.0, 2.0, 3.0];
    assert_eq!(median(&mut v2), 2.5);
}

#[test]
fn bh_known_values() {
    let adjusted = bh_adjust(&[0.005, 0.011, 0.02, 0.04]);
    assert!((adjusted[0] - 0.02).abs() < 1e-12);
    assert!((adjusted[1] - 0.022).abs() < 1e-12);
    assert!((adjusted[2] - 0.02 * 4.0 / 3.0).abs() < 1e-12);
    assert!((adjusted[3] - 0.04).abs() < 1e-12);
}

#[test]
fn bh_is_monotone_in_rank_order() {
    let p = vec![0.9, 0.01, 0.3, 0.04, 0.02];
    let adjusted = bh_adjust(&p);
    let mut order: Vec<usize> = (0..p.len()).collect();
    order.sort_by(|&a, &b| p[a].partial_cmp(&p[b]).unwrap());
    for pair in order.windows(2) {
        assert!(adjusted[pair[0]] <= adjusted[pair[1]]);
    }
}

#[test]
fn bh_carries_non_numeric_through() {
    let p = vec![0.02, f64::NAN, 0.04];
    let adjusted = bh_adjust(&p);
    assert!(adjusted[1].is_nan());
    // m = 2, not 3
    assert!((adjusted[0] - 0.04).abs() < 1e-12);
    assert!((adjusted[2] - 0.04).abs() < 1e-12);
}

#[test]
fn stouffer_two_equal_pvalues() {
    // two one-sided p = 0.05 combine to ~0.01
    let combined = combine_p(&[0.05, 0.05], Combination::Stouffer);
    assert!((combined - 0.010).abs() < 1e-3);
}

#[test]
fn fisher_combination_single_is_identity() {
    let combined = combine_p(&[0.2], Combination::Fisher);
    assert!((combined - 0.2).abs() < 1e-9);
}

#[test]
fn combined_p_stays_in_unit_interval() {
    for method in [Combination::Stouffer, Combination::Fisher] {
        let combined = combine_p(&[1e-12, 1e-12, 1e-12], method);
        assert!(combined > 0.0 && combined <= 1.0);
        let combined = combine_p(&[1.0, 1.0], method);
        assert!(combined > 0.0 && combined <= 1.0);
    }
}

#[test]
fn fisher_exact_known_table() {
    // table [[3,1],[1,3]], right tail: 16/70 + 1/70
    let p = fisher_exact(3, 1, 1, 3, Tail::Right);
    assert!((p - 17.0 / 70.0).abs() < 1e-9);
    let p = fisher_exact(3, 1, 1, 3, Tail::Left);
    assert!((p - 69.0 / 70.0).abs() < 1e-9);
}

#[test]
fn fisher_exact_balanced_table_is_one_sided_half() {
    let p = fisher_exact(0, 0, 0, 0, Tail::Right);
    assert_eq!(p, 1.0);
    let p = fisher_exact(5, 5, 5, 5, Tail::Right);
    assert!(p > 0.5 && p <= 1.0);
}

#[test]
fn chi_squared_sf_two_df_is_exponential() {
    assert!((chi_squared_sf(2.0, 2.0) - (-1.0f64).exp()).abs() < 1e-9);
    assert_eq!(chi_squared_sf(0.0, 4.0), 1.0);
}

#[test]
fn normal_sf_symmetry() {
    assert!((normal_sf(0.0) - 0.5).abs() < 1e-12);
    assert!((normal_sf(1.6449) - 0.05).abs() < 1e-4);
    assert!((normal_sf(-1.0) + normal_sf(1.0) - 1.0).abs() < 1e-12);
}

#[test]
fn log_base_and_maprange() {
    assert!((log_base(8.0, 2.0) - 3.0).abs() < 1e-12);
    assert!((maprange(0.0, 10.0, 0.0, 1.0, 5.0) - 0.5).abs() < 1e-12);
    // degenerate source interval collapses onto the target floor
    assert_eq!(maprange(0.7, 0.7, 0.85, 1.0, 0.7), 0.85);
}
