//! Property-based tests for the analysis invariants:
//! - bounds never cross the prediction
//! - cumulative effect is zero before the intervention
//! - cumulative effect follows the pointwise recurrence
//! - post-window totals equal the summed pointwise effects

use carimpact_analytics::{compute_effects, CounterfactualEstimator, ObservedSeries};
use chrono::{Days, NaiveDate};
use proptest::prelude::*;

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// Arbitrary contiguous daily series with a valid pre-intervention window.
/// Values are tenths of a unit in [0, 70) so degenerate and noisy shapes both
/// appear.
fn arb_series() -> impl Strategy<Value = (ObservedSeries, usize)> {
    (14usize..=60, 5usize..=40).prop_flat_map(|(pre_len, post_len)| {
        let len = pre_len + post_len;
        (
            proptest::collection::vec(0u32..700, len),
            Just(pre_len),
        )
            .prop_map(|(raw, pre_len)| {
                let start = start_date();
                let points = raw
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (start + Days::new(i as u64), *v as f64 / 10.0))
                    .collect();
                (ObservedSeries::new(points).unwrap(), pre_len)
            })
    })
}

proptest! {
    #[test]
    fn prop_bounds_never_cross((series, pre_len) in arb_series()) {
        let intervention = start_date() + Days::new(pre_len as u64);
        let estimator = CounterfactualEstimator::default();
        let counterfactual = estimator.estimate(&series, intervention).unwrap();

        for i in 0..series.len() {
            prop_assert!(counterfactual.lower[i] <= counterfactual.predicted[i]);
            prop_assert!(counterfactual.predicted[i] <= counterfactual.upper[i]);
            prop_assert!(counterfactual.lower[i] >= 0.0);
        }
    }

    #[test]
    fn prop_pre_intervention_cumulative_is_zero((series, pre_len) in arb_series()) {
        let intervention = start_date() + Days::new(pre_len as u64);
        let estimator = CounterfactualEstimator::default();
        let counterfactual = estimator.estimate(&series, intervention).unwrap();
        let effects = compute_effects(&series, &counterfactual, intervention);

        for i in 0..pre_len {
            prop_assert_eq!(effects.cumulative[i], 0.0);
        }
    }

    #[test]
    fn prop_cumulative_recurrence((series, pre_len) in arb_series()) {
        let intervention = start_date() + Days::new(pre_len as u64);
        let estimator = CounterfactualEstimator::default();
        let counterfactual = estimator.estimate(&series, intervention).unwrap();
        let effects = compute_effects(&series, &counterfactual, intervention);

        prop_assert!((effects.cumulative[pre_len] - effects.pointwise[pre_len]).abs() < 1e-9);
        for i in (pre_len + 1)..series.len() {
            let expected = effects.cumulative[i - 1] + effects.pointwise[i];
            prop_assert!((effects.cumulative[i] - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_totals_match_summed_pointwise((series, pre_len) in arb_series()) {
        let intervention = start_date() + Days::new(pre_len as u64);
        let estimator = CounterfactualEstimator::default();
        let counterfactual = estimator.estimate(&series, intervention).unwrap();
        let effects = compute_effects(&series, &counterfactual, intervention);

        let summed: f64 = effects.pointwise[pre_len..].iter().sum();
        prop_assert!((effects.additional_units - summed).abs() < 1e-6);
        prop_assert!(
            (effects.additional_units - (effects.total_observed - effects.total_predicted)).abs()
                < 1e-6
        );
    }
}
