use chrono::NaiveDate;

use crate::types::{
    CounterfactualSeries, EffectSeries, ObservedSeries, EPSILON, SIGNIFICANCE_ALPHA,
};

/// Derives pointwise and cumulative effects and the post-window aggregates.
///
/// Cumulative effect accumulates strictly from the intervention day forward;
/// every pre-intervention day reads as zero by convention. The totals cover
/// the closed post window `[intervention, end]` only.
pub fn compute_effects(
    observed: &ObservedSeries,
    counterfactual: &CounterfactualSeries,
    intervention: NaiveDate,
) -> EffectSeries {
    let n = observed.len();
    debug_assert_eq!(counterfactual.predicted.len(), n);

    let post_start = observed.pre_period_len(intervention);
    let post_period_len = n - post_start;

    let mut pointwise = Vec::with_capacity(n);
    let mut cumulative = Vec::with_capacity(n);
    let mut running = 0.0;
    let mut total_observed = 0.0;
    let mut total_predicted = 0.0;

    for i in 0..n {
        let effect = observed.values()[i] - counterfactual.predicted[i];
        pointwise.push(effect);

        if i >= post_start {
            running += effect;
            total_observed += observed.values()[i];
            total_predicted += counterfactual.predicted[i];
            cumulative.push(running);
        } else {
            cumulative.push(0.0);
        }
    }

    let additional_units = total_observed - total_predicted;
    let relative_effect_pct = if total_predicted.abs() < EPSILON {
        None
    } else {
        Some(additional_units / total_predicted * 100.0)
    };

    // z-test of the cumulative effect against its propagated standard error.
    // Independent daily residuals: SE of a sum of k days is se * sqrt(k).
    let cumulative_se = counterfactual.residual_se * (post_period_len as f64).sqrt();
    let p_value = if cumulative_se <= EPSILON {
        // Degenerate zero-variance fit: annotate instead of failing.
        1.0
    } else {
        let z = additional_units.abs() / cumulative_se;
        2.0 * (1.0 - normal_cdf(z))
    };
    let is_significant = p_value < SIGNIFICANCE_ALPHA;

    EffectSeries {
        pointwise,
        cumulative,
        post_period_len,
        total_observed,
        total_predicted,
        additional_units,
        relative_effect_pct,
        cumulative_se,
        p_value,
        is_significant,
    }
}

/// Standard normal CDF, Abramowitz-Stegun approximation (max error ~1.5e-7).
fn normal_cdf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0
        - (a1 * t + a2 * t.powi(2) + a3 * t.powi(3) + a4 * t.powi(4) + a5 * t.powi(5))
            * (-x * x / 2.0).exp();

    0.5 * (1.0 + sign * y)
}
