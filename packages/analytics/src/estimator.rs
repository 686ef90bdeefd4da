use chrono::{Datelike, NaiveDate};
use rand::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::error::AnalysisError;
use crate::types::{
    CounterfactualSeries, ObservedSeries, EPSILON, MIN_PRE_PERIOD_DAYS, Z_95,
};

/// Fits a baseline model on the pre-intervention segment only and projects it
/// across the full date range.
///
/// The model is a joint OLS regression of level, linear trend, and day-of-week
/// offsets, solved via the normal equations. The 95% band comes from the
/// pre-period residual standard error, widened with forecast horizon. A
/// constant pre-period degenerates to a flat line with a zero-width band,
/// which is a valid result rather than an error.
pub struct CounterfactualEstimator {
    z: f64,
    min_pre_period_days: usize,
}

impl Default for CounterfactualEstimator {
    fn default() -> Self {
        Self {
            z: Z_95,
            min_pre_period_days: MIN_PRE_PERIOD_DAYS,
        }
    }
}

struct PreFit {
    weights: Vec<f64>,
    seasonal: bool,
    /// Center of the fitted time axis; keeps the normal equations well
    /// conditioned.
    t_center: f64,
    residuals: Vec<f64>,
    residual_se: f64,
    pre_len: usize,
}

impl CounterfactualEstimator {
    pub fn new(z: f64, min_pre_period_days: usize) -> Self {
        Self {
            z,
            min_pre_period_days,
        }
    }

    /// Produces the predicted/lower/upper series for every observed day.
    /// Pure function of its inputs.
    pub fn estimate(
        &self,
        observed: &ObservedSeries,
        intervention: NaiveDate,
    ) -> Result<CounterfactualSeries, AnalysisError> {
        let fit = self.fit_pre_period(observed, intervention)?;

        let n = observed.len();
        let mut predicted = Vec::with_capacity(n);
        let mut lower = Vec::with_capacity(n);
        let mut upper = Vec::with_capacity(n);

        for i in 0..n {
            let row = design_row(i as f64 - fit.t_center, weekday_of(observed, i), fit.seasonal);
            // Sales volumes cannot be negative.
            let value = dot_product(&row, &fit.weights).max(0.0);

            let width = if i < fit.pre_len {
                self.z * fit.residual_se
            } else {
                // Uncertainty grows the further we project past the fitted
                // window.
                let horizon = (i - fit.pre_len + 1) as f64;
                self.z * fit.residual_se * (1.0 + horizon / fit.pre_len as f64).sqrt()
            };

            // Bounds never cross the prediction, even for a pathological fit.
            let lo = (value - width).max(0.0).min(value);
            let hi = (value + width).max(value);

            predicted.push(value);
            lower.push(lo);
            upper.push(hi);
        }

        Ok(CounterfactualSeries {
            predicted,
            lower,
            upper,
            residual_se: fit.residual_se,
            pre_period_len: fit.pre_len,
        })
    }

    /// Residual-bootstrap standard error, a cross-check on the analytic band.
    ///
    /// Replicates are seeded per index so the result is reproducible for a
    /// given `seed`.
    pub fn bootstrap_se(
        &self,
        observed: &ObservedSeries,
        intervention: NaiveDate,
        n_replicates: usize,
        seed: u64,
    ) -> Result<f64, AnalysisError> {
        let fit = self.fit_pre_period(observed, intervention)?;
        if fit.residual_se <= EPSILON || n_replicates == 0 {
            return Ok(0.0);
        }

        let residuals = &fit.residuals;
        let n = residuals.len();

        let estimates: Vec<f64> = (0..n_replicates)
            .into_par_iter()
            .map(|replicate| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(replicate as u64));
                let sample: Vec<f64> = (0..n)
                    .map(|_| residuals[rng.gen_range(0..n)])
                    .collect();
                variance(&sample).sqrt()
            })
            .collect();

        Ok(mean(&estimates))
    }

    fn fit_pre_period(
        &self,
        observed: &ObservedSeries,
        intervention: NaiveDate,
    ) -> Result<PreFit, AnalysisError> {
        let pre_len = observed.pre_period_len(intervention);
        if pre_len < self.min_pre_period_days {
            return Err(AnalysisError::InsufficientData(format!(
                "pre-intervention window [{} .. {}) covers {} days, at least {} are required for the baseline fit",
                observed.start(),
                intervention,
                pre_len,
                self.min_pre_period_days
            )));
        }

        // Weekday dummies need at least two full weeks; a contiguous window
        // of that length covers every weekday.
        let seasonal = pre_len >= 14;
        let d = if seasonal { 8 } else { 2 };
        let t_center = (pre_len - 1) as f64 / 2.0;

        // X^T X and X^T y over the pre-period rows.
        let mut xtx = vec![0.0; d * d];
        let mut xty = vec![0.0; d];
        let pre = &observed.values()[..pre_len];
        for (i, y) in pre.iter().enumerate() {
            let row = design_row(i as f64 - t_center, weekday_of(observed, i), seasonal);
            for a in 0..d {
                xty[a] += row[a] * y;
                for b in 0..d {
                    xtx[a * d + b] += row[a] * row[b];
                }
            }
        }

        let weights = solve_linear_system(&xtx, &xty, d);

        let residuals: Vec<f64> = pre
            .iter()
            .enumerate()
            .map(|(i, y)| {
                let row = design_row(i as f64 - t_center, weekday_of(observed, i), seasonal);
                y - dot_product(&row, &weights)
            })
            .collect();

        let residual_se = if pre_len > d {
            let sum_sq: f64 = residuals.iter().map(|r| r * r).sum();
            let se = (sum_sq / (pre_len - d) as f64).sqrt();
            // An exact fit leaves numeric dust; treat it as zero variance.
            if se < 1e-6 {
                0.0
            } else {
                se
            }
        } else {
            0.0
        };

        Ok(PreFit {
            weights,
            seasonal,
            t_center,
            residuals,
            residual_se,
            pre_len,
        })
    }
}

fn weekday_of(observed: &ObservedSeries, index: usize) -> usize {
    observed.date_at(index).weekday().num_days_from_monday() as usize
}

/// Regression row at centered time `t`: intercept, linear trend, and (when
/// seasonal) dummies for Tuesday..Sunday with Monday as the baseline.
fn design_row(t: f64, weekday: usize, seasonal: bool) -> Vec<f64> {
    let mut row = Vec::with_capacity(if seasonal { 8 } else { 2 });
    row.push(1.0);
    row.push(t);
    if seasonal {
        for day in 1..7 {
            row.push(if weekday == day { 1.0 } else { 0.0 });
        }
    }
    row
}

fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Solves `A x = b` for symmetric positive-definite `A` via Cholesky
/// decomposition, with small diagonal guards for near-singular systems.
fn solve_linear_system(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut l = vec![0.0; n * n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }

            if i == j {
                l[i * n + j] = sum.max(EPSILON).sqrt();
            } else {
                l[i * n + j] = sum / (l[j * n + j] + EPSILON);
            }
        }
    }

    // Forward substitution: L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i * n + j] * y[j];
        }
        y[i] = sum / (l[i * n + i] + EPSILON);
    }

    // Backward substitution: L^T x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j * n + i] * x[j];
        }
        x[i] = sum / (l[i * n + i] + EPSILON);
    }

    x
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n-1).
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series_from(start: NaiveDate, values: &[f64]) -> ObservedSeries {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + chrono::Days::new(i as u64), *v))
            .collect();
        ObservedSeries::new(points).unwrap()
    }

    fn noisy_series(start: NaiveDate, days: usize, base: f64, seed: u64) -> ObservedSeries {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let values: Vec<f64> = (0..days)
            .map(|_| (base + rng.gen_range(-3.0..3.0)).max(0.0))
            .collect();
        series_from(start, &values)
    }

    #[test]
    fn test_rejects_short_pre_period() {
        let start = date(2025, 1, 1);
        let series = noisy_series(start, 30, 20.0, 7);
        let estimator = CounterfactualEstimator::default();

        let err = estimator
            .estimate(&series, start + chrono::Days::new(5))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }

    #[test]
    fn test_constant_series_degenerates_to_flat_zero_width() {
        let start = date(2025, 1, 1);
        let series = series_from(start, &vec![20.0; 40]);
        let estimator = CounterfactualEstimator::default();

        let result = estimator
            .estimate(&series, start + chrono::Days::new(25))
            .unwrap();
        assert_eq!(result.residual_se, 0.0);
        for i in 0..series.len() {
            assert!((result.predicted[i] - 20.0).abs() < 1e-6);
            assert!((result.upper[i] - result.lower[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_bounds_never_cross() {
        let start = date(2025, 1, 1);
        let series = noisy_series(start, 90, 25.0, 42);
        let estimator = CounterfactualEstimator::default();

        let result = estimator
            .estimate(&series, start + chrono::Days::new(60))
            .unwrap();
        for i in 0..series.len() {
            assert!(result.lower[i] <= result.predicted[i]);
            assert!(result.predicted[i] <= result.upper[i]);
        }
    }

    #[test]
    fn test_linear_trend_is_projected_forward() {
        let start = date(2025, 1, 1);
        let values: Vec<f64> = (0..40).map(|i| 10.0 + 0.5 * i as f64).collect();
        let series = series_from(start, &values);
        let estimator = CounterfactualEstimator::default();

        let result = estimator
            .estimate(&series, start + chrono::Days::new(28))
            .unwrap();
        // Post days continue the fitted line.
        for i in 28..40 {
            assert!(
                (result.predicted[i] - (10.0 + 0.5 * i as f64)).abs() < 1e-4,
                "day {i}: predicted {}",
                result.predicted[i]
            );
        }
    }

    #[test]
    fn test_weekly_pattern_is_reproduced() {
        let start = date(2025, 1, 6); // a Monday
        let week = [30.0, 20.0, 20.0, 20.0, 25.0, 40.0, 35.0];
        let values: Vec<f64> = (0..42).map(|i| week[i % 7]).collect();
        let series = series_from(start, &values);
        let estimator = CounterfactualEstimator::default();

        let result = estimator
            .estimate(&series, start + chrono::Days::new(28))
            .unwrap();
        for i in 28..42 {
            assert!(
                (result.predicted[i] - week[i % 7]).abs() < 1e-4,
                "day {i}: predicted {} expected {}",
                result.predicted[i],
                week[i % 7]
            );
        }
    }

    #[test]
    fn test_band_widens_with_horizon() {
        let start = date(2025, 1, 1);
        let series = noisy_series(start, 90, 25.0, 11);
        let estimator = CounterfactualEstimator::default();

        let result = estimator
            .estimate(&series, start + chrono::Days::new(60))
            .unwrap();
        assert!(result.residual_se > 0.0);
        let width_first = result.upper[60] - result.lower[60];
        let width_last = result.upper[89] - result.lower[89];
        assert!(width_last > width_first);
    }

    #[test]
    fn test_negative_projection_clamped_to_zero() {
        let start = date(2025, 1, 1);
        let values: Vec<f64> = (0..30).map(|i| (20.0 - 1.5 * i as f64).max(0.0)).collect();
        let series = series_from(start, &values);
        let estimator = CounterfactualEstimator::default();

        let result = estimator
            .estimate(&series, start + chrono::Days::new(20))
            .unwrap();
        for value in &result.predicted {
            assert!(*value >= 0.0);
        }
        for value in &result.lower {
            assert!(*value >= 0.0);
        }
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let start = date(2025, 1, 1);
        let series = noisy_series(start, 60, 22.0, 99);
        let estimator = CounterfactualEstimator::default();
        let intervention = start + chrono::Days::new(40);

        let a = estimator.estimate(&series, intervention).unwrap();
        let b = estimator.estimate(&series, intervention).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bootstrap_se_seeded_and_near_analytic() {
        let start = date(2025, 1, 1);
        let series = noisy_series(start, 60, 22.0, 5);
        let estimator = CounterfactualEstimator::default();
        let intervention = start + chrono::Days::new(45);

        let a = estimator
            .bootstrap_se(&series, intervention, 200, 1234)
            .unwrap();
        let b = estimator
            .bootstrap_se(&series, intervention, 200, 1234)
            .unwrap();
        assert_eq!(a, b);

        let analytic = estimator
            .estimate(&series, intervention)
            .unwrap()
            .residual_se;
        assert!(a > 0.0);
        assert!((a - analytic).abs() / analytic < 0.5);
    }

    #[test]
    fn test_bootstrap_se_zero_for_constant_series() {
        let start = date(2025, 1, 1);
        let series = series_from(start, &vec![20.0; 40]);
        let estimator = CounterfactualEstimator::default();

        let se = estimator
            .bootstrap_se(&series, start + chrono::Days::new(30), 100, 7)
            .unwrap();
        assert_eq!(se, 0.0);
    }

    #[test]
    fn test_solve_linear_system() {
        // 2x2 system: A = [[4, 2], [2, 2]], b = [4, 2] has solution [1, 0].
        let a = vec![4.0, 2.0, 2.0, 2.0];
        let b = vec![4.0, 2.0];
        let x = solve_linear_system(&a, &b, 2);
        assert!((x[0] - 1.0).abs() < 0.01);
        assert!(x[1].abs() < 0.01);
    }

    #[test]
    fn test_mean_and_variance() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-9);
        assert!((variance(&values) - 4.571428571428571).abs() < 1e-9);
        assert_eq!(variance(&[5.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }
}
