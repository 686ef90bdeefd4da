use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Z value for a 95% confidence interval.
pub const Z_95: f64 = 1.96;
/// Two-sided significance threshold.
pub const SIGNIFICANCE_ALPHA: f64 = 0.05;
/// Minimum pre-intervention window required for a meaningful fit.
pub const MIN_PRE_PERIOD_DAYS: usize = 14;
/// Numeric stability floor.
pub const EPSILON: f64 = 1e-10;

/// Parameters for one impact analysis run.
///
/// `start_date < intervention_date < end_date` must hold and both monetary
/// multipliers must be non-negative; `validate` rejects anything else before
/// any computation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactRequest {
    pub dealer_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub intervention_date: NaiveDate,
    pub average_order_value: f64,
    pub average_margin: f64,
}

impl ImpactRequest {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.start_date >= self.intervention_date {
            return Err(AnalysisError::InvalidParameter(format!(
                "intervention_date {} must fall after start_date {}",
                self.intervention_date, self.start_date
            )));
        }
        if self.intervention_date >= self.end_date {
            return Err(AnalysisError::InvalidParameter(format!(
                "intervention_date {} must fall before end_date {}",
                self.intervention_date, self.end_date
            )));
        }
        if !self.average_order_value.is_finite() || self.average_order_value < 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "average_order_value must be a non-negative number, got {}",
                self.average_order_value
            )));
        }
        if !self.average_margin.is_finite() || self.average_margin < 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "average_margin must be a non-negative number, got {}",
                self.average_margin
            )));
        }
        Ok(())
    }
}

/// Contiguous daily sales observations, one value per calendar day.
///
/// Gaps are a data-quality problem for the pre-period fit, so the constructor
/// rejects them instead of interpolating.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedSeries {
    start: NaiveDate,
    values: Vec<f64>,
}

impl ObservedSeries {
    pub fn new(points: Vec<(NaiveDate, f64)>) -> Result<Self, AnalysisError> {
        let Some(&(start, _)) = points.first() else {
            return Err(AnalysisError::InsufficientData(
                "observed series is empty".to_string(),
            ));
        };

        let mut values = Vec::with_capacity(points.len());
        let mut expected = start;
        for (date, value) in &points {
            if *date != expected {
                return Err(AnalysisError::InsufficientData(format!(
                    "observed series has a gap: expected {expected}, got {date}"
                )));
            }
            if !value.is_finite() {
                return Err(AnalysisError::InsufficientData(format!(
                    "observed value for {date} is not a finite number"
                )));
            }
            values.push(*value);
            expected = expected.succ_opt().ok_or_else(|| {
                AnalysisError::InvalidParameter(format!("date overflow after {date}"))
            })?;
        }

        Ok(Self { start, values })
    }

    /// Builds a series from parallel date/value arrays from a wire payload.
    pub fn from_parts(dates: &[NaiveDate], values: &[f64]) -> Result<Self, AnalysisError> {
        if dates.len() != values.len() {
            return Err(AnalysisError::InsufficientData(format!(
                "dates ({}) and values ({}) differ in length",
                dates.len(),
                values.len()
            )));
        }
        Self::new(dates.iter().copied().zip(values.iter().copied()).collect())
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.start + chrono::Days::new(self.values.len() as u64 - 1)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn date_at(&self, index: usize) -> NaiveDate {
        self.start + chrono::Days::new(index as u64)
    }

    /// Index of `date` within the series, if covered.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.start).num_days();
        if offset < 0 || offset as usize >= self.values.len() {
            None
        } else {
            Some(offset as usize)
        }
    }

    /// Number of days strictly before `intervention`.
    pub fn pre_period_len(&self, intervention: NaiveDate) -> usize {
        let offset = (intervention - self.start).num_days();
        offset.clamp(0, self.values.len() as i64) as usize
    }
}

/// Counterfactual ("no product") projection with a 95% band.
///
/// Invariant: `lower[i] <= predicted[i] <= upper[i]` for every day.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterfactualSeries {
    pub predicted: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// Residual standard error of the pre-period fit.
    pub residual_se: f64,
    /// Days the model was fit on.
    pub pre_period_len: usize,
}

/// Pointwise and cumulative effects plus post-window aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSeries {
    pub pointwise: Vec<f64>,
    /// Zero for every pre-intervention day by convention.
    pub cumulative: Vec<f64>,
    pub post_period_len: usize,
    pub total_observed: f64,
    pub total_predicted: f64,
    pub additional_units: f64,
    /// `None` when `total_predicted` is zero (division undefined).
    pub relative_effect_pct: Option<f64>,
    /// Standard error of the cumulative effect over the post window.
    pub cumulative_se: f64,
    pub p_value: f64,
    pub is_significant: bool,
}

/// Aggregate business metrics over the post-intervention window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub total_observed: f64,
    pub total_predicted: f64,
    pub additional_units: f64,
    pub relative_effect_pct: Option<f64>,
    pub confidence_interval: [f64; 2],
    pub revenue_impact: f64,
    pub margin_impact: f64,
    pub average_order_value: f64,
    pub average_margin: f64,
    pub p_value: f64,
    pub is_significant: bool,
}

/// Parallel per-day arrays for chart rendering, one entry per day in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub dates: Vec<String>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
    pub lower_bound: Vec<f64>,
    pub upper_bound: Vec<f64>,
    pub pointwise_effect: Vec<f64>,
    pub cumulative_effect: Vec<f64>,
}

/// Full analysis result: the sole boundary contract of the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactResponse {
    pub summary: ImpactSummary,
    pub series: ChartSeries,
    pub report_text: String,
}
