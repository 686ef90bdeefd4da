use crate::effects::compute_effects;
use crate::error::AnalysisError;
use crate::estimator::CounterfactualEstimator;
use crate::summary::build_summary;
use crate::types::{ChartSeries, ImpactRequest, ImpactResponse, ObservedSeries};

/// Runs the full analysis: counterfactual estimate, effect calculation, and
/// summary/report. Stateless and re-entrant; validation happens before any
/// computation, so no partial result is ever produced alongside an error.
pub fn analyze(
    request: &ImpactRequest,
    observed: &ObservedSeries,
    dealer_name: &str,
) -> Result<ImpactResponse, AnalysisError> {
    request.validate()?;

    if observed.start() != request.start_date || observed.end() != request.end_date {
        return Err(AnalysisError::InsufficientData(format!(
            "observed series covers {}..{}, the request expects {}..{}",
            observed.start(),
            observed.end(),
            request.start_date,
            request.end_date
        )));
    }

    let estimator = CounterfactualEstimator::default();
    let counterfactual = estimator.estimate(observed, request.intervention_date)?;
    let effects = compute_effects(observed, &counterfactual, request.intervention_date);
    let (summary, report_text) = build_summary(&effects, request, dealer_name)?;

    let series = ChartSeries {
        dates: (0..observed.len())
            .map(|i| observed.date_at(i).to_string())
            .collect(),
        actual: observed.values().to_vec(),
        predicted: counterfactual.predicted,
        lower_bound: counterfactual.lower,
        upper_bound: counterfactual.upper,
        pointwise_effect: effects.pointwise,
        cumulative_effect: effects.cumulative,
    };

    Ok(ImpactResponse {
        summary,
        series,
        report_text,
    })
}
