use crate::error::AnalysisError;
use crate::types::{EffectSeries, ImpactRequest, ImpactSummary, Z_95};

/// Packages post-window effects into business metrics and a report string.
///
/// Negative `additional_units` (an adverse effect) flows through unchanged;
/// only the monetary multipliers are constrained to be non-negative.
pub fn build_summary(
    effects: &EffectSeries,
    request: &ImpactRequest,
    dealer_name: &str,
) -> Result<(ImpactSummary, String), AnalysisError> {
    if !request.average_order_value.is_finite() || request.average_order_value < 0.0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "average_order_value must be a non-negative number, got {}",
            request.average_order_value
        )));
    }
    if !request.average_margin.is_finite() || request.average_margin < 0.0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "average_margin must be a non-negative number, got {}",
            request.average_margin
        )));
    }

    let half_width = Z_95 * effects.cumulative_se;
    let summary = ImpactSummary {
        total_observed: effects.total_observed,
        total_predicted: effects.total_predicted,
        additional_units: effects.additional_units,
        relative_effect_pct: effects.relative_effect_pct,
        confidence_interval: [
            effects.additional_units - half_width,
            effects.additional_units + half_width,
        ],
        revenue_impact: effects.additional_units * request.average_order_value,
        margin_impact: effects.additional_units * request.average_margin,
        average_order_value: request.average_order_value,
        average_margin: request.average_margin,
        p_value: effects.p_value,
        is_significant: effects.is_significant,
    };

    let report = render_report(&summary, request, dealer_name);
    Ok((summary, report))
}

/// Deterministic template substitution; no free-form generation.
fn render_report(summary: &ImpactSummary, request: &ImpactRequest, dealer_name: &str) -> String {
    let days = (request.end_date - request.intervention_date).num_days();
    let relative = match summary.relative_effect_pct {
        Some(pct) => format!("{pct:.1}%"),
        None => "relative share not applicable".to_string(),
    };

    let mut report = format!(
        "In the last {days} days since integrating with CarImpact on {}, {dealer_name} has seen {:.1} total sales.",
        request.intervention_date, summary.total_observed
    );

    report.push_str(&format!(
        "\n\nOur analysis shows that approximately {:.1} of these sales ({relative}) would not have happened without CarImpact.",
        summary.additional_units
    ));

    report.push_str(&format!(
        "\n\nWith an average order value of {} and an average margin of {} per vehicle, CarImpact has generated approximately {} in additional revenue and {} in additional profit for your dealership.",
        format_usd(summary.average_order_value),
        format_usd(summary.average_margin),
        format_usd(summary.revenue_impact),
        format_usd(summary.margin_impact)
    ));

    if summary.is_significant {
        report.push_str(&format!(
            "\n\nThis result is statistically significant (p-value: {:.3}).",
            summary.p_value
        ));
    } else {
        // The low-confidence caveat is a required user-facing property.
        report.push_str(&format!(
            "\n\nThis result is not yet statistically significant (p-value: {:.3}). More data may be needed before drawing conclusions.",
            summary.p_value
        ));
    }

    report
}

/// Rounds to whole dollars and inserts thousands separators.
fn format_usd(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
