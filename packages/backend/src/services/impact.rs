use std::sync::Arc;

use carimpact_analytics::{analyze, ImpactRequest, ImpactResponse};

use crate::response::AppError;
use crate::state::AppState;

/// Looks up the dealer, fetches its observed series, and runs the analysis.
///
/// Results are cached by the full request key; repeated submissions of the
/// same window return the earlier result unchanged.
pub async fn run_impact_analysis(
    state: &AppState,
    request: ImpactRequest,
) -> Result<Arc<ImpactResponse>, AppError> {
    let dealer = state
        .dealer(request.dealer_id)
        .ok_or_else(|| AppError::not_found(format!("unknown dealer {}", request.dealer_id)))?;

    // Parameter validation runs before any data is fetched.
    request.validate().map_err(AppError::from)?;

    if let Some(cached) = state.cached_response(&request).await {
        tracing::debug!(dealer_id = request.dealer_id, "impact cache hit");
        return Ok(cached);
    }

    let observed = state
        .provider()
        .fetch(request.dealer_id, request.start_date, request.end_date)
        .map_err(AppError::from)?;

    let response = analyze(&request, &observed, &dealer.name).map_err(AppError::from)?;

    tracing::info!(
        dealer_id = request.dealer_id,
        additional_units = response.summary.additional_units,
        p_value = response.summary.p_value,
        significant = response.summary.is_significant,
        "impact analysis complete"
    );

    Ok(state.store_response(&request, response).await)
}
