use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use carimpact_analytics::ImpactRequest;

use crate::response::{AppError, AppJson};
use crate::services::impact::run_impact_analysis;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dealers/:dealer_id", get(dealer_info))
        .route("/dealers/:dealer_id/impact", post(dealer_impact))
}

/// Analysis parameters as the dashboard submits them. The path `dealer_id`
/// is authoritative; a body id is accepted but must agree.
#[derive(Debug, Deserialize)]
struct ImpactParams {
    #[serde(default)]
    dealer_id: Option<i64>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    intervention_date: NaiveDate,
    average_order_value: f64,
    average_margin: f64,
}

async fn dealer_info(
    State(state): State<AppState>,
    Path(dealer_id): Path<i64>,
) -> Result<Response, AppError> {
    let dealer = state
        .dealer(dealer_id)
        .ok_or_else(|| AppError::not_found(format!("unknown dealer {dealer_id}")))?;
    Ok(Json(dealer).into_response())
}

async fn dealer_impact(
    State(state): State<AppState>,
    Path(dealer_id): Path<i64>,
    AppJson(params): AppJson<ImpactParams>,
) -> Result<Response, AppError> {
    if let Some(body_id) = params.dealer_id {
        if body_id != dealer_id {
            return Err(AppError::invalid_parameter(format!(
                "body dealer_id {body_id} does not match path dealer {dealer_id}"
            )));
        }
    }

    let request = ImpactRequest {
        dealer_id,
        start_date: params.start_date,
        end_date: params.end_date,
        intervention_date: params.intervention_date,
        average_order_value: params.average_order_value,
        average_margin: params.average_margin,
    };

    let response = run_impact_analysis(&state, request).await?;
    Ok(Json(response.as_ref().clone()).into_response())
}
