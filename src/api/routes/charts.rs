//! Chart Routes
//!
//! - GET /api/v1/bar - Grouped bar chart model
//! - GET /api/v1/countries/:country - Category breakdown for one country
//! - POST /api/v1/selection - Select a country for the Sankey chart
//! - GET /api/v1/sankey - Current Sankey graph

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::aggregate::BarChartModel;
use crate::api::dto::{CountryResponse, SelectionRequest, SelectionResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /api/v1/bar
pub async fn get_bar_chart(State(state): State<Arc<AppState>>) -> Json<BarChartModel> {
    Json(state.dashboard.bar_chart().clone())
}

/// GET /api/v1/countries/:country
pub async fn get_country(
    State(state): State<Arc<AppState>>,
    Path(country): Path<String>,
) -> ApiResult<Json<CountryResponse>> {
    let data = state
        .dashboard
        .country(&country)
        .ok_or_else(|| ApiError::NotFound(format!("No data for country: {}", country)))?;

    Ok(Json(CountryResponse {
        country: data.country.clone(),
        total: data.total,
        categories: data.breakdown(),
    }))
}

/// POST /api/v1/selection
///
/// Publishes the selection; the Sankey view is rebuilt asynchronously.
pub async fn select_country(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<(StatusCode, Json<SelectionResponse>)> {
    let country = request.country.trim();
    if country.is_empty() {
        return Err(ApiError::Validation("country must not be empty".to_string()));
    }

    state.dashboard.select(country)?;
    tracing::info!(country = %country, "Country selected");

    Ok((
        StatusCode::ACCEPTED,
        Json(SelectionResponse {
            status: "accepted".to_string(),
            country: country.to_string(),
        }),
    ))
}

/// GET /api/v1/sankey
///
/// 204 until a country has been selected.
pub async fn get_sankey(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard.current_sankey() {
        Some(selected) => Json(selected).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
