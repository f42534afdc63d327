use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::services::{Availability, AvailabilityRequest};
use crate::services::availability::Occupancy;
use crate::state::AppState;

// POST /api/bookings/availability
//
// A rejection is still a completed check, so it comes back as 200 with
// `available: false`.
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let body = match state.bookings.check_availability_request(request).await? {
        Availability::Available(stay) => serde_json::json!({
            "available": true,
            "package": stay.package,
            "days": stay.days,
            "price": stay.price,
        }),
        Availability::Unavailable(rejection) => serde_json::json!({
            "available": false,
            "reason": rejection.reason,
            "message": rejection.message,
            "conflicts": rejection.conflicts,
        }),
    };
    Ok(Json(body))
}

// GET /api/bookings/availability?package_id=&months=
#[derive(Deserialize)]
pub struct OccupancyQuery {
    pub package_id: Option<String>,
    pub months: Option<u32>,
}

pub async fn occupied_dates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OccupancyQuery>,
) -> Result<Json<Occupancy>, AppError> {
    let package_id = query
        .package_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("package_id is required".to_string()))?;

    let occupancy = state.bookings.occupied_dates(&package_id, query.months).await?;
    Ok(Json(occupancy))
}
