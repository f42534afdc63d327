use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::check_auth;
use crate::errors::AppError;
use crate::models::{Guest, NewGuest};
use crate::services::{GuestDetails, UpdateGuestRequest};
use crate::state::AppState;

// Guest records hold phone and ID numbers; every route here is staff-only.

// POST /api/bookings/:id/guests
pub async fn add_guest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
    Json(guest): Json<NewGuest>,
) -> Result<(StatusCode, Json<Guest>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let guest = state.bookings.add_guest(&booking_id, guest).await?;
    Ok((StatusCode::CREATED, Json(guest)))
}

// GET /api/guests/:id
pub async fn get_guest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<GuestDetails>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let details = state.bookings.get_guest(&id).await?;
    Ok(Json(details))
}

// PUT /api/guests/:id
pub async fn update_guest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdateGuestRequest>,
) -> Result<Json<Guest>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let guest = state.bookings.update_guest(&id, request).await?;
    Ok(Json(guest))
}

// DELETE /api/guests/:id
pub async fn delete_guest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    state.bookings.remove_guest(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
