use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use super::check_auth;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::repository::BookingFilter;
use crate::services::{BookingDetails, CreateBookingRequest, UpdateBookingRequest};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingDetails>), AppError> {
    let details = state.bookings.create_booking(request).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let bookings = state.bookings.list_bookings(&filter).await?;
    Ok(Json(bookings))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingDetails>, AppError> {
    let details = state.bookings.get_booking(&id).await?;
    Ok(Json(details))
}

// PUT /api/bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    // Guests may edit their stay; moving it through the lifecycle is staff work.
    if request.status.is_some() {
        check_auth(&headers, &state.config.admin_token)?;
    }

    let booking = state.bookings.update_booking(&id, request).await?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusChange {
    pub status: BookingStatus,
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let booking = state.bookings.change_status(&id, change.status).await?;
    Ok(Json(booking))
}

// DELETE /api/bookings/:id
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.cancel_booking(&id).await?;
    Ok(Json(booking))
}
