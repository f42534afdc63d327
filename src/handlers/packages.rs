use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDateTime;
use serde::Deserialize;
use uuid::Uuid;

use super::check_auth;
use crate::errors::AppError;
use crate::models::{Money, Package, PackageStatus};
use crate::repository::PackageRepository;
use crate::state::AppState;

// GET /api/packages
#[derive(Deserialize)]
pub struct PackagesQuery {
    pub status: Option<PackageStatus>,
}

pub async fn list_packages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PackagesQuery>,
) -> Result<Json<Vec<Package>>, AppError> {
    let packages = state.packages.list(query.status).await?;
    Ok(Json(packages))
}

// GET /api/packages/:id
pub async fn get_package(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Package>, AppError> {
    state
        .packages
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("package {id}")))
}

// POST /api/packages
/// Daily rate as text (`"¥100.00"`, `"1,250.5"`) or integer minor units.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Minor(i64),
    Text(String),
}

impl PriceInput {
    fn into_money(self) -> Result<Money, AppError> {
        match self {
            PriceInput::Minor(minor) => Money::try_from_minor(minor),
            PriceInput::Text(text) => Money::parse(&text),
        }
        .map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePackageRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<PriceInput>,
    pub capacity: Option<i64>,
    pub duration: Option<i64>,
    pub status: Option<PackageStatus>,
}

const MAX_DURATION_DAYS: u32 = 365;

impl CreatePackageRequest {
    /// `max_capacity` is the party-size ceiling; no package holds more.
    fn into_package(self, now: NaiveDateTime, max_capacity: u32) -> Result<Package, AppError> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::BadRequest("name is required".to_string()))?;
        let price = self
            .price
            .ok_or_else(|| AppError::BadRequest("price is required".to_string()))?
            .into_money()?;
        let capacity = bounded("capacity", self.capacity, max_capacity)?;
        let duration = match self.duration {
            Some(_) => bounded("duration", self.duration, MAX_DURATION_DAYS)?,
            None => 1,
        };

        Ok(Package {
            id: Uuid::new_v4().to_string(),
            name,
            description: self.description.filter(|d| !d.trim().is_empty()),
            price,
            capacity,
            duration,
            status: self.status.unwrap_or(PackageStatus::Active),
            created_at: now,
            updated_at: now,
        })
    }
}

fn bounded(field: &str, value: Option<i64>, max: u32) -> Result<u32, AppError> {
    match value {
        Some(n) if n >= 1 && n <= i64::from(max) => Ok(n as u32),
        _ => Err(AppError::BadRequest(format!("{field} must be an integer from 1 to {max}"))),
    }
}

pub async fn create_package(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreatePackageRequest>,
) -> Result<(StatusCode, Json<Package>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let package = request.into_package(state.clock.now(), state.config.max_party_size)?;
    state.packages.create(&package).await?;
    tracing::info!(package_id = %package.id, name = %package.name, "package created");

    Ok((StatusCode::CREATED, Json(package)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-08-01 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_price_accepts_text_and_minor_units() {
        let text: CreatePackageRequest =
            serde_json::from_str(r#"{"name":"Lakeside","price":"¥100.00","capacity":6}"#).unwrap();
        let package = text.into_package(now(), 50).unwrap();
        assert_eq!(package.price, Money::from_minor(10000));
        assert_eq!(package.duration, 1);
        assert_eq!(package.status, PackageStatus::Active);

        let minor: CreatePackageRequest =
            serde_json::from_str(r#"{"name":"Lakeside","price":4550,"capacity":2,"status":"DRAFT"}"#).unwrap();
        let package = minor.into_package(now(), 50).unwrap();
        assert_eq!(package.price, Money::from_minor(4550));
        assert_eq!(package.status, PackageStatus::Draft);

        let ceiling: CreatePackageRequest =
            serde_json::from_str(r#"{"name":"Meadow","price":99999900,"capacity":50,"duration":365}"#).unwrap();
        let package = ceiling.into_package(now(), 50).unwrap();
        assert_eq!(package.price, Money::MAX);
        assert_eq!(package.capacity, 50);
    }

    #[test]
    fn test_rejects_bad_packages() {
        for body in [
            r#"{"price":100,"capacity":2}"#,
            r#"{"name":"  ","price":100,"capacity":2}"#,
            r#"{"name":"A","capacity":2}"#,
            r#"{"name":"A","price":-1,"capacity":2}"#,
            r#"{"name":"A","price":"abc","capacity":2}"#,
            r#"{"name":"A","price":100,"capacity":0}"#,
            r#"{"name":"A","price":100,"capacity":2,"duration":0}"#,
            r#"{"name":"A","price":100,"capacity":2,"duration":366}"#,
            r#"{"name":"A","price":100,"capacity":51}"#,
            r#"{"name":"A","price":100,"capacity":2000000000}"#,
            r#"{"name":"A","price":99999901,"capacity":2}"#,
            r#"{"name":"A","price":9223372036854775807,"capacity":2}"#,
            r#"{"name":"A","price":"1000000","capacity":2}"#,
        ] {
            let request: CreatePackageRequest = serde_json::from_str(body).unwrap();
            assert!(request.into_package(now(), 50).is_err(), "{body}");
        }
    }
}
