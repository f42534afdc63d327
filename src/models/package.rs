use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Money;

/// A bookable camping offering. The booking engine only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Daily rate.
    pub price: Money,
    /// Largest party the package accepts.
    pub capacity: u32,
    /// Nominal stay length in days. Informational only.
    pub duration: u32,
    pub status: PackageStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageStatus {
    Active,
    Inactive,
    Draft,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Active => "ACTIVE",
            PackageStatus::Inactive => "INACTIVE",
            PackageStatus::Draft => "DRAFT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(PackageStatus::Active),
            "INACTIVE" => Some(PackageStatus::Inactive),
            "DRAFT" => Some(PackageStatus::Draft),
            _ => None,
        }
    }
}

/// The subset of a package echoed back with an availability answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageSummary {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    pub price_per_day: Money,
    pub duration: u32,
}

impl From<&Package> for PackageSummary {
    fn from(package: &Package) -> Self {
        Self {
            id: package.id.clone(),
            name: package.name.clone(),
            capacity: package.capacity,
            price_per_day: package.price,
            duration: package.duration,
        }
    }
}
