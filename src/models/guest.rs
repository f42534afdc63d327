use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    pub id: String,
    pub booking_id: String,
    pub name: String,
    pub age: Option<u32>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub dietary_requirements: Option<String>,
    pub id_number: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Occupant details submitted with a booking request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewGuest {
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
    #[serde(default)]
    pub dietary_requirements: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
}
