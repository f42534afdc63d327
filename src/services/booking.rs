use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::availability::{Availability, AvailabilityChecker, AvailabilityQuery, AvailableStay, Occupancy, Rejection};
use super::confirmation::{CodeSettings, CodeSource, ConfirmationCodes};
use super::pricing::{compute_price, PriceBreakdown};
use super::{BookingError, Clock};
use crate::config::AppConfig;
use crate::models::{Booking, BookingStatus, Guest, NewGuest};
use crate::repository::{
    BookingFilter, BookingPatch, BookingRepository, GuestPatch, PackageRepository, RepositoryError,
};

#[derive(Debug, Clone)]
pub struct BookingRules {
    /// Ceiling on party size regardless of package capacity.
    pub max_party_size: u32,
    pub codes: CodeSettings,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            max_party_size: 50,
            codes: CodeSettings::default(),
        }
    }
}

impl From<&AppConfig> for BookingRules {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_party_size: config.max_party_size,
            codes: CodeSettings {
                prefix: config.code_prefix.clone(),
                digits: config.code_digits,
                max_attempts: config.code_max_attempts,
            },
        }
    }
}

/// A booking request as it arrives from a caller, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBookingRequest {
    pub package_id: Option<String>,
    pub user_id: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub party_size: Option<i64>,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub guests: Vec<NewGuest>,
}

/// An availability question as it arrives from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityRequest {
    pub package_id: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub party_size: Option<i64>,
    #[serde(default)]
    pub exclude_booking_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookingRequest {
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub party_size: Option<i64>,
    pub status: Option<BookingStatus>,
    /// Absent leaves the note alone; `null` or blank clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub special_requests: Option<Option<String>>,
}

impl UpdateBookingRequest {
    fn changes_stay(&self) -> bool {
        self.check_in.is_some() || self.check_out.is_some() || self.party_size.is_some()
    }
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Guest edits. Absent fields are left alone; `null` or blank clears an
/// optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGuestRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub age: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub emergency_contact: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub emergency_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub dietary_requirements: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub id_number: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestDetails {
    pub guest: Guest,
    pub booking: Booking,
}

const MAX_GUEST_NAME_CHARS: usize = 50;
const MAX_GUEST_AGE: i64 = 150;

#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub guests: Vec<Guest>,
    pub price: PriceBreakdown,
}

/// Accepts, edits and advances bookings.
///
/// Every decision is made through the availability checker, the price
/// calculator and the status table; the repositories are the only place
/// state changes.
pub struct BookingService {
    packages: Arc<dyn PackageRepository>,
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
    checker: AvailabilityChecker,
    codes: ConfirmationCodes,
    rules: BookingRules,
}

impl BookingService {
    pub fn new(
        packages: Arc<dyn PackageRepository>,
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
        code_source: Arc<dyn CodeSource>,
        rules: BookingRules,
    ) -> Self {
        let checker = AvailabilityChecker::new(packages.clone(), bookings.clone(), clock.clone());
        let codes = ConfirmationCodes::new(bookings.clone(), code_source, clock.clone(), rules.codes.clone());
        Self {
            packages,
            bookings,
            clock,
            checker,
            codes,
            rules,
        }
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    pub async fn check_availability(&self, query: &AvailabilityQuery) -> Result<Availability, BookingError> {
        Ok(self.checker.check(query).await?)
    }

    /// Validates the raw fields, then runs [`Self::check_availability`].
    pub async fn check_availability_request(
        &self,
        request: AvailabilityRequest,
    ) -> Result<Availability, BookingError> {
        let query = AvailabilityQuery {
            package_id: required_text("package_id", request.package_id.as_deref())?.to_string(),
            check_in: parse_date("check_in", request.check_in.as_deref())?,
            check_out: parse_date("check_out", request.check_out.as_deref())?,
            party_size: self.validate_party_size(request.party_size)?,
            exclude_booking_id: non_blank(request.exclude_booking_id),
        };
        self.check_availability(&query).await
    }

    pub async fn occupied_dates(&self, package_id: &str, months: Option<u32>) -> Result<Occupancy, BookingError> {
        self.checker.occupancy(package_id, months).await
    }

    pub async fn create_booking(&self, request: CreateBookingRequest) -> Result<BookingDetails, BookingError> {
        let package_id = required_text("package_id", request.package_id.as_deref())?;
        let user_id = required_text("user_id", request.user_id.as_deref())?;
        let check_in = parse_date("check_in", request.check_in.as_deref())?;
        let check_out = parse_date("check_out", request.check_out.as_deref())?;
        let party_size = self.validate_party_size(request.party_size)?;
        for guest in &request.guests {
            validate_new_guest(guest)?;
        }

        let query = AvailabilityQuery {
            package_id: package_id.to_string(),
            check_in,
            check_out,
            party_size,
            exclude_booking_id: None,
        };
        let stay = self.require_available(&query).await?;

        let now = self.clock.now();
        let mut booking = Booking {
            id: Uuid::new_v4().to_string(),
            package_id: package_id.to_string(),
            user_id: user_id.to_string(),
            check_in,
            check_out,
            party_size,
            total_price: stay.price.total,
            status: BookingStatus::Pending,
            confirmation_code: String::new(),
            special_requests: non_blank(request.special_requests),
            created_at: now,
            updated_at: now,
        };

        let guests: Vec<Guest> = request
            .guests
            .into_iter()
            .map(|g| new_guest_record(&booking.id, g, now))
            .collect();

        // A code can be claimed between the lookup and the insert; draw again.
        let max_attempts = self.codes.settings().max_attempts;
        let mut attempts = 0;
        loop {
            attempts += 1;
            booking.confirmation_code = self.codes.generate_unique_code().await?;

            match self.bookings.create(&booking, &guests).await {
                Ok(()) => break,
                Err(RepositoryError::DuplicateCode(code)) if attempts < max_attempts => {
                    tracing::warn!(code = %code, "confirmation code claimed concurrently, retrying");
                }
                Err(RepositoryError::DuplicateCode(_)) => {
                    tracing::error!(attempts, "confirmation code kept colliding at insert");
                    return Err(BookingError::ExhaustedRetries { attempts });
                }
                Err(RepositoryError::Overlap(conflicts)) => {
                    tracing::warn!(package_id = %booking.package_id, "stay taken while booking was being created");
                    return Err(BookingError::Unavailable(Rejection::date_conflict(conflicts)));
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            booking_id = %booking.id,
            code = %booking.confirmation_code,
            package_id = %booking.package_id,
            total = booking.total_price.minor(),
            "booking created"
        );

        Ok(BookingDetails {
            booking,
            guests,
            price: stay.price,
        })
    }

    pub async fn update_booking(&self, id: &str, request: UpdateBookingRequest) -> Result<Booking, BookingError> {
        let existing = self.find(id).await?;
        let mut patch = BookingPatch::default();

        if let Some(to) = request.status {
            ensure_transition(existing.status, to)?;
            patch.status = Some(to);
        }

        if request.changes_stay() {
            if !existing.status.is_active() {
                return Err(BookingError::validation(format!(
                    "dates and party size cannot change on a {} booking",
                    existing.status
                )));
            }

            let check_in = match request.check_in.as_deref() {
                Some(raw) => parse_date("check_in", Some(raw))?,
                None => existing.check_in,
            };
            let check_out = match request.check_out.as_deref() {
                Some(raw) => parse_date("check_out", Some(raw))?,
                None => existing.check_out,
            };
            let party_size = match request.party_size {
                Some(raw) => self.validate_party_size(Some(raw))?,
                None => existing.party_size,
            };

            let stay = self
                .require_available(&AvailabilityQuery {
                    package_id: existing.package_id.clone(),
                    check_in,
                    check_out,
                    party_size,
                    exclude_booking_id: Some(existing.id.clone()),
                })
                .await?;

            patch.check_in = Some(check_in);
            patch.check_out = Some(check_out);
            patch.party_size = Some(party_size);
            patch.total_price = Some(stay.price.total);
        }

        if let Some(special_requests) = request.special_requests {
            patch.special_requests = Some(non_blank(special_requests));
        }

        if patch.is_empty() {
            return Err(BookingError::validation("no fields to update"));
        }

        let updated = self.apply(id, &patch).await?;
        tracing::info!(booking_id = %id, status = %updated.status, "booking updated");
        Ok(updated)
    }

    pub async fn change_status(&self, id: &str, to: BookingStatus) -> Result<Booking, BookingError> {
        let existing = self.find(id).await?;
        ensure_transition(existing.status, to)?;

        let patch = BookingPatch {
            status: Some(to),
            ..Default::default()
        };
        let updated = self.apply(id, &patch).await?;
        tracing::info!(booking_id = %id, from = %existing.status, to = %to, "booking status changed");
        Ok(updated)
    }

    pub async fn cancel_booking(&self, id: &str) -> Result<Booking, BookingError> {
        self.change_status(id, BookingStatus::Cancelled).await
    }

    pub async fn get_booking(&self, id: &str) -> Result<BookingDetails, BookingError> {
        let booking = self.find(id).await?;
        let package = self.packages.find_by_id(&booking.package_id).await?.ok_or_else(|| {
            RepositoryError::Storage(anyhow::anyhow!(
                "package {} referenced by booking {} is missing",
                booking.package_id,
                booking.id
            ))
        })?;
        let guests = self.bookings.guests_for(&booking.id).await?;
        let price = compute_price(
            package.price,
            booking.nights() as u32,
            booking.party_size,
            package.capacity,
        );

        Ok(BookingDetails {
            booking,
            guests,
            price,
        })
    }

    pub async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BookingError> {
        Ok(self.bookings.list(filter).await?)
    }

    pub async fn add_guest(&self, booking_id: &str, guest: NewGuest) -> Result<Guest, BookingError> {
        validate_new_guest(&guest)?;
        let booking = self.find(booking_id).await?;
        if !booking.status.is_active() {
            return Err(BookingError::validation(format!(
                "guests cannot be added to a {} booking",
                booking.status
            )));
        }

        let guest = new_guest_record(&booking.id, guest, self.clock.now());
        match self.bookings.add_guest(&guest).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound(id)) => return Err(BookingError::NotFound(id)),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(booking_id = %booking.id, guest_id = %guest.id, "guest added");
        Ok(guest)
    }

    pub async fn get_guest(&self, id: &str) -> Result<GuestDetails, BookingError> {
        let guest = self
            .bookings
            .find_guest(id)
            .await?
            .ok_or_else(|| BookingError::GuestNotFound(id.to_string()))?;
        let booking = self.find(&guest.booking_id).await?;
        Ok(GuestDetails { guest, booking })
    }

    pub async fn update_guest(&self, id: &str, request: UpdateGuestRequest) -> Result<Guest, BookingError> {
        let mut patch = GuestPatch::default();

        if let Some(name) = request.name {
            patch.name = Some(guest_name(&name)?);
        }
        if let Some(age) = request.age {
            patch.age = Some(age.map(guest_age).transpose()?);
        }
        patch.phone = request.phone.map(non_blank);
        patch.emergency_contact = request.emergency_contact.map(non_blank);
        patch.emergency_phone = request.emergency_phone.map(non_blank);
        patch.dietary_requirements = request.dietary_requirements.map(non_blank);
        patch.id_number = request.id_number.map(non_blank);

        if patch.is_empty() {
            return Err(BookingError::validation("no fields to update"));
        }

        match self.bookings.update_guest(id, &patch).await {
            Ok(guest) => {
                tracing::info!(guest_id = %id, "guest updated");
                Ok(guest)
            }
            Err(RepositoryError::GuestNotFound(id)) => Err(BookingError::GuestNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove_guest(&self, id: &str) -> Result<(), BookingError> {
        match self.bookings.delete_guest(id).await {
            Ok(()) => {
                tracing::info!(guest_id = %id, "guest removed");
                Ok(())
            }
            Err(RepositoryError::GuestNotFound(id)) => Err(BookingError::GuestNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find(&self, id: &str) -> Result<Booking, BookingError> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(id.to_string()))
    }

    async fn require_available(&self, query: &AvailabilityQuery) -> Result<AvailableStay, BookingError> {
        self.checker.check(query).await?.into_result().map_err(|rejection| {
            tracing::warn!(
                package_id = %query.package_id,
                reason = rejection.reason.as_str(),
                "booking request rejected"
            );
            BookingError::Unavailable(rejection)
        })
    }

    async fn apply(&self, id: &str, patch: &BookingPatch) -> Result<Booking, BookingError> {
        match self.bookings.update(id, patch).await {
            Ok(booking) => Ok(booking),
            Err(RepositoryError::NotFound(id)) => Err(BookingError::NotFound(id)),
            Err(RepositoryError::Overlap(conflicts)) => {
                Err(BookingError::Unavailable(Rejection::date_conflict(conflicts)))
            }
            // The booking changed between our read and the write.
            Err(RepositoryError::IllegalTransition { from, to }) => {
                tracing::warn!(booking_id = %id, from = %from, to = %to, "status changed concurrently");
                Err(BookingError::IllegalTransition { from, to })
            }
            Err(RepositoryError::Inactive { status, .. }) => Err(BookingError::validation(format!(
                "dates and party size cannot change on a {status} booking"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn validate_party_size(&self, raw: Option<i64>) -> Result<u32, BookingError> {
        let max = self.rules.max_party_size;
        match raw {
            Some(n) if n >= 1 && n <= i64::from(max) => Ok(n as u32),
            Some(_) => Err(BookingError::validation(format!(
                "party_size must be an integer between 1 and {max}"
            ))),
            None => Err(BookingError::validation("party_size is required")),
        }
    }
}

fn ensure_transition(from: BookingStatus, to: BookingStatus) -> Result<(), BookingError> {
    if BookingStatus::can_transition(from, to) {
        Ok(())
    } else {
        Err(BookingError::IllegalTransition { from, to })
    }
}

fn validate_new_guest(guest: &NewGuest) -> Result<(), BookingError> {
    guest_name(&guest.name)?;
    if let Some(age) = guest.age {
        guest_age(i64::from(age))?;
    }
    Ok(())
}

fn guest_name(raw: &str) -> Result<String, BookingError> {
    let name = raw.trim();
    let chars = name.chars().count();
    if chars == 0 || chars > MAX_GUEST_NAME_CHARS {
        return Err(BookingError::validation(format!(
            "guest name must be 1 to {MAX_GUEST_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

fn guest_age(age: i64) -> Result<u32, BookingError> {
    if (0..=MAX_GUEST_AGE).contains(&age) {
        Ok(age as u32)
    } else {
        Err(BookingError::validation(format!("guest age must be between 0 and {MAX_GUEST_AGE}")))
    }
}

fn new_guest_record(booking_id: &str, guest: NewGuest, now: NaiveDateTime) -> Guest {
    Guest {
        id: Uuid::new_v4().to_string(),
        booking_id: booking_id.to_string(),
        name: guest.name.trim().to_string(),
        age: guest.age,
        phone: non_blank(guest.phone),
        emergency_contact: non_blank(guest.emergency_contact),
        emergency_phone: non_blank(guest.emergency_phone),
        dietary_requirements: non_blank(guest.dietary_requirements),
        id_number: non_blank(guest.id_number),
        created_at: now,
    }
}

fn required_text<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, BookingError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BookingError::validation(format!("{field} is required"))),
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its UTC date is used).
fn parse_date(field: &str, value: Option<&str>) -> Result<NaiveDate, BookingError> {
    let raw = required_text(field, value)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_utc().date()))
        .map_err(|_| BookingError::validation(format!("{field} is not a valid date: {raw}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
