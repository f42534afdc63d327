//! Persistence seams for the booking engine.
//!
//! Services only see the [`PackageRepository`] and [`BookingRepository`]
//! traits. [`sqlite::SqliteRepository`] backs the running server;
//! [`memory::InMemoryRepository`] backs tests and throwaway instances.
//! Both implementations hold one lock across read, check and write: a
//! status change is checked against the stored status, and any write that
//! leaves a booking active re-checks overlap. Two requests that passed their
//! checks on the same snapshot cannot both commit.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::models::{Booking, BookingStatus, ConflictingBooking, Guest, Money, Package, PackageStatus};

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("stay overlaps {} active booking(s)", .0.len())]
    Overlap(Vec<ConflictingBooking>),

    #[error("confirmation code already issued: {0}")]
    DuplicateCode(String),

    #[error("booking not found: {0}")]
    NotFound(String),

    #[error("booking is {from}, cannot move to {to}")]
    IllegalTransition { from: BookingStatus, to: BookingStatus },

    #[error("booking {id} is {status}; its stay can no longer change")]
    Inactive { id: String, status: BookingStatus },

    #[error("guest not found: {0}")]
    GuestNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::Storage(err.into())
    }
}

/// Field updates for an existing booking. `None` leaves a field untouched;
/// `special_requests: Some(None)` clears the note.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingPatch {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub party_size: Option<u32>,
    pub total_price: Option<Money>,
    pub status: Option<BookingStatus>,
    pub special_requests: Option<Option<String>>,
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        *self == BookingPatch::default()
    }

    /// Whether the patch moves or resizes the stay.
    pub fn changes_stay(&self) -> bool {
        self.check_in.is_some() || self.check_out.is_some() || self.party_size.is_some()
    }

    /// Checks the patch against the booking as currently stored. A status
    /// step must be legal from the stored status, and the stay of an
    /// inactive booking is frozen.
    pub fn check_against(&self, stored: &Booking) -> Result<(), RepositoryError> {
        if let Some(to) = self.status {
            if !BookingStatus::can_transition(stored.status, to) {
                return Err(RepositoryError::IllegalTransition {
                    from: stored.status,
                    to,
                });
            }
        }
        if self.changes_stay() && !stored.status.is_active() {
            return Err(RepositoryError::Inactive {
                id: stored.id.clone(),
                status: stored.status,
            });
        }
        Ok(())
    }

    pub fn apply(&self, booking: &mut Booking, now: NaiveDateTime) {
        if let Some(check_in) = self.check_in {
            booking.check_in = check_in;
        }
        if let Some(check_out) = self.check_out {
            booking.check_out = check_out;
        }
        if let Some(party_size) = self.party_size {
            booking.party_size = party_size;
        }
        if let Some(total_price) = self.total_price {
            booking.total_price = total_price;
        }
        if let Some(status) = self.status {
            booking.status = status;
        }
        if let Some(special_requests) = &self.special_requests {
            booking.special_requests = special_requests.clone();
        }
        booking.updated_at = now;
    }
}

/// Field updates for a guest. Outer `None` leaves a field untouched; inner
/// `None` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuestPatch {
    pub name: Option<String>,
    pub age: Option<Option<u32>>,
    pub phone: Option<Option<String>>,
    pub emergency_contact: Option<Option<String>>,
    pub emergency_phone: Option<Option<String>>,
    pub dietary_requirements: Option<Option<String>>,
    pub id_number: Option<Option<String>>,
}

impl GuestPatch {
    pub fn is_empty(&self) -> bool {
        *self == GuestPatch::default()
    }

    pub fn apply(&self, guest: &mut Guest) {
        if let Some(name) = &self.name {
            guest.name = name.clone();
        }
        if let Some(age) = self.age {
            guest.age = age;
        }
        if let Some(phone) = &self.phone {
            guest.phone = phone.clone();
        }
        if let Some(contact) = &self.emergency_contact {
            guest.emergency_contact = contact.clone();
        }
        if let Some(phone) = &self.emergency_phone {
            guest.emergency_phone = phone.clone();
        }
        if let Some(diet) = &self.dietary_requirements {
            guest.dietary_requirements = diet.clone();
        }
        if let Some(id_number) = &self.id_number {
            guest.id_number = id_number.clone();
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub package_id: Option<String>,
    pub user_id: Option<String>,
    /// Substring match on the confirmation code.
    pub confirmation_code: Option<String>,
    pub limit: Option<u32>,
}

impl BookingFilter {
    pub const DEFAULT_LIMIT: u32 = 50;

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map_or(true, |s| booking.status == s)
            && self.package_id.as_deref().map_or(true, |p| booking.package_id == p)
            && self.user_id.as_deref().map_or(true, |u| booking.user_id == u)
            && self
                .confirmation_code
                .as_deref()
                .map_or(true, |c| booking.confirmation_code.contains(c))
    }
}

#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Package>, RepositoryError>;

    async fn create(&self, package: &Package) -> Result<(), RepositoryError>;

    async fn list(&self, status: Option<PackageStatus>) -> Result<Vec<Package>, RepositoryError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, RepositoryError>;

    /// Bookings of `package_id` in one of `statuses` whose stay intersects
    /// `[check_in, check_out)`, ordered by check-in.
    async fn find_overlapping(
        &self,
        package_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        statuses: &[BookingStatus],
        exclude_id: Option<&str>,
    ) -> Result<Vec<Booking>, RepositoryError>;

    async fn find_by_confirmation_code(&self, code: &str) -> Result<Option<Booking>, RepositoryError>;

    /// Persists a booking and its guests atomically. Fails with
    /// [`RepositoryError::Overlap`] if an active booking of the same package
    /// already holds any night of the stay.
    async fn create(&self, booking: &Booking, guests: &[Guest]) -> Result<(), RepositoryError>;

    /// Applies `patch` to the stored booking and returns the result.
    ///
    /// The patch is checked with [`BookingPatch::check_against`] under the
    /// same lock as the write, and a result that is still active is
    /// overlap-checked against every other active booking of the package.
    async fn update(&self, id: &str, patch: &BookingPatch) -> Result<Booking, RepositoryError>;

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError>;

    async fn guests_for(&self, booking_id: &str) -> Result<Vec<Guest>, RepositoryError>;

    async fn find_guest(&self, id: &str) -> Result<Option<Guest>, RepositoryError>;

    /// Fails with [`RepositoryError::NotFound`] if the booking is gone.
    async fn add_guest(&self, guest: &Guest) -> Result<(), RepositoryError>;

    async fn update_guest(&self, id: &str, patch: &GuestPatch) -> Result<Guest, RepositoryError>;

    async fn delete_guest(&self, id: &str) -> Result<(), RepositoryError>;
}
