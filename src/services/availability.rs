use std::sync::Arc;

use chrono::{Months, NaiveDate};
use serde::Serialize;

use super::pricing::{compute_price, PriceBreakdown};
use super::{BookingError, Clock, ErrorKind};
use crate::models::{BookingStatus, ConflictingBooking, PackageStatus, PackageSummary};
use crate::repository::{BookingRepository, PackageRepository, RepositoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnavailableReason {
    InvalidDates,
    PastDate,
    PackageNotFound,
    PackageUnavailable,
    CapacityExceeded,
    DateConflict,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::InvalidDates => "INVALID_DATES",
            UnavailableReason::PastDate => "PAST_DATE",
            UnavailableReason::PackageNotFound => "PACKAGE_NOT_FOUND",
            UnavailableReason::PackageUnavailable => "PACKAGE_UNAVAILABLE",
            UnavailableReason::CapacityExceeded => "CAPACITY_EXCEEDED",
            UnavailableReason::DateConflict => "DATE_CONFLICT",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            UnavailableReason::InvalidDates | UnavailableReason::PastDate => ErrorKind::Validation,
            UnavailableReason::PackageNotFound => ErrorKind::NotFound,
            UnavailableReason::PackageUnavailable
            | UnavailableReason::CapacityExceeded
            | UnavailableReason::DateConflict => ErrorKind::Conflict,
        }
    }
}

/// Why a stay was refused, in a form callers can render directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub reason: UnavailableReason,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ConflictingBooking>,
}

impl Rejection {
    pub fn new(reason: UnavailableReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            conflicts: vec![],
        }
    }

    pub fn invalid_dates() -> Self {
        Self::new(
            UnavailableReason::InvalidDates,
            "check-in date must be before check-out date",
        )
    }

    pub fn past_date() -> Self {
        Self::new(UnavailableReason::PastDate, "check-in date cannot be in the past")
    }

    pub fn package_not_found() -> Self {
        Self::new(UnavailableReason::PackageNotFound, "package not found")
    }

    pub fn package_unavailable() -> Self {
        Self::new(
            UnavailableReason::PackageUnavailable,
            "package is not currently open for booking",
        )
    }

    pub fn capacity_exceeded(capacity: u32) -> Self {
        Self::new(
            UnavailableReason::CapacityExceeded,
            format!("party size exceeds package capacity (max {capacity})"),
        )
    }

    pub fn date_conflict(conflicts: Vec<ConflictingBooking>) -> Self {
        Self {
            reason: UnavailableReason::DateConflict,
            message: "selected dates conflict with an existing booking".to_string(),
            conflicts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableStay {
    pub package: PackageSummary,
    pub days: u32,
    pub price: PriceBreakdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    Available(AvailableStay),
    Unavailable(Rejection),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    pub fn into_result(self) -> Result<AvailableStay, Rejection> {
        match self {
            Availability::Available(stay) => Ok(stay),
            Availability::Unavailable(rejection) => Err(rejection),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AvailabilityQuery {
    pub package_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub party_size: u32,
    /// Booking being edited; its own nights never conflict with it.
    pub exclude_booking_id: Option<String>,
}

/// An existing stay shown on the occupancy calendar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookedStay {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occupancy {
    pub package_id: String,
    pub package_name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub occupied_dates: Vec<NaiveDate>,
    pub available_dates: Vec<NaiveDate>,
    pub bookings: Vec<BookedStay>,
}

pub struct AvailabilityChecker {
    packages: Arc<dyn PackageRepository>,
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityChecker {
    pub const DEFAULT_CALENDAR_MONTHS: u32 = 3;
    pub const MAX_CALENDAR_MONTHS: u32 = 12;

    pub fn new(
        packages: Arc<dyn PackageRepository>,
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            packages,
            bookings,
            clock,
        }
    }

    /// Decides whether `query` can be booked. Checks run in a fixed order and
    /// stop at the first failure; only storage faults surface as `Err`.
    pub async fn check(&self, query: &AvailabilityQuery) -> Result<Availability, RepositoryError> {
        if query.check_in >= query.check_out {
            return Ok(Availability::Unavailable(Rejection::invalid_dates()));
        }

        if query.check_in < self.clock.today() {
            return Ok(Availability::Unavailable(Rejection::past_date()));
        }

        let Some(package) = self.packages.find_by_id(&query.package_id).await? else {
            return Ok(Availability::Unavailable(Rejection::package_not_found()));
        };

        if package.status != PackageStatus::Active {
            return Ok(Availability::Unavailable(Rejection::package_unavailable()));
        }

        if query.party_size > package.capacity {
            return Ok(Availability::Unavailable(Rejection::capacity_exceeded(
                package.capacity,
            )));
        }

        let overlapping = self
            .bookings
            .find_overlapping(
                &package.id,
                query.check_in,
                query.check_out,
                &BookingStatus::ACTIVE,
                query.exclude_booking_id.as_deref(),
            )
            .await?;

        if !overlapping.is_empty() {
            tracing::debug!(
                package_id = %package.id,
                conflicts = overlapping.len(),
                "requested stay overlaps existing bookings"
            );
            let conflicts = overlapping.iter().map(ConflictingBooking::from).collect();
            return Ok(Availability::Unavailable(Rejection::date_conflict(conflicts)));
        }

        let days = (query.check_out - query.check_in).num_days() as u32;
        let price = compute_price(package.price, days, query.party_size, package.capacity);

        Ok(Availability::Available(AvailableStay {
            package: PackageSummary::from(&package),
            days,
            price,
        }))
    }

    /// Day-by-day occupancy of a package from today through `months` ahead.
    pub async fn occupancy(&self, package_id: &str, months: Option<u32>) -> Result<Occupancy, BookingError> {
        let months = months
            .unwrap_or(Self::DEFAULT_CALENDAR_MONTHS)
            .clamp(1, Self::MAX_CALENDAR_MONTHS);

        let package = self
            .packages
            .find_by_id(package_id)
            .await?
            .ok_or_else(|| BookingError::Unavailable(Rejection::package_not_found()))?;

        if package.status != PackageStatus::Active {
            return Err(BookingError::Unavailable(Rejection::package_unavailable()));
        }

        let start = self.clock.today();
        let end = start
            .checked_add_months(Months::new(months))
            .ok_or_else(|| BookingError::validation("calendar range out of bounds"))?;
        let after_end = end
            .succ_opt()
            .ok_or_else(|| BookingError::validation("calendar range out of bounds"))?;

        let bookings = self
            .bookings
            .find_overlapping(&package.id, start, after_end, &BookingStatus::ACTIVE, None)
            .await?;

        let mut occupied_dates = vec![];
        let mut available_dates = vec![];
        for day in start.iter_days().take_while(|day| *day <= end) {
            if bookings.iter().any(|b| b.check_in <= day && day < b.check_out) {
                occupied_dates.push(day);
            } else {
                available_dates.push(day);
            }
        }

        Ok(Occupancy {
            package_id: package.id,
            package_name: package.name,
            start,
            end,
            occupied_dates,
            available_dates,
            bookings: bookings
                .iter()
                .map(|b| BookedStay {
                    check_in: b.check_in,
                    check_out: b.check_out,
                    status: b.status,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDateTime;

    use super::*;
    use crate::models::{Booking, Guest, Money, Package, PackageStatus};
    use crate::repository::{BookingFilter, BookingPatch, GuestPatch, InMemoryRepository};
    use crate::services::FixedClock;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-08-01 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn package(id: &str, status: PackageStatus) -> Package {
        Package {
            id: id.to_string(),
            name: "Lakeside".to_string(),
            description: None,
            price: Money::from_minor(10000),
            capacity: 6,
            duration: 2,
            status,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn booking(id: &str, check_in: &str, check_out: &str, status: BookingStatus) -> Booking {
        Booking {
            id: id.to_string(),
            package_id: "pkg-1".to_string(),
            user_id: "user-1".to_string(),
            check_in: d(check_in),
            check_out: d(check_out),
            party_size: 2,
            total_price: Money::from_minor(20000),
            status,
            confirmation_code: format!("CAMP-2025-{id}"),
            special_requests: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    async fn checker_with(bookings: Vec<Booking>) -> AvailabilityChecker {
        let repo = Arc::new(InMemoryRepository::new());
        PackageRepository::create(repo.as_ref(), &package("pkg-1", PackageStatus::Active))
            .await
            .unwrap();
        PackageRepository::create(repo.as_ref(), &package("pkg-draft", PackageStatus::Draft))
            .await
            .unwrap();
        for b in bookings {
            BookingRepository::create(repo.as_ref(), &b, &[]).await.unwrap();
        }
        AvailabilityChecker::new(repo.clone(), repo, Arc::new(FixedClock(now())))
    }

    fn query(check_in: &str, check_out: &str, party_size: u32) -> AvailabilityQuery {
        AvailabilityQuery {
            package_id: "pkg-1".to_string(),
            check_in: d(check_in),
            check_out: d(check_out),
            party_size,
            exclude_booking_id: None,
        }
    }

    fn reason(availability: Availability) -> UnavailableReason {
        match availability {
            Availability::Unavailable(rejection) => rejection.reason,
            Availability::Available(stay) => panic!("expected rejection, got {stay:?}"),
        }
    }

    /// Fails every call, proving a code path never reached storage.
    struct BrokenRepository;

    fn broken() -> RepositoryError {
        RepositoryError::Storage(anyhow::anyhow!("storage offline"))
    }

    #[async_trait]
    impl PackageRepository for BrokenRepository {
        async fn find_by_id(&self, _id: &str) -> Result<Option<Package>, RepositoryError> {
            Err(broken())
        }
        async fn create(&self, _package: &Package) -> Result<(), RepositoryError> {
            Err(broken())
        }
        async fn list(&self, _status: Option<PackageStatus>) -> Result<Vec<Package>, RepositoryError> {
            Err(broken())
        }
    }

    #[async_trait]
    impl BookingRepository for BrokenRepository {
        async fn find_by_id(&self, _id: &str) -> Result<Option<Booking>, RepositoryError> {
            Err(broken())
        }
        async fn find_overlapping(
            &self,
            _package_id: &str,
            _check_in: NaiveDate,
            _check_out: NaiveDate,
            _statuses: &[BookingStatus],
            _exclude_id: Option<&str>,
        ) -> Result<Vec<Booking>, RepositoryError> {
            Err(broken())
        }
        async fn find_by_confirmation_code(&self, _code: &str) -> Result<Option<Booking>, RepositoryError> {
            Err(broken())
        }
        async fn create(&self, _booking: &Booking, _guests: &[Guest]) -> Result<(), RepositoryError> {
            Err(broken())
        }
        async fn update(&self, _id: &str, _patch: &BookingPatch) -> Result<Booking, RepositoryError> {
            Err(broken())
        }
        async fn list(&self, _filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError> {
            Err(broken())
        }
        async fn guests_for(&self, _booking_id: &str) -> Result<Vec<Guest>, RepositoryError> {
            Err(broken())
        }
        async fn find_guest(&self, _id: &str) -> Result<Option<Guest>, RepositoryError> {
            Err(broken())
        }
        async fn add_guest(&self, _guest: &Guest) -> Result<(), RepositoryError> {
            Err(broken())
        }
        async fn update_guest(&self, _id: &str, _patch: &GuestPatch) -> Result<Guest, RepositoryError> {
            Err(broken())
        }
        async fn delete_guest(&self, _id: &str) -> Result<(), RepositoryError> {
            Err(broken())
        }
    }

    #[tokio::test]
    async fn test_invalid_dates_checked_before_storage() {
        let repo = Arc::new(BrokenRepository);
        let checker = AvailabilityChecker::new(repo.clone(), repo, Arc::new(FixedClock(now())));

        let same_day = checker.check(&query("2025-09-10", "2025-09-10", 2)).await.unwrap();
        assert_eq!(reason(same_day), UnavailableReason::InvalidDates);

        let reversed = checker.check(&query("2025-09-12", "2025-09-10", 2)).await.unwrap();
        assert_eq!(reason(reversed), UnavailableReason::InvalidDates);
    }

    #[tokio::test]
    async fn test_storage_fault_propagates() {
        let repo = Arc::new(BrokenRepository);
        let checker = AvailabilityChecker::new(repo.clone(), repo, Arc::new(FixedClock(now())));
        let result = checker.check(&query("2025-09-10", "2025-09-12", 2)).await;
        assert!(matches!(result, Err(RepositoryError::Storage(_))));
    }

    #[tokio::test]
    async fn test_past_check_in_rejected() {
        let checker = checker_with(vec![]).await;
        let result = checker.check(&query("2025-07-31", "2025-08-02", 2)).await.unwrap();
        assert_eq!(reason(result), UnavailableReason::PastDate);

        // Arriving today is allowed.
        let today = checker.check(&query("2025-08-01", "2025-08-02", 2)).await.unwrap();
        assert!(today.is_available());
    }

    #[tokio::test]
    async fn test_missing_package_regardless_of_dates() {
        let checker = checker_with(vec![]).await;
        for (check_in, check_out) in [("2025-09-10", "2025-09-12"), ("2026-01-01", "2026-03-01")] {
            let mut q = query(check_in, check_out, 2);
            q.package_id = "nope".to_string();
            assert_eq!(reason(checker.check(&q).await.unwrap()), UnavailableReason::PackageNotFound);
        }
    }

    #[tokio::test]
    async fn test_inactive_package_unavailable() {
        let checker = checker_with(vec![]).await;
        let mut q = query("2025-09-10", "2025-09-12", 2);
        q.package_id = "pkg-draft".to_string();
        assert_eq!(reason(checker.check(&q).await.unwrap()), UnavailableReason::PackageUnavailable);
    }

    #[tokio::test]
    async fn test_capacity_exceeded() {
        let checker = checker_with(vec![]).await;
        let result = checker.check(&query("2025-09-10", "2025-09-12", 7)).await.unwrap();
        match result {
            Availability::Unavailable(rejection) => {
                assert_eq!(rejection.reason, UnavailableReason::CapacityExceeded);
                assert!(rejection.message.contains("max 6"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_conflict_lists_active_overlaps() {
        let checker = checker_with(vec![booking("a", "2025-09-10", "2025-09-12", BookingStatus::Confirmed)]).await;

        let result = checker.check(&query("2025-09-11", "2025-09-13", 3)).await.unwrap();
        match result {
            Availability::Unavailable(rejection) => {
                assert_eq!(rejection.reason, UnavailableReason::DateConflict);
                assert_eq!(rejection.conflicts.len(), 1);
                let conflict = &rejection.conflicts[0];
                assert_eq!(conflict.id, "a");
                assert_eq!(conflict.check_in, d("2025-09-10"));
                assert_eq!(conflict.check_out, d("2025-09-12"));
                assert_eq!(conflict.confirmation_code, "CAMP-2025-a");
                assert_eq!(conflict.status, BookingStatus::Confirmed);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_booking_does_not_block() {
        let checker = checker_with(vec![booking("a", "2025-09-10", "2025-09-12", BookingStatus::Cancelled)]).await;
        let result = checker.check(&query("2025-09-11", "2025-09-13", 3)).await.unwrap();
        assert!(result.is_available());
    }

    #[tokio::test]
    async fn test_back_to_back_is_available() {
        let checker = checker_with(vec![booking("a", "2025-09-01", "2025-09-03", BookingStatus::Confirmed)]).await;
        assert!(checker.check(&query("2025-09-03", "2025-09-05", 2)).await.unwrap().is_available());
        assert!(!checker.check(&query("2025-09-02", "2025-09-04", 2)).await.unwrap().is_available());
    }

    #[tokio::test]
    async fn test_excluded_booking_ignored() {
        let checker = checker_with(vec![booking("a", "2025-09-10", "2025-09-12", BookingStatus::Pending)]).await;
        let mut q = query("2025-09-11", "2025-09-13", 2);
        q.exclude_booking_id = Some("a".to_string());
        assert!(checker.check(&q).await.unwrap().is_available());
    }

    #[tokio::test]
    async fn test_available_carries_price() {
        let checker = checker_with(vec![]).await;
        let stay = checker
            .check(&query("2025-09-10", "2025-09-12", 6))
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(stay.days, 2);
        assert_eq!(stay.package.id, "pkg-1");
        assert_eq!(stay.package.capacity, 6);
        assert_eq!(stay.price.base, Money::from_minor(20000));
        assert_eq!(stay.price.surcharge, Money::from_minor(4000));
        assert_eq!(stay.price.total, Money::from_minor(24000));
    }

    #[tokio::test]
    async fn test_occupancy_marks_booked_nights() {
        let checker = checker_with(vec![
            booking("a", "2025-08-03", "2025-08-05", BookingStatus::Confirmed),
            booking("b", "2025-08-10", "2025-08-11", BookingStatus::Cancelled),
        ])
        .await;

        let occupancy = checker.occupancy("pkg-1", Some(1)).await.unwrap();
        assert_eq!(occupancy.start, d("2025-08-01"));
        assert_eq!(occupancy.end, d("2025-09-01"));
        assert_eq!(occupancy.occupied_dates, vec![d("2025-08-03"), d("2025-08-04")]);
        assert!(occupancy.available_dates.contains(&d("2025-08-05")));
        assert!(occupancy.available_dates.contains(&d("2025-08-10")));
        assert_eq!(occupancy.occupied_dates.len() + occupancy.available_dates.len(), 32);
        assert_eq!(occupancy.bookings.len(), 1);
    }

    #[tokio::test]
    async fn test_occupancy_requires_active_package() {
        let checker = checker_with(vec![]).await;
        let missing = checker.occupancy("nope", None).await.unwrap_err();
        assert!(matches!(missing, BookingError::Unavailable(r) if r.reason == UnavailableReason::PackageNotFound));

        let draft = checker.occupancy("pkg-draft", None).await.unwrap_err();
        assert!(matches!(draft, BookingError::Unavailable(r) if r.reason == UnavailableReason::PackageUnavailable));
    }
}
