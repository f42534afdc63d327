use std::sync::MutexGuard;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, ErrorCode, TransactionBehavior};

use super::{BookingFilter, BookingPatch, BookingRepository, GuestPatch, PackageRepository, RepositoryError};
use crate::db::{queries, SharedConnection};
use crate::models::{Booking, BookingStatus, ConflictingBooking, Guest, Package, PackageStatus};

/// Repository over the shared SQLite connection.
///
/// Writes run inside `BEGIN IMMEDIATE` while the connection mutex is held,
/// and repeat the overlap query before touching the row, so the check and
/// the write are one serialized step. The `booking_overlap` triggers catch
/// anything that reaches the table some other way.
#[derive(Clone)]
pub struct SqliteRepository {
    db: SharedConnection,
}

impl SqliteRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.db
            .lock()
            .map_err(|_| RepositoryError::Storage(anyhow::anyhow!("database lock poisoned")))
    }
}

/// Overlap among active bookings of the package, excluding `exclude_id`.
fn active_conflicts(
    conn: &Connection,
    booking: &Booking,
    exclude_id: Option<&str>,
) -> Result<Vec<ConflictingBooking>, RepositoryError> {
    let overlapping = queries::find_overlapping(
        conn,
        &booking.package_id,
        booking.check_in,
        booking.check_out,
        &BookingStatus::ACTIVE,
        exclude_id,
    )?;
    Ok(overlapping.iter().map(ConflictingBooking::from).collect())
}

/// Maps constraint failures raised by SQLite onto typed errors.
fn translate_write_error(err: anyhow::Error, booking: &Booking) -> RepositoryError {
    if let Some(rusqlite::Error::SqliteFailure(code, Some(message))) =
        err.downcast_ref::<rusqlite::Error>()
    {
        if code.code == ErrorCode::ConstraintViolation {
            if message.contains("booking_overlap") {
                return RepositoryError::Overlap(Vec::new());
            }
            if message.contains("confirmation_code") {
                return RepositoryError::DuplicateCode(booking.confirmation_code.clone());
            }
        }
    }
    RepositoryError::Storage(err)
}

#[async_trait]
impl PackageRepository for SqliteRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Package>, RepositoryError> {
        let conn = self.conn()?;
        Ok(queries::get_package(&conn, id)?)
    }

    async fn create(&self, package: &Package) -> Result<(), RepositoryError> {
        let conn = self.conn()?;
        queries::insert_package(&conn, package)?;
        Ok(())
    }

    async fn list(&self, status: Option<PackageStatus>) -> Result<Vec<Package>, RepositoryError> {
        let conn = self.conn()?;
        Ok(queries::list_packages(&conn, status)?)
    }
}

#[async_trait]
impl BookingRepository for SqliteRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, RepositoryError> {
        let conn = self.conn()?;
        Ok(queries::get_booking_by_id(&conn, id)?)
    }

    async fn find_overlapping(
        &self,
        package_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        statuses: &[BookingStatus],
        exclude_id: Option<&str>,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let conn = self.conn()?;
        Ok(queries::find_overlapping(
            &conn, package_id, check_in, check_out, statuses, exclude_id,
        )?)
    }

    async fn find_by_confirmation_code(&self, code: &str) -> Result<Option<Booking>, RepositoryError> {
        let conn = self.conn()?;
        Ok(queries::get_booking_by_code(&conn, code)?)
    }

    async fn create(&self, booking: &Booking, guests: &[Guest]) -> Result<(), RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if booking.status.is_active() {
            let conflicts = active_conflicts(&tx, booking, None)?;
            if !conflicts.is_empty() {
                return Err(RepositoryError::Overlap(conflicts));
            }
        }

        queries::insert_booking(&tx, booking).map_err(|e| translate_write_error(e, booking))?;
        for guest in guests {
            queries::insert_guest(&tx, guest)?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn update(&self, id: &str, patch: &BookingPatch) -> Result<Booking, RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut booking = queries::get_booking_by_id(&tx, id)?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        patch.check_against(&booking)?;
        patch.apply(&mut booking, Utc::now().naive_utc());

        if booking.status.is_active() {
            let conflicts = active_conflicts(&tx, &booking, Some(id))?;
            if !conflicts.is_empty() {
                return Err(RepositoryError::Overlap(conflicts));
            }
        }

        queries::save_booking(&tx, &booking).map_err(|e| translate_write_error(e, &booking))?;
        tx.commit()?;
        Ok(booking)
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError> {
        let conn = self.conn()?;
        Ok(queries::list_bookings(&conn, filter)?)
    }

    async fn guests_for(&self, booking_id: &str) -> Result<Vec<Guest>, RepositoryError> {
        let conn = self.conn()?;
        Ok(queries::get_guests_for_booking(&conn, booking_id)?)
    }

    async fn find_guest(&self, id: &str) -> Result<Option<Guest>, RepositoryError> {
        let conn = self.conn()?;
        Ok(queries::get_guest(&conn, id)?)
    }

    async fn add_guest(&self, guest: &Guest) -> Result<(), RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if queries::get_booking_by_id(&tx, &guest.booking_id)?.is_none() {
            return Err(RepositoryError::NotFound(guest.booking_id.clone()));
        }
        queries::insert_guest(&tx, guest)?;

        tx.commit()?;
        Ok(())
    }

    async fn update_guest(&self, id: &str, patch: &GuestPatch) -> Result<Guest, RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut guest =
            queries::get_guest(&tx, id)?.ok_or_else(|| RepositoryError::GuestNotFound(id.to_string()))?;
        patch.apply(&mut guest);
        queries::save_guest(&tx, &guest)?;

        tx.commit()?;
        Ok(guest)
    }

    async fn delete_guest(&self, id: &str) -> Result<(), RepositoryError> {
        let conn = self.conn()?;
        if !queries::delete_guest(&conn, id)? {
            return Err(RepositoryError::GuestNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Money, PackageStatus};
    use chrono::NaiveDateTime;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-08-01 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    async fn setup() -> SqliteRepository {
        let repo = SqliteRepository::new(db::init_shared(":memory:").unwrap());
        PackageRepository::create(
            &repo,
            &Package {
                id: "pkg-1".to_string(),
                name: "Lakeside".to_string(),
                description: None,
                price: Money::from_minor(10000),
                capacity: 6,
                duration: 2,
                status: PackageStatus::Active,
                created_at: now(),
                updated_at: now(),
            },
        )
        .await
        .unwrap();
        repo
    }

    fn booking(id: &str, code: &str, check_in: &str, check_out: &str) -> Booking {
        Booking {
            id: id.to_string(),
            package_id: "pkg-1".to_string(),
            user_id: "user-1".to_string(),
            check_in: d(check_in),
            check_out: d(check_out),
            party_size: 2,
            total_price: Money::from_minor(20000),
            status: BookingStatus::Pending,
            confirmation_code: code.to_string(),
            special_requests: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_overlap_with_conflicts() {
        let repo = setup().await;
        BookingRepository::create(&repo, &booking("a", "CAMP-2025-0001", "2025-09-10", "2025-09-12"), &[])
            .await
            .unwrap();

        let err = BookingRepository::create(&repo, &booking("b", "CAMP-2025-0002", "2025-09-11", "2025-09-13"), &[])
            .await
            .unwrap_err();
        match err {
            RepositoryError::Overlap(conflicts) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].id, "a");
                assert_eq!(conflicts[0].confirmation_code, "CAMP-2025-0001");
            }
            other => panic!("expected overlap, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_translates_duplicate_code() {
        let repo = setup().await;
        BookingRepository::create(&repo, &booking("a", "CAMP-2025-0001", "2025-09-10", "2025-09-12"), &[])
            .await
            .unwrap();

        let err = BookingRepository::create(&repo, &booking("b", "CAMP-2025-0001", "2025-10-10", "2025-10-12"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateCode(code) if code == "CAMP-2025-0001"));
    }

    #[tokio::test]
    async fn test_update_moves_stay_and_checks_overlap() {
        let repo = setup().await;
        BookingRepository::create(&repo, &booking("a", "CAMP-2025-0001", "2025-09-10", "2025-09-12"), &[])
            .await
            .unwrap();
        BookingRepository::create(&repo, &booking("b", "CAMP-2025-0002", "2025-09-20", "2025-09-22"), &[])
            .await
            .unwrap();

        // Moving b onto a's nights collides.
        let clash = BookingPatch {
            check_in: Some(d("2025-09-11")),
            check_out: Some(d("2025-09-13")),
            ..Default::default()
        };
        assert!(matches!(
            repo.update("b", &clash).await,
            Err(RepositoryError::Overlap(_))
        ));

        // Shifting a within its own range does not collide with itself.
        let shift = BookingPatch {
            check_out: Some(d("2025-09-13")),
            ..Default::default()
        };
        let updated = repo.update("a", &shift).await.unwrap();
        assert_eq!(updated.check_out, d("2025-09-13"));

        let stored = BookingRepository::find_by_id(&repo, "a").await.unwrap().unwrap();
        assert_eq!(stored.check_out, d("2025-09-13"));
    }

    #[tokio::test]
    async fn test_update_checks_stored_status() {
        let repo = setup().await;
        BookingRepository::create(&repo, &booking("a", "CAMP-2025-0001", "2025-09-10", "2025-09-12"), &[])
            .await
            .unwrap();

        let cancel = BookingPatch {
            status: Some(BookingStatus::Cancelled),
            ..Default::default()
        };
        repo.update("a", &cancel).await.unwrap();

        // A confirm decided on the earlier PENDING read must not land.
        let confirm = BookingPatch {
            status: Some(BookingStatus::Confirmed),
            ..Default::default()
        };
        let err = repo.update("a", &confirm).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::IllegalTransition {
                from: BookingStatus::Cancelled,
                to: BookingStatus::Confirmed
            }
        ));

        let move_stay = BookingPatch {
            check_in: Some(d("2025-09-11")),
            ..Default::default()
        };
        assert!(matches!(
            repo.update("a", &move_stay).await,
            Err(RepositoryError::Inactive { status: BookingStatus::Cancelled, .. })
        ));

        let stored = BookingRepository::find_by_id(&repo, "a").await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(stored.check_in, d("2025-09-10"));
    }

    #[tokio::test]
    async fn test_overlap_trigger_maps_to_overlap() {
        let repo = setup().await;
        BookingRepository::create(&repo, &booking("a", "CAMP-2025-0001", "2025-09-10", "2025-09-12"), &[])
            .await
            .unwrap();

        // Straight to the table, skipping the repository's own re-check.
        let intruder = booking("b", "CAMP-2025-0002", "2025-09-11", "2025-09-13");
        let err = {
            let mut conn = repo.db.lock().unwrap();
            let tx = conn.transaction().unwrap();
            queries::insert_booking(&tx, &intruder).unwrap_err()
        };
        assert!(matches!(
            translate_write_error(err, &intruder),
            RepositoryError::Overlap(conflicts) if conflicts.is_empty()
        ));

        let duplicate = booking("c", "CAMP-2025-0001", "2025-10-10", "2025-10-12");
        let err = {
            let conn = repo.db.lock().unwrap();
            queries::insert_booking(&conn, &duplicate).unwrap_err()
        };
        assert!(matches!(
            translate_write_error(err, &duplicate),
            RepositoryError::DuplicateCode(code) if code == "CAMP-2025-0001"
        ));

        // Cancelled rows are outside the guard.
        let mut cancelled = booking("d", "CAMP-2025-0004", "2025-09-10", "2025-09-12");
        cancelled.status = BookingStatus::Cancelled;
        let conn = repo.db.lock().unwrap();
        queries::insert_booking(&conn, &cancelled).unwrap();
    }

    #[tokio::test]
    async fn test_guest_edits() {
        let repo = setup().await;
        BookingRepository::create(&repo, &booking("a", "CAMP-2025-0001", "2025-09-10", "2025-09-12"), &[])
            .await
            .unwrap();

        let guest = Guest {
            id: "g-1".to_string(),
            booking_id: "a".to_string(),
            name: "Li Wei".to_string(),
            age: Some(34),
            phone: None,
            emergency_contact: None,
            emergency_phone: None,
            dietary_requirements: None,
            id_number: None,
            created_at: now(),
        };
        repo.add_guest(&guest).await.unwrap();

        let mut orphan = guest.clone();
        orphan.id = "g-2".to_string();
        orphan.booking_id = "missing".to_string();
        assert!(matches!(repo.add_guest(&orphan).await, Err(RepositoryError::NotFound(_))));

        let patch = GuestPatch {
            name: Some("Li Wei Jr".to_string()),
            age: Some(None),
            ..Default::default()
        };
        let updated = repo.update_guest("g-1", &patch).await.unwrap();
        assert_eq!(updated.name, "Li Wei Jr");
        assert_eq!(updated.age, None);
        assert_eq!(repo.find_guest("g-1").await.unwrap().unwrap().name, "Li Wei Jr");

        repo.delete_guest("g-1").await.unwrap();
        assert!(matches!(
            repo.delete_guest("g-1").await,
            Err(RepositoryError::GuestNotFound(_))
        ));
        assert!(matches!(
            repo.update_guest("g-1", &patch).await,
            Err(RepositoryError::GuestNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_booking() {
        let repo = setup().await;
        let patch = BookingPatch {
            status: Some(BookingStatus::Confirmed),
            ..Default::default()
        };
        assert!(matches!(
            repo.update("nope", &patch).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
