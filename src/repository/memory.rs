use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::{BookingFilter, BookingPatch, BookingRepository, GuestPatch, PackageRepository, RepositoryError};
use crate::models::{Booking, BookingStatus, ConflictingBooking, Guest, Package, PackageStatus};

#[derive(Default)]
struct Store {
    packages: HashMap<String, Package>,
    bookings: Vec<Booking>,
    guests: Vec<Guest>,
}

impl Store {
    fn active_conflicts(&self, candidate: &Booking, exclude_id: Option<&str>) -> Vec<ConflictingBooking> {
        self.bookings
            .iter()
            .filter(|b| b.package_id == candidate.package_id)
            .filter(|b| Some(b.id.as_str()) != exclude_id)
            .filter(|b| b.status.is_active())
            .filter(|b| b.overlaps(candidate.check_in, candidate.check_out))
            .map(ConflictingBooking::from)
            .collect()
    }
}

/// Mutex-guarded in-process store with the same write guarantees as the
/// SQLite repository: status steps are checked against the stored row and
/// every write that leaves a booking active is overlap-checked, all under
/// one lock.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Storage(anyhow::anyhow!("store lock poisoned")))
    }
}

#[async_trait]
impl PackageRepository for InMemoryRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Package>, RepositoryError> {
        Ok(self.store()?.packages.get(id).cloned())
    }

    async fn create(&self, package: &Package) -> Result<(), RepositoryError> {
        self.store()?
            .packages
            .insert(package.id.clone(), package.clone());
        Ok(())
    }

    async fn list(&self, status: Option<PackageStatus>) -> Result<Vec<Package>, RepositoryError> {
        let store = self.store()?;
        let mut packages: Vec<Package> = store
            .packages
            .values()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        packages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(packages)
    }
}

#[async_trait]
impl BookingRepository for InMemoryRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.store()?.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn find_overlapping(
        &self,
        package_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        statuses: &[BookingStatus],
        exclude_id: Option<&str>,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let store = self.store()?;
        let mut hits: Vec<Booking> = store
            .bookings
            .iter()
            .filter(|b| b.package_id == package_id)
            .filter(|b| statuses.contains(&b.status))
            .filter(|b| Some(b.id.as_str()) != exclude_id)
            .filter(|b| b.overlaps(check_in, check_out))
            .cloned()
            .collect();
        hits.sort_by_key(|b| b.check_in);
        Ok(hits)
    }

    async fn find_by_confirmation_code(&self, code: &str) -> Result<Option<Booking>, RepositoryError> {
        Ok(self
            .store()?
            .bookings
            .iter()
            .find(|b| b.confirmation_code == code)
            .cloned())
    }

    async fn create(&self, booking: &Booking, guests: &[Guest]) -> Result<(), RepositoryError> {
        let mut store = self.store()?;

        if store.bookings.iter().any(|b| b.confirmation_code == booking.confirmation_code) {
            return Err(RepositoryError::DuplicateCode(booking.confirmation_code.clone()));
        }
        if booking.status.is_active() {
            let conflicts = store.active_conflicts(booking, None);
            if !conflicts.is_empty() {
                return Err(RepositoryError::Overlap(conflicts));
            }
        }

        store.bookings.push(booking.clone());
        store.guests.extend(guests.iter().cloned());
        Ok(())
    }

    async fn update(&self, id: &str, patch: &BookingPatch) -> Result<Booking, RepositoryError> {
        let mut store = self.store()?;

        let index = store
            .bookings
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        let mut updated = store.bookings[index].clone();
        patch.check_against(&updated)?;
        patch.apply(&mut updated, Utc::now().naive_utc());

        if updated.status.is_active() {
            let conflicts = store.active_conflicts(&updated, Some(id));
            if !conflicts.is_empty() {
                return Err(RepositoryError::Overlap(conflicts));
            }
        }

        store.bookings[index] = updated.clone();
        Ok(updated)
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError> {
        let store = self.store()?;
        let mut bookings: Vec<Booking> = store
            .bookings
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings.truncate(filter.limit() as usize);
        Ok(bookings)
    }

    async fn guests_for(&self, booking_id: &str) -> Result<Vec<Guest>, RepositoryError> {
        Ok(self
            .store()?
            .guests
            .iter()
            .filter(|g| g.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn find_guest(&self, id: &str) -> Result<Option<Guest>, RepositoryError> {
        Ok(self.store()?.guests.iter().find(|g| g.id == id).cloned())
    }

    async fn add_guest(&self, guest: &Guest) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        if !store.bookings.iter().any(|b| b.id == guest.booking_id) {
            return Err(RepositoryError::NotFound(guest.booking_id.clone()));
        }
        store.guests.push(guest.clone());
        Ok(())
    }

    async fn update_guest(&self, id: &str, patch: &GuestPatch) -> Result<Guest, RepositoryError> {
        let mut store = self.store()?;
        let guest = store
            .guests
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| RepositoryError::GuestNotFound(id.to_string()))?;
        patch.apply(guest);
        Ok(guest.clone())
    }

    async fn delete_guest(&self, id: &str) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        let before = store.guests.len();
        store.guests.retain(|g| g.id != id);
        if store.guests.len() == before {
            return Err(RepositoryError::GuestNotFound(id.to_string()));
        }
        Ok(())
    }
}
