use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub package_id: String,
    pub user_id: String,
    pub check_in: NaiveDate,
    /// Exclusive: the party leaves on this day and it is free for the next arrival.
    pub check_out: NaiveDate,
    pub party_size: u32,
    pub total_price: Money,
    pub status: BookingStatus,
    pub confirmation_code: String,
    pub special_requests: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        ranges_overlap(self.check_in, self.check_out, check_in, check_out)
    }
}

/// Half-open interval intersection: `[a_start, a_end)` and `[b_start, b_end)`
/// overlap iff each starts before the other ends. A check-out and a check-in
/// on the same day do not collide.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && b_start < a_end
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    /// Statuses that hold the package for their date range.
    pub const ACTIVE: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::CheckedIn,
    ];

    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::CheckedIn,
        BookingStatus::CheckedOut,
        BookingStatus::Cancelled,
        BookingStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::CheckedIn => "CHECKED_IN",
            BookingStatus::CheckedOut => "CHECKED_OUT",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        BookingStatus::ALL.into_iter().find(|status| status.as_str() == s)
    }

    pub fn is_active(&self) -> bool {
        BookingStatus::ACTIVE.contains(self)
    }

    /// Statuses reachable from `self` in a single step.
    pub fn next_statuses(&self) -> &'static [BookingStatus] {
        match self {
            BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
            BookingStatus::Confirmed => &[BookingStatus::CheckedIn, BookingStatus::Cancelled],
            BookingStatus::CheckedIn => &[BookingStatus::CheckedOut],
            BookingStatus::CheckedOut => &[BookingStatus::Refunded],
            BookingStatus::Cancelled => &[BookingStatus::Refunded],
            BookingStatus::Refunded => &[],
        }
    }

    pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
        from.next_statuses().contains(&to)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic view of an existing booking that blocks a requested stay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictingBooking {
    pub id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub confirmation_code: String,
    pub status: BookingStatus,
}

impl From<&Booking> for ConflictingBooking {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id.clone(),
            check_in: booking.check_in,
            check_out: booking.check_out,
            confirmation_code: booking.confirmation_code.clone(),
            status: booking.status,
        }
    }
}
