pub mod availability;
pub mod booking;
pub mod confirmation;
pub mod pricing;

use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::models::BookingStatus;
use crate::repository::RepositoryError;

pub use availability::{Availability, AvailabilityChecker, AvailabilityQuery, Rejection, UnavailableReason};
pub use booking::{
    AvailabilityRequest, BookingDetails, BookingRules, BookingService, CreateBookingRequest, GuestDetails,
    UpdateBookingRequest, UpdateGuestRequest,
};
pub use confirmation::{CodeSettings, CodeSource, ConfirmationCodes, RandomCodeSource};
pub use pricing::{compute_price, PriceBreakdown};

/// Source of "now" for date validation and timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// A clock pinned to one instant.
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Category of a [`BookingError`], used to pick the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    IllegalTransition,
    ExhaustedRetries,
    System,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("{}", .0.message)]
    Unavailable(Rejection),

    #[error("booking not found: {0}")]
    NotFound(String),

    #[error("guest not found: {0}")]
    GuestNotFound(String),

    #[error("cannot change booking status from {from} to {to}")]
    IllegalTransition { from: BookingStatus, to: BookingStatus },

    #[error("no unused confirmation code after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    #[error(transparent)]
    System(#[from] RepositoryError),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::Validation(_) => ErrorKind::Validation,
            BookingError::Unavailable(rejection) => rejection.reason.kind(),
            BookingError::NotFound(_) | BookingError::GuestNotFound(_) => ErrorKind::NotFound,
            BookingError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            BookingError::ExhaustedRetries { .. } => ErrorKind::ExhaustedRetries,
            BookingError::System(_) => ErrorKind::System,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BookingError::Validation(message.into())
    }
}
