use std::sync::Arc;

use chrono::Datelike;
use rand::Rng;

use super::{BookingError, Clock};
use crate::repository::BookingRepository;

#[derive(Debug, Clone)]
pub struct CodeSettings {
    pub prefix: String,
    /// Width of the random suffix; the code space per year is `10^digits`.
    pub digits: u32,
    pub max_attempts: u32,
}

impl Default for CodeSettings {
    fn default() -> Self {
        Self {
            prefix: "CAMP".to_string(),
            digits: 4,
            max_attempts: 10,
        }
    }
}

/// Produces candidate confirmation codes. Uniqueness is not its concern.
pub trait CodeSource: Send + Sync {
    fn candidate(&self, prefix: &str, year: i32, digits: u32) -> String;
}

pub struct RandomCodeSource;

impl CodeSource for RandomCodeSource {
    fn candidate(&self, prefix: &str, year: i32, digits: u32) -> String {
        let upper = 10u64.pow(digits);
        let n = rand::rng().random_range(0..upper);
        format!("{prefix}-{year}-{n:0width$}", width = digits as usize)
    }
}

/// Issues confirmation codes not yet held by any booking.
pub struct ConfirmationCodes {
    bookings: Arc<dyn BookingRepository>,
    source: Arc<dyn CodeSource>,
    clock: Arc<dyn Clock>,
    settings: CodeSettings,
}

impl ConfirmationCodes {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        source: Arc<dyn CodeSource>,
        clock: Arc<dyn Clock>,
        settings: CodeSettings,
    ) -> Self {
        Self {
            bookings,
            source,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &CodeSettings {
        &self.settings
    }

    pub async fn generate_unique_code(&self) -> Result<String, BookingError> {
        let year = self.clock.now().year();

        for attempt in 1..=self.settings.max_attempts {
            let code = self
                .source
                .candidate(&self.settings.prefix, year, self.settings.digits);

            if self.bookings.find_by_confirmation_code(&code).await?.is_none() {
                return Ok(code);
            }
            tracing::debug!(code = %code, attempt, "confirmation code collision");
        }

        tracing::error!(
            attempts = self.settings.max_attempts,
            digits = self.settings.digits,
            "confirmation code space exhausted; widen CODE_DIGITS"
        );
        Err(BookingError::ExhaustedRetries {
            attempts: self.settings.max_attempts,
        })
    }
}
