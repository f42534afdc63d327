use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::SharedConnection;
use crate::repository::{BookingRepository, PackageRepository, SqliteRepository};
use crate::services::{BookingRules, BookingService, Clock, CodeSource, RandomCodeSource, SystemClock};

pub struct AppState {
    pub config: AppConfig,
    pub bookings: BookingService,
    pub packages: Arc<dyn PackageRepository>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        packages: Arc<dyn PackageRepository>,
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
        code_source: Arc<dyn CodeSource>,
    ) -> Self {
        let rules = BookingRules::from(&config);
        let service = BookingService::new(packages.clone(), bookings, clock.clone(), code_source, rules);
        Self {
            config,
            bookings: service,
            packages,
            clock,
        }
    }

    /// State backed by one SQLite connection, random codes and the system clock.
    pub fn sqlite(config: AppConfig, db: SharedConnection) -> Self {
        Self::with_clock(config, db, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AppConfig, db: SharedConnection, clock: Arc<dyn Clock>) -> Self {
        let repo = Arc::new(SqliteRepository::new(db));
        Self::new(config, repo.clone(), repo, clock, Arc::new(RandomCodeSource))
    }
}
