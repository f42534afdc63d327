pub mod booking;
pub mod guest;
pub mod money;
pub mod package;

pub use booking::{ranges_overlap, Booking, BookingStatus, ConflictingBooking};
pub use guest::{Guest, NewGuest};
pub use money::{Money, MoneyError};
pub use package::{Package, PackageStatus, PackageSummary};
