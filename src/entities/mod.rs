mod booking;
mod driver;
mod offer;
mod place;

pub use booking::{Booking, Status as BookingStatus};
pub use driver::{Driver, Status as DriverStatus};
pub use offer::{Offer, OfferBoard};
pub use place::{Coordinates, Place};
