pub mod capacity_ledger;
pub mod reservation_state;
pub mod group_payment;

pub mod pricing_service;
pub use pricing_service::PricingService;
pub mod booking_service;
pub use booking_service::BookingService;
pub mod checkin_service;
pub use checkin_service::CheckInService;
