pub mod boat;
pub mod group;
pub mod pricing;
pub mod reservation;
