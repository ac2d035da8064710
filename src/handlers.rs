pub mod boats;
pub mod reservations;
pub mod tours;
