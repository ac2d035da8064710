pub mod store;
pub use store::{BookingStore, ReservationFilter, WriteBatch};
pub mod memory_store;
pub use memory_store::MemoryStore;
pub mod pg_store;
pub use pg_store::PgStore;
