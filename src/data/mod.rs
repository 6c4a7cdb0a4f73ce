//! Persistence: domain records, the [`Store`] seam and its implementations.

pub mod memory;
pub mod models;
pub mod postgres;
mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::Store;
