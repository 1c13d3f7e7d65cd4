//! SQLite backends for the EoR status service.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. [`SqliteStore`] owns the dashboard's
//! own tables; [`SqliteObservationSource`] reads a mirror of the telescope
//! schedule.

mod encode;
mod observations;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use observations::SqliteObservationSource;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
