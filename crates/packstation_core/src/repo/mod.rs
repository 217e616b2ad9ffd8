//! Persistence boundary for the station aggregate.
//!
//! # Responsibility
//! - Define the storage contract consumed by the read and write services.
//! - Isolate SQLite statements and transactions from service logic.
//!
//! # Invariants
//! - Repository APIs report storage facts (`Option`, `bool`, duplicate key);
//!   turning them into domain failures is the services' job.

pub mod station_repo;
