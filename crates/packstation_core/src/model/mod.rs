//! Station domain model.
//!
//! # Responsibility
//! - Define the station aggregate and its create/update inputs.
//! - Define search criteria and the permitted search-key whitelist.
//! - Provide the adapter-side input validation pipeline.
//!
//! # Invariants
//! - Ownership flows from station to address and slots; children hold the
//!   owning station id, never a reference back to it.
//! - Deletion is a hard, cascading delete of the whole aggregate.

pub mod criteria;
pub mod station;
pub mod validation;
