//! Station use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into read and write use-cases.
//! - Report failures through the shared [`error::StationError`] taxonomy.
//!
//! # Invariants
//! - Services receive already-validated input and never run field-level
//!   validation themselves.
//! - Services hold no mutable state; concurrency control is the version
//!   token plus storage transactions.

pub mod error;
pub mod read_service;
pub mod write_service;
