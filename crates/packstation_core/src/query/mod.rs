//! Query predicate building for station lookups.
//!
//! # Responsibility
//! - Translate a lookup id or a [`crate::model::criteria::StationFilter`]
//!   into one SQL statement with positional bind values.
//! - Decide join depth for address and package slots.

pub mod station_query;

pub use station_query::{SlotJoin, StationQuery, StationQueryBuilder};
