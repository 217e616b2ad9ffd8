//! Core resource management for parcel-locker stations.
//! This crate is the single source of truth for station invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::criteria::{CriteriaError, SearchCriteria, StationFilter};
pub use model::station::{
    format_version_token, Address, NewAddress, NewPackageSlot, NewStation, PackageSlot, Station,
    StationChanges, StationId,
};
pub use model::validation::{validate_new_station, validate_station_changes, ValidationErrors};
pub use notify::{LogNotifier, NotifyError, StationCreated, StationNotifier};
pub use repo::station_repo::{RepoError, RepoResult, SqliteStationRepository, StationRepository};
pub use service::error::{ErrorKind, StationError, StationResult};
pub use service::read_service::{parse_station_id, ReadService};
pub use service::write_service::{parse_version_token, WriteService};

/// Minimal health-check API for adapters.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
