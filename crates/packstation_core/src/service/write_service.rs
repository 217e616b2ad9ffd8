//! Station write use-cases: create, versioned update, cascading delete.
//!
//! # Responsibility
//! - Enforce business-number uniqueness on create and update.
//! - Enforce optimistic concurrency through quoted version tokens.
//! - Delete the whole station aggregate atomically.
//!
//! # Invariants
//! - Each successful update raises the stored version by exactly one.
//! - A token older than the stored version never reaches storage.
//! - Deleting an unknown station is a no-op reported as `false`.
//! - Notification failures are logged and otherwise ignored.

use crate::model::station::{NewStation, StationChanges, StationId};
use crate::notify::{LogNotifier, StationCreated, StationNotifier};
use crate::repo::station_repo::StationRepository;
use crate::service::error::{StationError, StationResult};
use crate::service::read_service::{is_valid_station_id, ReadService};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

static VERSION_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"(\d{1,3})"$"#).expect("valid version token regex"));

/// Parses a quoted version token such as `"3"`.
///
/// # Errors
/// - `StationError::InvalidVersion` for anything but a quoted 1-3 digit
///   integer.
pub fn parse_version_token(token: &str) -> StationResult<u32> {
    VERSION_TOKEN_RE
        .captures(token)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
        .ok_or_else(|| StationError::InvalidVersion {
            token: token.to_string(),
        })
}

/// Write-side service over a station repository and a notifier.
pub struct WriteService<R: StationRepository, N: StationNotifier = LogNotifier> {
    reader: ReadService<R>,
    notifier: N,
}

impl<R: StationRepository> WriteService<R, LogNotifier> {
    /// Creates a service that only logs creation notices.
    pub fn new(repo: R) -> Self {
        Self::with_notifier(repo, LogNotifier)
    }
}

impl<R: StationRepository, N: StationNotifier> WriteService<R, N> {
    pub fn with_notifier(repo: R, notifier: N) -> Self {
        Self {
            reader: ReadService::new(repo),
            notifier,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn repo(&self) -> &R {
        self.reader.repository()
    }

    /// Persists a new station with its address and slots.
    ///
    /// # Errors
    /// - `StationError::NumberExists` when the business number is taken.
    pub fn create(&self, station: &NewStation) -> StationResult<StationId> {
        debug!(
            "event=station_create module=write_service status=start nummer={} slots={}",
            station.number,
            station.slots.len()
        );
        self.ensure_number_free(&station.number, None)?;

        let id = self.repo().insert_station(station)?;
        info!(
            "event=station_create module=write_service status=ok id={id} nummer={}",
            station.number
        );

        let message = StationCreated {
            id,
            number: station.number.clone(),
        };
        if let Err(err) = self.notifier.station_created(&message) {
            warn!("event=station_notify module=write_service status=error id={id} error={err}");
        }

        Ok(id)
    }

    /// Applies `changes` to a station if `version_token` is current.
    ///
    /// Returns the new version, one greater than the stored version.
    ///
    /// # Errors
    /// - `StationError::NotFound` for a missing id or unknown station.
    /// - `StationError::VersionRequired` without a token.
    /// - `StationError::InvalidVersion` for a malformed token.
    /// - `StationError::OutdatedVersion` when the token is older than the
    ///   stored version, or another writer committed first.
    /// - `StationError::NumberExists` when the new number is taken.
    pub fn update(
        &self,
        id: Option<StationId>,
        changes: &StationChanges,
        version_token: Option<&str>,
    ) -> StationResult<u32> {
        let Some(id) = id else {
            debug!("event=station_update module=write_service status=rejected reason=missing_id");
            return Err(StationError::not_found("<none>"));
        };
        let Some(token) = version_token else {
            debug!("event=station_update module=write_service status=rejected id={id} reason=missing_version");
            return Err(StationError::VersionRequired);
        };
        let supplied = parse_version_token(token)?;
        debug!("event=station_update module=write_service status=start id={id} version={supplied}");

        let mut station = self.reader.find_by_id(id, false)?;
        let stored = station.version;
        if supplied < stored {
            debug!("event=station_update module=write_service status=outdated id={id} supplied={supplied} stored={stored}");
            return Err(StationError::OutdatedVersion { supplied, stored });
        }

        if let Some(number) = &changes.number {
            if *number != station.number {
                self.ensure_number_free(number, Some(id))?;
            }
        }

        station.apply_changes(changes);
        let version = self
            .repo()
            .update_station(&station, stored)?
            .ok_or(StationError::OutdatedVersion { supplied, stored })?;

        info!("event=station_update module=write_service status=ok id={id} version={version}");
        Ok(version)
    }

    /// Deletes a station with its address and slots.
    ///
    /// Returns whether the station row was removed; unknown ids yield
    /// `false` rather than an error.
    pub fn delete(&self, id: StationId) -> StationResult<bool> {
        debug!("event=station_delete module=write_service status=start id={id}");
        if !is_valid_station_id(id) {
            return Ok(false);
        }

        let Some(station) = self.repo().load_station(id, true)? else {
            debug!("event=station_delete module=write_service status=absent id={id}");
            return Ok(false);
        };

        let removed = self.repo().delete_station_cascade(&station)?;
        info!("event=station_delete module=write_service status=ok id={id} removed={removed}");
        Ok(removed)
    }

    fn ensure_number_free(&self, number: &str, except: Option<StationId>) -> StationResult<()> {
        if self.repo().number_taken(number, except)? {
            debug!("event=station_number_check module=write_service status=conflict nummer={number}");
            return Err(StationError::NumberExists {
                number: number.to_string(),
            });
        }
        Ok(())
    }
}
