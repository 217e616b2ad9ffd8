//! Station read use-cases: lookup by id and search by criteria.
//!
//! # Responsibility
//! - Apply identifier syntax and the search-key whitelist before storage
//!   is queried.
//! - Turn empty storage answers into typed not-found outcomes.
//!
//! # Invariants
//! - External identifiers must match `^[1-9]\d{0,10}$`; anything else is
//!   reported as not found.
//! - Absent or empty criteria return every station and never fail with a
//!   not-found outcome.
//! - Non-empty criteria with zero matches fail with `NoMatches`.
//! - Returned stations never expose a missing equipment list.

use crate::model::criteria::{SearchCriteria, StationFilter};
use crate::model::station::{Station, StationId};
use crate::repo::station_repo::StationRepository;
use crate::service::error::{StationError, StationResult};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static STATION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9]\d{0,10}$").expect("valid station id regex"));

/// Parses an externally supplied station identifier.
///
/// Returns `None` for anything but 1-11 digits without a leading zero.
pub fn parse_station_id(raw: &str) -> Option<StationId> {
    if !STATION_ID_RE.is_match(raw) {
        return None;
    }
    raw.parse().ok()
}

/// Returns whether `id` is within the externally addressable range.
pub fn is_valid_station_id(id: StationId) -> bool {
    STATION_ID_RE.is_match(&id.to_string())
}

/// Read-side service over a station repository.
pub struct ReadService<R: StationRepository> {
    repo: R,
}

impl<R: StationRepository> ReadService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Repository used by this service.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Loads one station with its address and optionally its slots.
    ///
    /// # Errors
    /// - `StationError::NotFound` for ids outside the identifier syntax or
    ///   without a stored station.
    pub fn find_by_id(&self, id: StationId, include_slots: bool) -> StationResult<Station> {
        debug!("event=station_find_by_id module=read_service status=start id={id} slots={include_slots}");
        if !is_valid_station_id(id) {
            return Err(StationError::not_found(id));
        }

        let station = self
            .repo
            .load_station(id, include_slots)?
            .ok_or_else(|| StationError::not_found(id))?;

        debug!(
            "event=station_find_by_id module=read_service status=ok id={id} version={} nummer={}",
            station.version, station.number
        );
        Ok(station)
    }

    /// Same as [`Self::find_by_id`] for an identifier still in text form.
    pub fn find_by_raw_id(&self, raw: &str, include_slots: bool) -> StationResult<Station> {
        match parse_station_id(raw) {
            Some(id) => self.find_by_id(id, include_slots),
            None => {
                debug!("event=station_find_by_id module=read_service status=rejected raw_id={raw:?}");
                Err(StationError::not_found(raw))
            }
        }
    }

    /// Searches stations.
    ///
    /// # Errors
    /// - `StationError::InvalidCriteria` for keys outside the whitelist or
    ///   undecodable values.
    /// - `StationError::NoMatches` when valid, non-empty criteria match
    ///   nothing.
    pub fn find(&self, criteria: Option<&SearchCriteria>) -> StationResult<Vec<Station>> {
        let criteria = match criteria {
            Some(criteria) if !criteria.is_empty() => criteria,
            _ => {
                debug!("event=station_find module=read_service status=start criteria=none");
                return Ok(self.repo.query_stations(&StationFilter::default())?);
            }
        };
        debug!("event=station_find module=read_service status=start criteria={criteria}");

        let filter = StationFilter::from_criteria(criteria).map_err(|err| {
            debug!("event=station_find module=read_service status=rejected reason={err}");
            StationError::InvalidCriteria { keys: err.keys() }
        })?;

        let stations = self.repo.query_stations(&filter)?;
        if stations.is_empty() {
            debug!("event=station_find module=read_service status=empty criteria={criteria}");
            return Err(StationError::NoMatches {
                criteria: criteria.clone(),
            });
        }

        debug!(
            "event=station_find module=read_service status=ok count={}",
            stations.len()
        );
        Ok(stations)
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_station_id, parse_station_id};

    #[test]
    fn parse_station_id_accepts_canonical_numbers() {
        assert_eq!(parse_station_id("1"), Some(1));
        assert_eq!(parse_station_id("42"), Some(42));
        assert_eq!(parse_station_id("99999999999"), Some(99_999_999_999));
    }

    #[test]
    fn parse_station_id_rejects_other_shapes() {
        for raw in ["", "0", "01", "-1", "abc", "1.5", " 1", "123456789012"] {
            assert_eq!(parse_station_id(raw), None, "{raw:?} should be rejected");
        }
    }

    #[test]
    fn numeric_ids_follow_the_same_syntax() {
        assert!(is_valid_station_id(7));
        assert!(!is_valid_station_id(0));
        assert!(!is_valid_station_id(-3));
        assert!(!is_valid_station_id(100_000_000_000));
    }
}
