//! Station repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist and load the station aggregate (station, address, slots).
//! - Run statements produced by the query builder and fold joined rows.
//! - Keep SQL and transaction handling inside the persistence boundary.
//!
//! # Invariants
//! - Aggregate inserts and cascading deletes run in one transaction.
//! - Version increments happen in the same statement as the field update,
//!   guarded by the version the caller read.
//! - Read paths reject rows that break the aggregate shape.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::criteria::StationFilter;
use crate::model::station::{
    normalize_equipment, Address, NewStation, PackageSlot, Station, StationId,
};
use crate::query::{SlotJoin, StationQuery, StationQueryBuilder};
use chrono::NaiveDate;
use log::debug;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence-layer error for station storage.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Unique business-number index rejected the write.
    DuplicateNumber(String),
    /// Persisted data cannot be converted into the station model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "station repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::DuplicateNumber(number) => {
                write!(f, "station number already stored: {number}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted station data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the station aggregate.
pub trait StationRepository {
    /// Inserts station, address and slots together; returns the new id.
    fn insert_station(&self, station: &NewStation) -> RepoResult<StationId>;
    /// Loads one station with its address and, on request, its slots.
    fn load_station(&self, id: StationId, include_slots: bool) -> RepoResult<Option<Station>>;
    /// Loads all stations matching `filter`, slots included.
    fn query_stations(&self, filter: &StationFilter) -> RepoResult<Vec<Station>>;
    /// Returns whether another station already uses `number`.
    fn number_taken(&self, number: &str, except: Option<StationId>) -> RepoResult<bool>;
    /// Writes business fields if the stored version still equals
    /// `expected_version`. Returns the new version, or `None` when the
    /// row was changed or removed in between.
    fn update_station(&self, station: &Station, expected_version: u32)
        -> RepoResult<Option<u32>>;
    /// Deletes address, slots and station in one transaction. Returns
    /// whether the station row was removed.
    fn delete_station_cascade(&self, station: &Station) -> RepoResult<bool>;
}

/// SQLite-backed station repository.
#[derive(Debug, Clone, Copy)]
pub struct SqliteStationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStationRepository<'conn> {
    /// Creates a repository over a fully migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn run_query(&self, query: &StationQuery) -> RepoResult<Vec<Station>> {
        let mut stmt = self.conn.prepare(query.sql())?;
        let mut rows = stmt.query(params_from_iter(query.params().iter()))?;
        let mut stations: Vec<Station> = Vec::new();

        while let Some(row) = rows.next()? {
            let station_id: StationId = row.get("station_id")?;
            let slot = parse_slot_columns(row, station_id)?;

            match stations.last_mut() {
                Some(current) if current.id == station_id => {
                    if let (Some(slots), Some(slot)) = (current.slots.as_mut(), slot) {
                        slots.push(slot);
                    }
                }
                _ => {
                    let mut station = parse_station_columns(row, station_id)?;
                    station.slots = match query.slot_join() {
                        SlotJoin::Skip => None,
                        SlotJoin::Left => Some(slot.into_iter().collect()),
                    };
                    stations.push(station);
                }
            }
        }

        Ok(stations)
    }
}

impl StationRepository for SqliteStationRepository<'_> {
    fn insert_station(&self, station: &NewStation) -> RepoResult<StationId> {
        let equipment = station
            .equipment
            .as_ref()
            .map(|tags| encode_equipment(tags))
            .transpose()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO packstation (nummer, baudatum, ausstattung)
             VALUES (?1, ?2, ?3);",
            params![
                station.number.as_str(),
                station.construction_date,
                equipment
            ],
        )
        .map_err(|err| map_unique_violation(err, &station.number))?;
        let id = tx.last_insert_rowid();

        let address = &station.address;
        tx.execute(
            "INSERT INTO adresse (strasse, hausnummer, postleitzahl, stadt, packstation_id)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                address.street.as_str(),
                address.house_number.as_str(),
                address.postal_code.as_str(),
                address.city.as_str(),
                id,
            ],
        )?;

        for slot in &station.slots {
            tx.execute(
                "INSERT INTO paket (nummer, max_gewicht_in_kg, packstation_id)
                 VALUES (?1, ?2, ?3);",
                params![slot.number.as_str(), slot.max_weight_kg, id],
            )?;
        }

        tx.commit()?;
        debug!(
            "event=station_insert module=repo status=ok id={id} slots={}",
            station.slots.len()
        );
        Ok(id)
    }

    fn load_station(&self, id: StationId, include_slots: bool) -> RepoResult<Option<Station>> {
        let query = StationQueryBuilder::by_id(id, include_slots);
        Ok(self.run_query(&query)?.into_iter().next())
    }

    fn query_stations(&self, filter: &StationFilter) -> RepoResult<Vec<Station>> {
        let query = StationQueryBuilder::by_filter(filter);
        self.run_query(&query)
    }

    fn number_taken(&self, number: &str, except: Option<StationId>) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM packstation
                WHERE nummer = ?1
                  AND (?2 IS NULL OR id <> ?2)
            );",
            params![number, except],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn update_station(
        &self,
        station: &Station,
        expected_version: u32,
    ) -> RepoResult<Option<u32>> {
        let equipment = encode_equipment(&station.equipment)?;
        let changed = self
            .conn
            .execute(
                "UPDATE packstation
                 SET
                    nummer = ?1,
                    baudatum = ?2,
                    ausstattung = ?3,
                    version = version + 1,
                    aktualisiert = (strftime('%s', 'now') * 1000)
                 WHERE id = ?4
                   AND version = ?5;",
                params![
                    station.number.as_str(),
                    station.construction_date,
                    equipment,
                    station.id,
                    expected_version,
                ],
            )
            .map_err(|err| map_unique_violation(err, &station.number))?;

        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(expected_version + 1))
    }

    fn delete_station_cascade(&self, station: &Station) -> RepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        tx.execute(
            "DELETE FROM adresse WHERE packstation_id = ?1;",
            [station.id],
        )?;
        // Slots added after `station` was loaded must go too.
        let slots = tx.execute(
            "DELETE FROM paket WHERE packstation_id = ?1;",
            [station.id],
        )?;

        let removed = tx.execute("DELETE FROM packstation WHERE id = ?1;", [station.id])?;
        tx.commit()?;

        debug!(
            "event=station_delete module=repo status=ok id={} slots={slots} removed={}",
            station.id, removed
        );
        Ok(removed > 0)
    }
}

fn parse_station_columns(row: &Row<'_>, station_id: StationId) -> RepoResult<Station> {
    let address_id: Option<i64> = row.get("adresse_id")?;
    let address_id = address_id.ok_or_else(|| {
        RepoError::InvalidData(format!("station {station_id} has no address"))
    })?;

    let construction_date = match row.get::<_, Option<String>>("baudatum")? {
        Some(value) => Some(parse_date(&value, station_id)?),
        None => None,
    };

    let equipment = match row.get::<_, Option<String>>("ausstattung")? {
        Some(value) => Some(decode_equipment(&value, station_id)?),
        None => None,
    };

    Ok(Station {
        id: station_id,
        version: row.get("version")?,
        number: row.get("nummer")?,
        construction_date,
        equipment: normalize_equipment(equipment),
        address: Address {
            id: address_id,
            station_id,
            street: row.get("strasse")?,
            house_number: row.get("hausnummer")?,
            postal_code: row.get("postleitzahl")?,
            city: row.get("stadt")?,
        },
        slots: None,
        created_at: row.get("erzeugt")?,
        updated_at: row.get("aktualisiert")?,
    })
}

fn parse_slot_columns(row: &Row<'_>, station_id: StationId) -> RepoResult<Option<PackageSlot>> {
    let Some(slot_id) = row.get::<_, Option<i64>>("paket_id")? else {
        return Ok(None);
    };
    Ok(Some(PackageSlot {
        id: slot_id,
        station_id,
        number: row.get("paket_nummer")?,
        max_weight_kg: row.get("max_gewicht_in_kg")?,
    }))
}

fn parse_date(value: &str, station_id: StationId) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid date `{value}` in packstation.baudatum for station {station_id}"
        ))
    })
}

fn encode_equipment(tags: &[String]) -> RepoResult<String> {
    serde_json::to_string(tags)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode ausstattung: {err}")))
}

fn decode_equipment(value: &str, station_id: StationId) -> RepoResult<Vec<String>> {
    serde_json::from_str(value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid ausstattung `{value}` for station {station_id}"
        ))
    })
}

fn map_unique_violation(err: rusqlite::Error, number: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::DuplicateNumber(number.to_string())
        }
        _ => err.into(),
    }
}
