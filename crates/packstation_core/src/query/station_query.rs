//! SQL builder for station lookups.
//!
//! # Invariants
//! - Lookup by id inner-joins the address; slots are left-joined only on
//!   request.
//! - Lookup by filter left-joins both address and slots.
//! - Predicates are conjunctive: the first one opens the `WHERE` clause,
//!   every later one is appended with `AND`.
//! - Rows are ordered by station id, then slot id, so one station's rows
//!   are contiguous.

use crate::model::criteria::StationFilter;
use crate::model::station::StationId;
use log::debug;
use rusqlite::types::Value;

const STATION_COLUMNS: &str = "s.id AS station_id,
    s.version AS version,
    s.nummer AS nummer,
    s.baudatum AS baudatum,
    s.ausstattung AS ausstattung,
    s.erzeugt AS erzeugt,
    s.aktualisiert AS aktualisiert,
    a.id AS adresse_id,
    a.strasse AS strasse,
    a.hausnummer AS hausnummer,
    a.postleitzahl AS postleitzahl,
    a.stadt AS stadt";

const SLOT_COLUMNS: &str = "p.id AS paket_id,
    p.nummer AS paket_nummer,
    p.max_gewicht_in_kg AS max_gewicht_in_kg";

const NO_SLOT_COLUMNS: &str = "NULL AS paket_id,
    NULL AS paket_nummer,
    NULL AS max_gewicht_in_kg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressJoin {
    Inner,
    Left,
}

/// Whether package slot rows are joined into the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotJoin {
    Skip,
    Left,
}

/// Finished statement plus its positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct StationQuery {
    sql: String,
    params: Vec<Value>,
    slot_join: SlotJoin,
}

impl StationQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn slot_join(&self) -> SlotJoin {
        self.slot_join
    }
}

/// Incremental builder; see module docs for join and predicate rules.
#[derive(Debug)]
pub struct StationQueryBuilder {
    sql: String,
    params: Vec<Value>,
    where_used: bool,
    slot_join: SlotJoin,
}

impl StationQueryBuilder {
    /// Builds the single-station lookup.
    pub fn by_id(id: StationId, include_slots: bool) -> StationQuery {
        let slot_join = if include_slots {
            SlotJoin::Left
        } else {
            SlotJoin::Skip
        };
        Self::new(AddressJoin::Inner, slot_join)
            .filter("s.id = ?", Value::Integer(id))
            .build()
    }

    /// Builds the criteria lookup. An unfiltered filter selects everything.
    pub fn by_filter(filter: &StationFilter) -> StationQuery {
        let mut builder = Self::new(AddressJoin::Left, SlotJoin::Left);

        if let Some(number) = &filter.number {
            builder = builder.filter("s.nummer = ?", Value::Text(number.clone()));
        }
        if let Some(from) = filter.built_from {
            builder = builder.filter("s.baudatum >= ?", date_value(from));
        }
        if let Some(to) = filter.built_to {
            builder = builder.filter("s.baudatum <= ?", date_value(to));
        }
        if let Some(has_slots) = filter.has_slots {
            builder = builder.predicate(if has_slots {
                "p.id IS NOT NULL"
            } else {
                "p.id IS NULL"
            });
        }
        if let Some(city) = &filter.city {
            builder = builder.filter(
                "instr(lower_unicode(a.stadt), lower_unicode(?)) > 0",
                Value::Text(city.clone()),
            );
        }

        builder.build()
    }

    fn new(address_join: AddressJoin, slot_join: SlotJoin) -> Self {
        let slot_columns = match slot_join {
            SlotJoin::Skip => NO_SLOT_COLUMNS,
            SlotJoin::Left => SLOT_COLUMNS,
        };
        let address_join = match address_join {
            AddressJoin::Inner => "INNER JOIN",
            AddressJoin::Left => "LEFT JOIN",
        };

        let mut sql = format!(
            "SELECT {STATION_COLUMNS},
    {slot_columns}
FROM packstation s
{address_join} adresse a ON a.packstation_id = s.id"
        );
        if slot_join == SlotJoin::Left {
            sql.push_str("\nLEFT JOIN paket p ON p.packstation_id = s.id");
        }

        Self {
            sql,
            params: Vec::new(),
            where_used: false,
            slot_join,
        }
    }

    fn filter(mut self, predicate: &str, value: Value) -> Self {
        self.params.push(value);
        self.predicate(predicate)
    }

    fn predicate(mut self, predicate: &str) -> Self {
        self.sql
            .push_str(if self.where_used { "\n  AND " } else { "\nWHERE " });
        self.sql.push_str(predicate);
        self.where_used = true;
        self
    }

    fn build(mut self) -> StationQuery {
        self.sql.push_str(match self.slot_join {
            SlotJoin::Skip => "\nORDER BY s.id ASC;",
            SlotJoin::Left => "\nORDER BY s.id ASC, p.id ASC;",
        });
        debug!(
            "event=query_build module=query status=ok predicates={} sql={}",
            self.params.len(),
            self.sql.replace('\n', " ")
        );
        StationQuery {
            sql: self.sql,
            params: self.params,
            slot_join: self.slot_join,
        }
    }
}

fn date_value(date: chrono::NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}
