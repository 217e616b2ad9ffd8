//! Station aggregate: station, owned address and owned package slots.
//!
//! # Responsibility
//! - Define the persisted read model returned to callers.
//! - Define the create/update input shapes accepted by the write service.
//! - Declare the canonical station field names used by search validation.
//!
//! # Invariants
//! - `id`, `version`, `created_at` are never caller-settable.
//! - A persisted station always owns exactly one address.
//! - Children carry the owning station id as a plain foreign key value.
//! - `equipment` is never absent on a returned station (empty when unset).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// System-assigned station identifier.
pub type StationId = i64;
/// System-assigned address identifier.
pub type AddressId = i64;
/// System-assigned package slot identifier.
pub type PackageSlotId = i64;

/// Field names of the station record, as exposed to search callers.
///
/// Kept next to [`Station`] so the search whitelist follows the model.
pub const STATION_FIELD_NAMES: &[&str] = &[
    "id",
    "version",
    "nummer",
    "baudatum",
    "ausstattung",
    "adresse",
    "pakete",
    "erzeugt",
    "aktualisiert",
];

/// Persisted parcel-locker station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    /// Optimistic-concurrency counter, starts at 0.
    pub version: u32,
    /// Business number, unique across stations.
    #[serde(rename = "nummer")]
    pub number: String,
    #[serde(rename = "baudatum")]
    pub construction_date: Option<NaiveDate>,
    #[serde(rename = "ausstattung")]
    pub equipment: Vec<String>,
    #[serde(rename = "adresse")]
    pub address: Address,
    /// `None` when the lookup did not request slots.
    #[serde(rename = "pakete")]
    pub slots: Option<Vec<PackageSlot>>,
    /// Epoch ms creation timestamp.
    #[serde(rename = "erzeugt")]
    pub created_at: i64,
    /// Epoch ms update timestamp.
    #[serde(rename = "aktualisiert")]
    pub updated_at: i64,
}

/// Physical location owned by one station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    #[serde(rename = "packstationId")]
    pub station_id: StationId,
    #[serde(rename = "strasse")]
    pub street: String,
    #[serde(rename = "hausnummer")]
    pub house_number: String,
    #[serde(rename = "postleitzahl")]
    pub postal_code: String,
    #[serde(rename = "stadt")]
    pub city: String,
}

/// One compartment of a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSlot {
    pub id: PackageSlotId,
    #[serde(rename = "packstationId")]
    pub station_id: StationId,
    #[serde(rename = "nummer")]
    pub number: String,
    #[serde(rename = "maxGewichtInKg")]
    pub max_weight_kg: f64,
}

/// Create input: business fields plus exactly one address and any slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStation {
    #[serde(rename = "nummer")]
    pub number: String,
    #[serde(rename = "baudatum")]
    pub construction_date: Option<NaiveDate>,
    /// Absent equipment is stored as NULL and read back as empty.
    #[serde(rename = "ausstattung")]
    pub equipment: Option<Vec<String>>,
    #[serde(rename = "adresse")]
    pub address: NewAddress,
    #[serde(rename = "pakete", default)]
    pub slots: Vec<NewPackageSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    #[serde(rename = "strasse")]
    pub street: String,
    #[serde(rename = "hausnummer")]
    pub house_number: String,
    #[serde(rename = "postleitzahl")]
    pub postal_code: String,
    #[serde(rename = "stadt")]
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPackageSlot {
    #[serde(rename = "nummer")]
    pub number: String,
    #[serde(rename = "maxGewichtInKg")]
    pub max_weight_kg: f64,
}

/// Partial update payload. `None` keeps the stored value.
///
/// Address and slots are not part of an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationChanges {
    #[serde(rename = "nummer")]
    pub number: Option<String>,
    #[serde(rename = "baudatum")]
    pub construction_date: Option<NaiveDate>,
    #[serde(rename = "ausstattung")]
    pub equipment: Option<Vec<String>>,
}

impl NewStation {
    /// Creates a station input without equipment or slots.
    pub fn new(number: impl Into<String>, address: NewAddress) -> Self {
        Self {
            number: number.into(),
            construction_date: None,
            equipment: None,
            address,
            slots: Vec::new(),
        }
    }
}

impl NewAddress {
    pub fn new(
        street: impl Into<String>,
        house_number: impl Into<String>,
        postal_code: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            house_number: house_number.into(),
            postal_code: postal_code.into(),
            city: city.into(),
        }
    }
}

impl NewPackageSlot {
    pub fn new(number: impl Into<String>, max_weight_kg: f64) -> Self {
        Self {
            number: number.into(),
            max_weight_kg,
        }
    }
}

impl StationChanges {
    /// Returns whether the payload changes nothing.
    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.construction_date.is_none() && self.equipment.is_none()
    }
}

impl Station {
    /// Copies the mutable business fields of `changes` onto this station.
    ///
    /// # Invariants
    /// - Only `number`, `construction_date` and `equipment` are touched.
    /// - `id`, `version`, timestamps, address and slots stay unchanged.
    pub fn apply_changes(&mut self, changes: &StationChanges) {
        if let Some(number) = &changes.number {
            self.number = number.clone();
        }
        if let Some(construction_date) = changes.construction_date {
            self.construction_date = Some(construction_date);
        }
        if let Some(equipment) = &changes.equipment {
            self.equipment = equipment.clone();
        }
    }

    /// Returns whether the station owns at least one loaded slot.
    pub fn has_slots(&self) -> bool {
        self.slots.as_ref().is_some_and(|slots| !slots.is_empty())
    }

    /// Returns the current version rendered as a quoted token.
    pub fn version_token(&self) -> String {
        format_version_token(self.version)
    }

    /// Returns whether a conditional-read token names the current version.
    pub fn matches_version_token(&self, token: &str) -> bool {
        token == self.version_token()
    }
}

/// Renders a version number in its quoted token form, e.g. `"3"`.
pub fn format_version_token(version: u32) -> String {
    format!("\"{version}\"")
}

/// Maps a nullable stored equipment list to its client-visible form.
pub fn normalize_equipment(stored: Option<Vec<String>>) -> Vec<String> {
    stored.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_station() -> Station {
        Station {
            id: 7,
            version: 2,
            number: "565".to_string(),
            construction_date: NaiveDate::from_ymd_opt(2022, 1, 31),
            equipment: vec!["bildschirm".to_string()],
            address: Address {
                id: 3,
                station_id: 7,
                street: "Moltkestr.".to_string(),
                house_number: "54".to_string(),
                postal_code: "76133".to_string(),
                city: "Karlsruhe".to_string(),
            },
            slots: None,
            created_at: 1_000,
            updated_at: 2_000,
        }
    }

    #[test]
    fn apply_changes_overwrites_only_business_fields() {
        let mut station = sample_station();
        let changes = StationChanges {
            number: Some("777".to_string()),
            construction_date: None,
            equipment: Some(Vec::new()),
        };

        station.apply_changes(&changes);

        assert_eq!(station.number, "777");
        assert_eq!(station.construction_date, NaiveDate::from_ymd_opt(2022, 1, 31));
        assert!(station.equipment.is_empty());
        assert_eq!(station.id, 7);
        assert_eq!(station.version, 2);
        assert_eq!(station.created_at, 1_000);
        assert_eq!(station.address.city, "Karlsruhe");
    }

    #[test]
    fn version_token_is_quoted() {
        let station = sample_station();
        assert_eq!(station.version_token(), "\"2\"");
        assert!(station.matches_version_token("\"2\""));
        assert!(!station.matches_version_token("2"));
    }

    #[test]
    fn missing_equipment_normalizes_to_empty() {
        assert!(normalize_equipment(None).is_empty());
        assert_eq!(
            normalize_equipment(Some(vec!["bluetooth".to_string()])),
            vec!["bluetooth".to_string()]
        );
    }

    #[test]
    fn serializes_with_persisted_field_names() {
        let value = serde_json::to_value(sample_station()).unwrap();
        assert_eq!(value["nummer"], "565");
        assert_eq!(value["baudatum"], "2022-01-31");
        assert_eq!(value["adresse"]["stadt"], "Karlsruhe");
        for field in STATION_FIELD_NAMES {
            assert!(value.get(*field).is_some(), "missing field {field}");
        }
    }
}
