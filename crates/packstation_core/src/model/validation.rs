//! Field-level input checks run by adapters before calling the services.
//!
//! The services assume well-typed input and never call into this module.
//! Every violation is collected so callers can report them together.

use crate::model::station::{NewAddress, NewPackageSlot, NewStation, StationChanges};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_STREET_CHARS: usize = 40;
const MAX_HOUSE_NUMBER_CHARS: usize = 40;
const MAX_POSTAL_CODE_CHARS: usize = 10;
const MAX_CITY_CHARS: usize = 40;
const MAX_SLOT_NUMBER_CHARS: usize = 32;

static WORD_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w.*").expect("valid word-start regex"));
static DIGIT_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d.*").expect("valid digit-start regex"));

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted field path, e.g. `adresse.postleitzahl`.
    pub field: String,
    pub message: String,
}

/// All violations found in one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn fields(&self) -> Vec<&str> {
        self.violations
            .iter()
            .map(|violation| violation.field.as_str())
            .collect()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered = self
            .violations
            .iter()
            .map(|violation| format!("{}: {}", violation.field, violation.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "invalid input: {rendered}")
    }
}

impl Error for ValidationErrors {}

#[derive(Default)]
struct Collector {
    violations: Vec<FieldViolation>,
}

impl Collector {
    fn reject(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    fn check_text(&mut self, field: &str, value: &str, pattern: &Regex, max_chars: usize) {
        if !pattern.is_match(value) {
            self.reject(field, format!("must match `{}`", pattern.as_str()));
        }
        if value.chars().count() > max_chars {
            self.reject(field, format!("must not exceed {max_chars} characters"));
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                violations: self.violations,
            })
        }
    }
}

/// Checks a create input.
pub fn validate_new_station(station: &NewStation) -> Result<(), ValidationErrors> {
    let mut collector = Collector::default();
    check_number(&mut collector, &station.number);
    if let Some(equipment) = &station.equipment {
        check_equipment(&mut collector, equipment);
    }
    check_address(&mut collector, &station.address);
    for (index, slot) in station.slots.iter().enumerate() {
        check_slot(&mut collector, index, slot);
    }
    collector.finish()
}

/// Checks an update payload.
pub fn validate_station_changes(changes: &StationChanges) -> Result<(), ValidationErrors> {
    let mut collector = Collector::default();
    if let Some(number) = &changes.number {
        check_number(&mut collector, number);
    }
    if let Some(equipment) = &changes.equipment {
        check_equipment(&mut collector, equipment);
    }
    collector.finish()
}

fn check_number(collector: &mut Collector, number: &str) {
    if number.trim().is_empty() {
        collector.reject("nummer", "must not be blank");
    }
}

fn check_equipment(collector: &mut Collector, equipment: &[String]) {
    let mut seen = HashSet::new();
    for tag in equipment {
        if !seen.insert(tag.as_str()) {
            collector.reject("ausstattung", format!("duplicate entry `{tag}`"));
        }
    }
}

fn check_address(collector: &mut Collector, address: &NewAddress) {
    collector.check_text(
        "adresse.strasse",
        &address.street,
        &WORD_START_RE,
        MAX_STREET_CHARS,
    );
    collector.check_text(
        "adresse.hausnummer",
        &address.house_number,
        &DIGIT_START_RE,
        MAX_HOUSE_NUMBER_CHARS,
    );
    collector.check_text(
        "adresse.postleitzahl",
        &address.postal_code,
        &DIGIT_START_RE,
        MAX_POSTAL_CODE_CHARS,
    );
    // City is optional in the input; an empty value skips the pattern.
    if !address.city.is_empty() {
        collector.check_text("adresse.stadt", &address.city, &WORD_START_RE, MAX_CITY_CHARS);
    }
}

fn check_slot(collector: &mut Collector, index: usize, slot: &NewPackageSlot) {
    if slot.number.chars().count() > MAX_SLOT_NUMBER_CHARS {
        collector.reject(
            format!("pakete[{index}].nummer"),
            format!("must not exceed {MAX_SLOT_NUMBER_CHARS} characters"),
        );
    }
    if !slot.max_weight_kg.is_finite() || slot.max_weight_kg < 0.0 {
        collector.reject(
            format!("pakete[{index}].maxGewichtInKg"),
            "must be a non-negative number",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn karlsruhe() -> NewStation {
        let mut station = NewStation::new(
            "565",
            NewAddress::new("Moltkestr.", "54", "76133", "Karlsruhe"),
        );
        station
            .slots
            .push(NewPackageSlot::new("239087423504", 5.0));
        station
    }

    #[test]
    fn accepts_well_formed_station() {
        assert_eq!(validate_new_station(&karlsruhe()), Ok(()));
    }

    #[test]
    fn collects_every_violation() {
        let mut station = karlsruhe();
        station.number = "  ".to_string();
        station.address.postal_code = "D-76133".to_string();
        station.address.street = "x".repeat(41);
        station.slots[0].max_weight_kg = -1.0;
        station.equipment = Some(vec!["wlan".to_string(), "wlan".to_string()]);

        let errors = validate_new_station(&station).unwrap_err();
        assert_eq!(
            errors.fields(),
            vec![
                "nummer",
                "ausstattung",
                "adresse.strasse",
                "adresse.postleitzahl",
                "pakete[0].maxGewichtInKg",
            ]
        );
    }

    #[test]
    fn empty_city_is_allowed() {
        let mut station = karlsruhe();
        station.address.city = String::new();
        assert!(validate_new_station(&station).is_ok());
    }

    #[test]
    fn changes_check_only_present_fields() {
        assert!(validate_station_changes(&StationChanges::default()).is_ok());
        let changes = StationChanges {
            number: Some(String::new()),
            ..StationChanges::default()
        };
        assert_eq!(
            validate_station_changes(&changes).unwrap_err().fields(),
            vec!["nummer"]
        );
    }
}
