//! Search criteria and the permitted search-key whitelist.
//!
//! # Responsibility
//! - Carry raw `key=value` criteria as received from adapters.
//! - Reject keys outside the whitelist before any query is built.
//! - Decode recognized keys into a typed [`StationFilter`].
//!
//! # Invariants
//! - The whitelist is the station field names plus the filter-only keys
//!   and legacy aliases, fixed at startup.
//! - Whitelisted keys without filter meaning are accepted and ignored.

use crate::model::station::STATION_FIELD_NAMES;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const KEY_NUMBER: &str = "nummer";
pub const KEY_BUILT_FROM: &str = "baudatum_von";
pub const KEY_BUILT_TO: &str = "baudatum_bis";
pub const KEY_HAS_SLOTS: &str = "hat_pakete";
pub const KEY_CITY: &str = "stadt";
pub const KEY_CITY_ALIAS: &str = "city";

/// Filter keys that are not station field names.
const FILTER_KEYS: &[&str] = &[
    KEY_BUILT_FROM,
    KEY_BUILT_TO,
    KEY_HAS_SLOTS,
    KEY_CITY,
    KEY_CITY_ALIAS,
];

/// Old client flags kept for compatibility; accepted and ignored.
const LEGACY_KEYS: &[&str] = &["bildschirm", "bluetooth"];

static SEARCH_KEYS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    STATION_FIELD_NAMES
        .iter()
        .chain(FILTER_KEYS)
        .chain(LEGACY_KEYS)
        .copied()
        .collect()
});

/// Returns whether `key` may appear in search criteria.
pub fn is_search_key(key: &str) -> bool {
    SEARCH_KEYS.contains(key)
}

/// Returns the full set of permitted search keys.
pub fn search_keys() -> impl Iterator<Item = &'static str> {
    SEARCH_KEYS.iter().copied()
}

/// Raw search criteria, keyed by search-key name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    entries: BTreeMap<String, String>,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the keys not covered by the whitelist, in sorted order.
    pub fn unknown_keys(&self) -> Vec<String> {
        self.keys()
            .filter(|key| !is_search_key(key))
            .map(str::to_string)
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchCriteria {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut criteria = Self::new();
        for (key, value) in iter {
            criteria.insert(key, value);
        }
        criteria
    }
}

impl Display for SearchCriteria {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (index, (key, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, "}}")
    }
}

/// Criteria rejected while decoding into a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    /// Keys outside the whitelist.
    UnknownKeys(Vec<String>),
    /// Recognized key whose value cannot be decoded.
    InvalidValue { key: String, value: String },
}

impl CriteriaError {
    /// Returns the keys responsible for the rejection.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Self::UnknownKeys(keys) => keys.clone(),
            Self::InvalidValue { key, .. } => vec![key.clone()],
        }
    }
}

impl Display for CriteriaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownKeys(keys) => write!(f, "unknown search keys: {}", keys.join(", ")),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for search key `{key}`")
            }
        }
    }
}

impl Error for CriteriaError {}

/// Typed filter decoded from [`SearchCriteria`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationFilter {
    /// Exact business number.
    pub number: Option<String>,
    /// Inclusive lower construction-date bound.
    pub built_from: Option<NaiveDate>,
    /// Inclusive upper construction-date bound.
    pub built_to: Option<NaiveDate>,
    /// `true` keeps stations with slots, `false` those without.
    pub has_slots: Option<bool>,
    /// Case-insensitive city substring.
    pub city: Option<String>,
}

impl StationFilter {
    /// Decodes criteria, rejecting unknown keys first.
    ///
    /// When both `stadt` and `city` are present, `stadt` wins.
    pub fn from_criteria(criteria: &SearchCriteria) -> Result<Self, CriteriaError> {
        let unknown = criteria.unknown_keys();
        if !unknown.is_empty() {
            return Err(CriteriaError::UnknownKeys(unknown));
        }

        Ok(Self {
            number: criteria.get(KEY_NUMBER).map(str::to_string),
            built_from: parse_date(criteria, KEY_BUILT_FROM)?,
            built_to: parse_date(criteria, KEY_BUILT_TO)?,
            has_slots: parse_bool(criteria, KEY_HAS_SLOTS)?,
            city: criteria
                .get(KEY_CITY)
                .or_else(|| criteria.get(KEY_CITY_ALIAS))
                .map(str::to_string),
        })
    }

    /// Returns whether no predicate would be applied.
    pub fn is_unfiltered(&self) -> bool {
        self == &Self::default()
    }
}

fn parse_date(criteria: &SearchCriteria, key: &str) -> Result<Option<NaiveDate>, CriteriaError> {
    criteria
        .get(key)
        .map(|value| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                CriteriaError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                }
            })
        })
        .transpose()
}

fn parse_bool(criteria: &SearchCriteria, key: &str) -> Result<Option<bool>, CriteriaError> {
    criteria
        .get(key)
        .map(|value| match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(CriteriaError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            }),
        })
        .transpose()
}
