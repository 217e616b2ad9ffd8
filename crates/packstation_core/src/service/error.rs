//! Failure taxonomy shared by the read and write services.
//!
//! # Responsibility
//! - Give every service failure a distinct variant with the context an
//!   adapter needs to render it (identifier, token, criteria).
//! - Fold variants into the coarse [`ErrorKind`] adapters map to statuses.
//!
//! # Invariants
//! - Unknown id, rejected criteria and empty search results are separate
//!   variants even though they share `ErrorKind::NotFound`.
//! - Services never retry; every error goes straight to the caller.

use crate::model::criteria::SearchCriteria;
use crate::repo::station_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StationResult<T> = Result<T, StationError>;

/// Service-level failure for station use-cases.
#[derive(Debug)]
pub enum StationError {
    /// Identifier is malformed or names no stored station.
    NotFound { id: String },
    /// Criteria carried keys outside the whitelist or undecodable values.
    InvalidCriteria { keys: Vec<String> },
    /// Criteria were valid but matched no station.
    NoMatches { criteria: SearchCriteria },
    /// Update was called without a version token.
    VersionRequired,
    /// Version token is not a quoted 1-3 digit integer.
    InvalidVersion { token: String },
    /// Version token is older than the stored version.
    OutdatedVersion { supplied: u32, stored: u32 },
    /// Business number already belongs to another station.
    NumberExists { number: String },
    /// Persistence-layer failure.
    Repo(RepoError),
}

/// Coarse failure classes exposed to protocol adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PreconditionRequired,
    InvalidVersion,
    OutdatedVersion,
    BusinessKeyConflict,
    Internal,
}

impl ErrorKind {
    /// HTTP status adapters answer with for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::PreconditionRequired => 428,
            Self::InvalidVersion | Self::OutdatedVersion => 412,
            Self::BusinessKeyConflict => 422,
            Self::Internal => 500,
        }
    }
}

impl StationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::InvalidCriteria { .. } | Self::NoMatches { .. } => {
                ErrorKind::NotFound
            }
            Self::VersionRequired => ErrorKind::PreconditionRequired,
            Self::InvalidVersion { .. } => ErrorKind::InvalidVersion,
            Self::OutdatedVersion { .. } => ErrorKind::OutdatedVersion,
            Self::NumberExists { .. } => ErrorKind::BusinessKeyConflict,
            Self::Repo(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }
}

impl Display for StationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "no station with id {id}"),
            Self::InvalidCriteria { keys } => {
                write!(f, "invalid search criteria: {}", keys.join(", "))
            }
            Self::NoMatches { criteria } => write!(f, "no stations found for {criteria}"),
            Self::VersionRequired => write!(f, "version token is required"),
            Self::InvalidVersion { token } => write!(f, "invalid version token {token}"),
            Self::OutdatedVersion { supplied, stored } => write!(
                f,
                "version {supplied} is outdated, stored version is {stored}"
            ),
            Self::NumberExists { number } => {
                write!(f, "station number {number} already exists")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateNumber(number) => Self::NumberExists { number },
            other => Self::Repo(other),
        }
    }
}
