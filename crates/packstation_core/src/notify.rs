//! Outbound notification after a station is created.
//!
//! # Invariants
//! - Notification runs after the creating transaction committed.
//! - A failed notification never undoes or fails the creation.

use crate::model::station::StationId;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// "Station created" message handed to a [`StationNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationCreated {
    pub id: StationId,
    pub number: String,
}

impl StationCreated {
    pub fn subject(&self) -> String {
        format!("Neue Packstation {}", self.id)
    }

    pub fn body(&self) -> String {
        format!(
            "Die Packstation mit der Nummer <strong>{}</strong> ist angelegt worden.",
            self.number
        )
    }
}

/// Delivery failure reported by a notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError(pub String);

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification failed: {}", self.0)
    }
}

impl Error for NotifyError {}

/// Collaborator that delivers station notifications (mail, queue, ...).
pub trait StationNotifier {
    fn station_created(&self, message: &StationCreated) -> Result<(), NotifyError>;
}

/// Default notifier: records the message in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl StationNotifier for LogNotifier {
    fn station_created(&self, message: &StationCreated) -> Result<(), NotifyError> {
        info!(
            "event=station_notify module=notify status=ok id={} subject={:?}",
            message.id,
            message.subject()
        );
        Ok(())
    }
}
