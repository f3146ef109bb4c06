// ── Append-only status timeline ──
//
// `StateChange` records are created once per committed transition and
// never mutated. `StateHistory` only grows; insertion order is
// chronological order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::EmergencyStatus;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One committed status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    status: EmergencyStatus,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl StateChange {
    pub fn new(
        status: EmergencyStatus,
        timestamp: DateTime<Utc>,
        location: Option<Coordinates>,
        notes: Option<String>,
    ) -> Self {
        Self {
            status,
            timestamp,
            location,
            notes,
        }
    }

    pub fn status(&self) -> EmergencyStatus {
        self.status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn location(&self) -> Option<Coordinates> {
        self.location
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

/// Ordered, append-only list of [`StateChange`] records for one emergency.
///
/// Persisted as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateHistory(Vec<StateChange>);

impl StateHistory {
    /// Single-entry history marking the starting status.
    pub fn seeded(initial: EmergencyStatus, at: DateTime<Utc>) -> Self {
        Self(vec![StateChange::new(
            initial,
            at,
            None,
            Some("initial state".into()),
        )])
    }

    pub fn entries(&self) -> &[StateChange] {
        &self.0
    }

    pub fn last(&self) -> Option<&StateChange> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Status of the newest entry.
    pub fn current_status(&self) -> Option<EmergencyStatus> {
        self.last().map(StateChange::status)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StateChange> {
        self.0.iter()
    }

    /// Copy of this history with `change` appended. The receiver is left
    /// untouched so a failed persist can be discarded without rollback.
    pub(crate) fn appended(&self, change: StateChange) -> Self {
        let mut entries = Vec::with_capacity(self.0.len() + 1);
        entries.extend(self.0.iter().cloned());
        entries.push(change);
        Self(entries)
    }
}

impl<'a> IntoIterator for &'a StateHistory {
    type Item = &'a StateChange;
    type IntoIter = std::slice::Iter<'a, StateChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
