// ── Emergency request context types ──
//
// The dispatch record the host application renders. The engine only ever
// reads or writes `status` and `service_details.state_history`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::emergency_id::EmergencyId;
use super::status::EmergencyStatus;
use super::timeline::{Coordinates, StateHistory};
use crate::engine::EmergencySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergencyType {
    Cardiac,
    Trauma,
    Respiratory,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Incident address with crew-facing access hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(flatten)]
    pub coordinates: Coordinates,
    pub address: Option<String>,
    pub reference: Option<String>,
    pub building_details: Option<String>,
    pub access_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    pub name: String,
    pub age: Option<u16>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub blood_type: Option<String>,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    pub preferred_language: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
}

/// Service record attached once a crew takes the emergency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetails {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Total service time, filled in when the emergency completes.
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub state_history: StateHistory,
}

/// A dispatched incident tracked from creation to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRequest {
    pub id: EmergencyId,
    #[serde(rename = "type")]
    pub emergency_type: EmergencyType,
    pub status: EmergencyStatus,
    pub priority: Priority,
    pub location: Location,
    pub patient_info: PatientInfo,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Last reported distance to the incident, in kilometres.
    pub distance_km: Option<f64>,
    /// Free-text notes from dispatch, separate from per-transition notes.
    #[serde(default)]
    pub notes: Vec<String>,
    pub service_details: Option<ServiceDetails>,
}

impl EmergencyRequest {
    /// Copy the engine's view of this emergency into the request record.
    ///
    /// Writes `status` and the timeline; stamps `accepted_at` and
    /// `completed_at` from the timeline the first time those statuses appear.
    pub fn apply_snapshot(&mut self, snapshot: &EmergencySnapshot) {
        self.status = snapshot.status;

        for change in &snapshot.history {
            if change.status().is_assigned() && self.accepted_at.is_none() {
                self.accepted_at = Some(change.timestamp());
            }
            if change.status() == EmergencyStatus::Completed && self.completed_at.is_none() {
                self.completed_at = Some(change.timestamp());
            }
        }

        let start = snapshot
            .history
            .entries()
            .first()
            .map_or(self.created_at, |c| c.timestamp());
        let details = self.service_details.get_or_insert_with(|| ServiceDetails {
            start_time: start,
            end_time: None,
            duration_secs: None,
            notes: Vec::new(),
            state_history: StateHistory::default(),
        });
        details.state_history = snapshot.history.clone();

        if snapshot.status.is_terminal() && details.end_time.is_none() {
            let end = snapshot
                .history
                .last()
                .map_or(details.start_time, |c| c.timestamp());
            details.end_time = Some(end);
            details.duration_secs = (end - details.start_time).to_std().ok().map(|d| d.as_secs());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::model::StateChange;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap()
    }

    fn request() -> EmergencyRequest {
        EmergencyRequest {
            id: EmergencyId::new("EMG-001").unwrap(),
            emergency_type: EmergencyType::Cardiac,
            status: EmergencyStatus::Pending,
            priority: Priority::High,
            location: Location {
                coordinates: Coordinates::new(19.4326, -99.1332),
                address: Some("Av. Reforma 222".into()),
                reference: None,
                building_details: Some("Floor 3".into()),
                access_notes: None,
            },
            patient_info: PatientInfo {
                name: "Juan Perez".into(),
                age: Some(65),
                ..PatientInfo::default()
            },
            description: "Chest pain".into(),
            created_at: at(0),
            accepted_at: None,
            completed_at: None,
            distance_km: Some(2.5),
            notes: vec!["Caller on scene".into()],
            service_details: None,
        }
    }

    #[test]
    fn apply_snapshot_writes_status_and_timeline() {
        let history = StateHistory::seeded(EmergencyStatus::Pending, at(1))
            .appended(StateChange::new(EmergencyStatus::Active, at(2), None, None));
        let snapshot = EmergencySnapshot {
            id: EmergencyId::new("EMG-001").unwrap(),
            status: EmergencyStatus::Active,
            history,
        };

        let mut req = request();
        req.apply_snapshot(&snapshot);

        assert_eq!(req.status, EmergencyStatus::Active);
        assert_eq!(req.accepted_at, Some(at(2)));
        assert!(req.completed_at.is_none());
        let details = req.service_details.unwrap();
        assert_eq!(details.start_time, at(1));
        assert_eq!(details.state_history.len(), 2);
        assert!(details.end_time.is_none());
    }

    #[test]
    fn apply_snapshot_closes_service_on_completion() {
        let history = StateHistory::seeded(EmergencyStatus::OnSite, at(10))
            .appended(StateChange::new(EmergencyStatus::Completed, at(40), None, None));
        let snapshot = EmergencySnapshot {
            id: EmergencyId::new("EMG-001").unwrap(),
            status: EmergencyStatus::Completed,
            history,
        };

        let mut req = request();
        req.apply_snapshot(&snapshot);

        assert_eq!(req.completed_at, Some(at(40)));
        let details = req.service_details.unwrap();
        assert_eq!(details.end_time, Some(at(40)));
        assert_eq!(details.duration_secs, Some(30 * 60));
    }

    #[test]
    fn request_uses_camel_case_layout() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["type"], "CARDIAC");
        assert_eq!(json["patientInfo"]["name"], "Juan Perez");
        assert_eq!(json["location"]["latitude"], 19.4326);
        assert_eq!(json["location"]["buildingDetails"], "Floor 3");
    }

    #[test]
    fn request_notes_are_optional() {
        let mut json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["notes"], serde_json::json!(["Caller on scene"]));

        json.as_object_mut().unwrap().remove("notes");
        let req: EmergencyRequest = serde_json::from_value(json).unwrap();
        assert!(req.notes.is_empty());
        assert_eq!(req.description, "Chest pain");
    }
}
