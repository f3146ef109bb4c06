// ── Proximity auto-advance policy ──
//
// Distance samples only ever produce a *suggestion*. Suggestions go
// through `attempt_transition` like any manual request, so the transition
// table and the same-state rule still apply.

use serde::{Deserialize, Serialize};

use crate::model::{Coordinates, EmergencyId, EmergencyStatus};

/// Crews within this distance (km) of the incident are considered arriving.
pub const PROXIMITY_THRESHOLD_KM: f64 = 0.5;

/// Notes attached to automatic `ARRIVING` transitions.
pub const AUTO_ARRIVING_NOTES: &str = "automatic: within proximity threshold";

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A status change requested by a policy rather than a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub target: EmergencyStatus,
    pub location: Option<Coordinates>,
    pub notes: Option<String>,
}

/// One reading from the distance feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSample {
    pub emergency_id: EmergencyId,
    pub distance_km: f64,
    /// Crew position when the sample was taken, if known.
    pub location: Option<Coordinates>,
}

/// Threshold-based auto-advance from `IN_PROGRESS` to `ARRIVING`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityPolicy {
    pub threshold_km: f64,
}

impl Default for ProximityPolicy {
    fn default() -> Self {
        Self {
            threshold_km: PROXIMITY_THRESHOLD_KM,
        }
    }
}

impl ProximityPolicy {
    pub fn new(threshold_km: f64) -> Self {
        Self { threshold_km }
    }

    /// Suggest a transition for `status` at `distance_km`, if any.
    ///
    /// Only `IN_PROGRESS` is eligible. Negative or non-finite distances are
    /// treated as bad readings and ignored.
    pub fn evaluate(
        &self,
        status: EmergencyStatus,
        distance_km: f64,
        location: Option<Coordinates>,
    ) -> Option<TransitionRequest> {
        if status != EmergencyStatus::InProgress {
            return None;
        }
        if !distance_km.is_finite() || distance_km < 0.0 {
            return None;
        }
        (distance_km <= self.threshold_km).then(|| TransitionRequest {
            target: EmergencyStatus::Arriving,
            location,
            notes: Some(AUTO_ARRIVING_NOTES.into()),
        })
    }
}

/// [`ProximityPolicy::evaluate`] with the default 500 m threshold.
pub fn proximity_auto_advance(
    status: EmergencyStatus,
    distance_km: f64,
) -> Option<TransitionRequest> {
    ProximityPolicy::default().evaluate(status, distance_km, None)
}

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn in_progress_within_threshold_suggests_arriving() {
        let req = proximity_auto_advance(EmergencyStatus::InProgress, 0.4).unwrap();
        assert_eq!(req.target, EmergencyStatus::Arriving);
        assert_eq!(req.notes.as_deref(), Some(AUTO_ARRIVING_NOTES));
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(proximity_auto_advance(EmergencyStatus::InProgress, 0.5).is_some());
    }

    #[test]
    fn beyond_threshold_suggests_nothing() {
        assert!(proximity_auto_advance(EmergencyStatus::InProgress, 0.6).is_none());
    }

    #[test]
    fn other_states_are_not_eligible() {
        assert!(proximity_auto_advance(EmergencyStatus::OnSite, 0.1).is_none());
        assert!(proximity_auto_advance(EmergencyStatus::Accepted, 0.1).is_none());
        assert!(proximity_auto_advance(EmergencyStatus::Arriving, 0.1).is_none());
    }

    #[test]
    fn bad_readings_are_ignored() {
        assert!(proximity_auto_advance(EmergencyStatus::InProgress, f64::NAN).is_none());
        assert!(proximity_auto_advance(EmergencyStatus::InProgress, -0.1).is_none());
    }

    #[test]
    fn custom_threshold_carries_location() {
        let here = Coordinates::new(19.43, -99.13);
        let policy = ProximityPolicy::new(1.0);
        let req = policy
            .evaluate(EmergencyStatus::InProgress, 0.9, Some(here))
            .unwrap();
        assert_eq!(req.location, Some(here));
    }

    #[test]
    fn haversine_known_distances() {
        let madrid = Coordinates::new(40.4168, -3.7038);
        let barcelona = Coordinates::new(41.3874, 2.1686);
        let d = haversine_km(madrid, barcelona);
        assert!((d - 505.0).abs() < 5.0, "got {d}");

        assert!(haversine_km(madrid, madrid).abs() < f64::EPSILON);
    }
}
