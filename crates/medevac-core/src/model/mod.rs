// ── Domain model ──

pub mod emergency_id;
pub mod request;
pub mod status;
pub mod timeline;

pub use emergency_id::EmergencyId;
pub use request::{
    EmergencyContact, EmergencyRequest, EmergencyType, Location, PatientInfo, Priority,
    ServiceDetails,
};
pub use status::EmergencyStatus;
pub use timeline::{Coordinates, StateChange, StateHistory};
