//! Emergency status engine shared by every medevac front end.
//!
//! This crate owns the one piece of the dispatch application that carries
//! real invariants: the lifecycle of an emergency request.
//!
//! - **[`EmergencyStatus`]**: closed set of lifecycle states. Legal moves
//!   between them live in the [`transition`] table, which is plain data and
//!   can be audited on its own.
//!
//! - **[`EmergencyStateEngine`]**: keyed store of per-emergency state.
//!   [`load()`](EmergencyStateEngine::load) restores or seeds a timeline,
//!   [`attempt_transition()`](EmergencyStateEngine::attempt_transition)
//!   validates, persists and only then commits a status change.
//!
//! - **[`KeyValueStore`]**: persistence seam. [`MemoryStore`],
//!   [`JsonFileStore`] and the [`RetryingStore`] decorator ship with the crate.
//!
//! - **[`EmergencyMonitor`]**: cancellable background tasks (elapsed-time
//!   ticker, distance feed) scoped to one emergency.
//!
//! - **Domain model** ([`model`]): [`StateChange`], [`StateHistory`] and the
//!   [`EmergencyRequest`] context types the host application renders.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod monitor;
pub mod proximity;
pub mod storage;
pub mod stream;
pub mod transition;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EngineConfig, MonitorConfig, RetryPolicy};
pub use engine::{EmergencySnapshot, EmergencyStateEngine, TransitionOutcome, elapsed_since_last};
pub use error::{CoreError, StorageError};
pub use monitor::EmergencyMonitor;
pub use proximity::{
    DistanceSample, PROXIMITY_THRESHOLD_KM, ProximityPolicy, TransitionRequest, haversine_km,
    proximity_auto_advance,
};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, RetryingStore};
pub use stream::EmergencyStream;
pub use transition::is_transition_allowed;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Coordinates, EmergencyContact, EmergencyId, EmergencyRequest, EmergencyStatus, EmergencyType,
    Location, PatientInfo, Priority, ServiceDetails, StateChange, StateHistory,
};
