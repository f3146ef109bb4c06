// ── Persistence seam ──
//
// The engine persists each emergency's timeline as one JSON string under
// `emergency_<id>_timeline`. Anything with async get/set semantics can
// back it.

mod file;
mod memory;
mod retry;

use std::future::Future;
use std::sync::Arc;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use retry::RetryingStore;

use serde::Deserialize;

use crate::error::StorageError;
use crate::model::{EmergencyStatus, StateHistory};

/// Durable string key-value storage.
///
/// Calls for one key are never issued concurrently by the engine, so
/// implementations need no per-key locking of their own.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Fetch the value stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl<S: KeyValueStore> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).set(key, value)
    }
}

// ── Timeline codec ──────────────────────────────────────────────────

pub(crate) fn encode_history(key: &str, history: &StateHistory) -> Result<String, StorageError> {
    serde_json::to_string(history).map_err(|e| StorageError::Serialization {
        key: key.to_owned(),
        reason: e.to_string(),
    })
}

pub(crate) fn decode_history(key: &str, raw: &str) -> Result<StateHistory, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Corrupt {
        key: key.to_owned(),
        reason: e.to_string(),
    })
}

/// Decode a stored timeline for loading.
///
/// `Ok(None)` marks a JSON array with no usable current status: empty, or
/// its last entry lacks a valid `status`. Anything else that does not
/// decode is [`StorageError::Corrupt`].
pub(crate) fn decode_stored(key: &str, raw: &str) -> Result<Option<StateHistory>, StorageError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| StorageError::Corrupt {
            key: key.to_owned(),
            reason: e.to_string(),
        })?;

    let Some(entries) = value.as_array() else {
        return Err(StorageError::Corrupt {
            key: key.to_owned(),
            reason: "timeline is not a JSON array".into(),
        });
    };
    let last_status = entries
        .last()
        .and_then(|entry| entry.get("status"))
        .and_then(|status| EmergencyStatus::deserialize(status).ok());
    if last_status.is_none() {
        return Ok(None);
    }

    decode_history(key, raw).map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn codec_round_trips_timestamps() {
        let history = StateHistory::seeded(EmergencyStatus::Pending, Utc::now());
        let raw = encode_history("k", &history).unwrap();
        assert_eq!(decode_history("k", &raw).unwrap(), history);
    }

    #[test]
    fn decode_reports_corruption_with_key() {
        let err = decode_history("emergency_E9_timeline", "{not json").unwrap_err();
        assert!(
            matches!(err, StorageError::Corrupt { ref key, .. } if key == "emergency_E9_timeline")
        );
    }

    #[test]
    fn decode_rejects_unknown_status() {
        let raw = r#"[{"status":"TELEPORTED","timestamp":"2024-05-01T12:00:00Z"}]"#;
        assert!(decode_history("k", raw).is_err());
    }

    #[test]
    fn stored_timeline_without_current_status_is_unusable() {
        assert!(decode_stored("k", "[]").unwrap().is_none());
        let no_status = r#"[{"timestamp":"2024-05-01T12:00:00Z"}]"#;
        assert!(decode_stored("k", no_status).unwrap().is_none());
        let bad_status = r#"[{"status":"TELEPORTED","timestamp":"2024-05-01T12:00:00Z"}]"#;
        assert!(decode_stored("k", bad_status).unwrap().is_none());
    }

    #[test]
    fn stored_timeline_still_reports_corruption() {
        for raw in ["{not json", r#"{"status":"PENDING"}"#, r#"[{"status":"PENDING"}]"#] {
            let err = decode_stored("k", raw).unwrap_err();
            assert!(matches!(err, StorageError::Corrupt { .. }), "{raw}: {err:?}");
        }
    }

    #[test]
    fn stored_timeline_decodes_valid_history() {
        let history = StateHistory::seeded(EmergencyStatus::Accepted, Utc::now());
        let raw = encode_history("k", &history).unwrap();
        assert_eq!(decode_stored("k", &raw).unwrap(), Some(history));
    }
}
