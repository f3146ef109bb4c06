// ── Emergency state engine ──
//
// One authoritative (status, history) pair per emergency id. A status
// change is persisted before it becomes visible: if the store refuses
// the write, memory and subscribers keep the previous state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{CoreError, StorageError};
use crate::model::{Coordinates, EmergencyId, EmergencyStatus, StateChange, StateHistory};
use crate::proximity::{ProximityPolicy, TransitionRequest};
use crate::storage::{KeyValueStore, RetryingStore, decode_stored, encode_history};
use crate::stream::EmergencyStream;
use crate::transition;

// ── Snapshot & outcome ───────────────────────────────────────────

/// Committed state of one emergency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencySnapshot {
    pub id: EmergencyId,
    pub status: EmergencyStatus,
    pub history: StateHistory,
}

impl EmergencySnapshot {
    fn from_history(id: EmergencyId, history: StateHistory) -> Option<Self> {
        let status = history.current_status()?;
        Some(Self {
            id,
            status,
            history,
        })
    }

    /// Time spent in the current status as of `now`.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        elapsed_since_last(&self.history, now)
    }
}

/// Result of [`EmergencyStateEngine::attempt_transition`].
///
/// `Rejected` and `Failed` are distinct so hosts can treat a stale button
/// press (ignore quietly) differently from a storage outage (retry banner).
#[derive(Debug)]
pub enum TransitionOutcome {
    /// The requested status is now current. `changed` is `false` for the
    /// same-state no-op, in which case the history was not touched.
    Applied {
        snapshot: EmergencySnapshot,
        changed: bool,
    },
    /// No edge in the transition table. Nothing was written.
    Rejected {
        from: EmergencyStatus,
        to: EmergencyStatus,
    },
    /// Validation passed but the store refused the write. Nothing changed.
    Failed(StorageError),
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    pub fn snapshot(&self) -> Option<&EmergencySnapshot> {
        match self {
            Self::Applied { snapshot, .. } => Some(snapshot),
            Self::Rejected { .. } | Self::Failed(_) => None,
        }
    }
}

/// Time elapsed between the newest history entry and `now`.
///
/// Zero for an empty history or a timestamp in the future.
pub fn elapsed_since_last(history: &StateHistory, now: DateTime<Utc>) -> Duration {
    history
        .last()
        .and_then(|change| (now - change.timestamp()).to_std().ok())
        .unwrap_or_default()
}

// ── Engine ───────────────────────────────────────────────────────

/// Keyed store of emergency state machines over a [`KeyValueStore`].
///
/// Cheaply cloneable via `Arc<EngineInner>`. Calls for the same emergency
/// are serialized internally, so the append-only order of the history
/// holds even if a host issues overlapping requests.
pub struct EmergencyStateEngine<S> {
    inner: Arc<EngineInner<S>>,
}

impl<S> Clone for EmergencyStateEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EngineInner<S> {
    store: S,
    config: EngineConfig,
    /// Committed snapshot per loaded emergency, broadcast to subscribers.
    slots: DashMap<EmergencyId, Arc<watch::Sender<Arc<EmergencySnapshot>>>>,
    /// Per-emergency single-flight gate around load and persist.
    gates: DashMap<EmergencyId, Arc<Mutex<()>>>,
}

impl<S: KeyValueStore> EmergencyStateEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                config,
                slots: DashMap::new(),
                gates: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Restore the timeline for `id`, or start one.
    ///
    /// With no stored record, a single `initial` entry (default `PENDING`)
    /// is persisted and returned. With a stored record, the current status
    /// is its last entry and `initial` is ignored.
    pub async fn load(
        &self,
        id: &EmergencyId,
        initial: Option<EmergencyStatus>,
    ) -> Result<EmergencySnapshot, StorageError> {
        let initial = initial.unwrap_or(EmergencyStatus::Pending);
        let gate = self.gate(id);
        let _guard = gate.lock().await;

        let key = id.timeline_key();
        let stored = self.inner.store.get(&key).await?;

        let history = match stored {
            None => {
                debug!(%id, %initial, "no stored timeline, seeding");
                self.seed(&key, initial).await?
            }
            Some(raw) => match decode_stored(&key, &raw)? {
                Some(history) => history,
                None => {
                    error!(
                        %id,
                        %initial,
                        "stored timeline has no current status, re-seeding with initial status"
                    );
                    self.seed(&key, initial).await?
                }
            },
        };

        let Some(snapshot) = EmergencySnapshot::from_history(id.clone(), history) else {
            // `seed` never yields an empty history.
            return Err(StorageError::Corrupt {
                key,
                reason: "timeline has no entries".into(),
            });
        };

        info!(
            %id,
            status = %snapshot.status,
            entries = snapshot.history.len(),
            "emergency loaded"
        );
        self.publish(snapshot.clone());
        Ok(snapshot)
    }

    /// Forget the in-memory state for `id`. The stored timeline is kept.
    ///
    /// Subscribers see their stream end. The gate stays, so a later `load`
    /// still waits for a transition that was in flight at disposal.
    pub fn dispose(&self, id: &EmergencyId) -> bool {
        let removed = self.inner.slots.remove(id).is_some();
        if removed {
            debug!(%id, "emergency disposed");
        }
        removed
    }

    /// Ids currently held in memory.
    pub fn loaded_ids(&self) -> Vec<EmergencyId> {
        let mut ids: Vec<_> = self.inner.slots.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn snapshot(&self, id: &EmergencyId) -> Option<EmergencySnapshot> {
        self.inner
            .slots
            .get(id)
            .map(|slot| EmergencySnapshot::clone(&slot.borrow()))
    }

    pub fn current_status(&self, id: &EmergencyId) -> Option<EmergencyStatus> {
        self.inner.slots.get(id).map(|slot| slot.borrow().status)
    }

    pub fn history(&self, id: &EmergencyId) -> Option<StateHistory> {
        self.inner
            .slots
            .get(id)
            .map(|slot| slot.borrow().history.clone())
    }

    /// Time spent in the current status, `None` if `id` is not loaded.
    pub fn elapsed_in_current_state(&self, id: &EmergencyId) -> Option<Duration> {
        self.inner
            .slots
            .get(id)
            .map(|slot| slot.borrow().elapsed_at(Utc::now()))
    }

    /// Subscribe to committed changes for `id`.
    pub fn subscribe(&self, id: &EmergencyId) -> Option<EmergencyStream> {
        self.inner
            .slots
            .get(id)
            .map(|slot| EmergencyStream::new(slot.subscribe()))
    }

    /// Informational table lookup; see [`transition::is_transition_allowed`].
    pub fn is_transition_allowed(&self, from: EmergencyStatus, to: EmergencyStatus) -> bool {
        transition::is_transition_allowed(from, to)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Validate, persist and commit a status change.
    ///
    /// Only an unloaded `id` is an error. Business outcomes (no-op,
    /// rejection, storage refusal) are reported through [`TransitionOutcome`].
    pub async fn attempt_transition(
        &self,
        id: &EmergencyId,
        new_status: EmergencyStatus,
        location: Option<Coordinates>,
        notes: Option<String>,
    ) -> Result<TransitionOutcome, CoreError> {
        let gate = self.gate(id);
        let _guard = gate.lock().await;

        let current = self.committed(id)?;
        let from = current.status;

        if from == new_status {
            debug!(%id, status = %from, "same-state transition, nothing to do");
            return Ok(TransitionOutcome::Applied {
                snapshot: EmergencySnapshot::clone(&current),
                changed: false,
            });
        }

        if !transition::is_transition_allowed(from, new_status) {
            warn!(%id, %from, to = %new_status, "transition not allowed");
            return Ok(TransitionOutcome::Rejected {
                from,
                to: new_status,
            });
        }

        let change = StateChange::new(new_status, Utc::now(), location, notes);
        let history = current.history.appended(change);
        let key = id.timeline_key();

        let persisted = match encode_history(&key, &history) {
            Ok(raw) => self.inner.store.set(&key, raw).await,
            Err(e) => Err(e),
        };
        if let Err(e) = persisted {
            error!(%id, %from, to = %new_status, error = %e, "failed to persist transition");
            return Ok(TransitionOutcome::Failed(e));
        }

        let snapshot = EmergencySnapshot {
            id: id.clone(),
            status: new_status,
            history,
        };
        if self.commit(snapshot.clone()) {
            info!(%id, %from, to = %new_status, "transition applied");
        } else {
            info!(%id, %from, to = %new_status, "transition persisted after disposal");
        }

        Ok(TransitionOutcome::Applied {
            snapshot,
            changed: true,
        })
    }

    /// Route a policy suggestion through [`attempt_transition`](Self::attempt_transition).
    pub async fn apply_request(
        &self,
        id: &EmergencyId,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, CoreError> {
        self.attempt_transition(id, request.target, request.location, request.notes)
            .await
    }

    /// Feed one distance reading into the proximity policy.
    ///
    /// Returns `None` when the policy suggests nothing for the current status.
    pub async fn advance_for_distance(
        &self,
        id: &EmergencyId,
        distance_km: f64,
        location: Option<Coordinates>,
    ) -> Result<Option<TransitionOutcome>, CoreError> {
        let status = self.current_status(id).ok_or_else(|| CoreError::NotLoaded {
            id: id.to_string(),
        })?;
        let policy = ProximityPolicy::new(self.inner.config.monitor.proximity_threshold_km);

        let Some(request) = policy.evaluate(status, distance_km, location) else {
            return Ok(None);
        };
        debug!(%id, distance_km, "proximity threshold reached");
        self.apply_request(id, request).await.map(Some)
    }

    // ── Private helpers ──────────────────────────────────────────

    fn gate(&self, id: &EmergencyId) -> Arc<Mutex<()>> {
        Arc::clone(self.inner.gates.entry(id.clone()).or_default().value())
    }

    fn committed(&self, id: &EmergencyId) -> Result<Arc<EmergencySnapshot>, CoreError> {
        self.inner
            .slots
            .get(id)
            .map(|slot| Arc::clone(&slot.borrow()))
            .ok_or_else(|| CoreError::NotLoaded { id: id.to_string() })
    }

    async fn seed(
        &self,
        key: &str,
        initial: EmergencyStatus,
    ) -> Result<StateHistory, StorageError> {
        let history = StateHistory::seeded(initial, Utc::now());
        let raw = encode_history(key, &history)?;
        self.inner.store.set(key, raw).await?;
        Ok(history)
    }

    /// Install a loaded snapshot, creating the slot if needed.
    fn publish(&self, snapshot: EmergencySnapshot) {
        let snapshot = Arc::new(snapshot);
        if self.replace(&snapshot) {
            return;
        }
        let id = snapshot.id.clone();
        let (tx, _) = watch::channel(snapshot);
        self.inner.slots.insert(id, Arc::new(tx));
    }

    /// Broadcast a committed transition. A disposed emergency stays disposed.
    fn commit(&self, snapshot: EmergencySnapshot) -> bool {
        self.replace(&Arc::new(snapshot))
    }

    fn replace(&self, snapshot: &Arc<EmergencySnapshot>) -> bool {
        match self.inner.slots.get(&snapshot.id) {
            Some(slot) => {
                slot.send_replace(Arc::clone(snapshot));
                true
            }
            None => false,
        }
    }
}

impl<S: KeyValueStore> EmergencyStateEngine<RetryingStore<S>> {
    /// Engine whose store retries transient failures per `config.retry`.
    pub fn with_retry(store: S, config: EngineConfig) -> Self {
        let retrying = RetryingStore::new(store, config.retry);
        Self::with_config(retrying, config)
    }
}
