// ── Per-emergency background tasks ──
//
// Elapsed-time ticker and distance-feed consumer for one emergency,
// sharing a cancellation token. Both stop on cancel, on disposal of the
// emergency, or once it reaches a terminal status.

use std::time::Duration;

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{EmergencyStateEngine, TransitionOutcome};
use crate::error::CoreError;
use crate::model::{EmergencyId, EmergencyStatus};
use crate::proximity::DistanceSample;
use crate::storage::KeyValueStore;

/// Handle to the background tasks watching one emergency.
///
/// Dropping the handle cancels the tasks; [`shutdown()`](Self::shutdown)
/// also waits for them to finish.
pub struct EmergencyMonitor {
    id: EmergencyId,
    cancel: CancellationToken,
    elapsed: watch::Receiver<Duration>,
    handles: Vec<JoinHandle<()>>,
}

impl EmergencyMonitor {
    /// Start the elapsed-time ticker for a loaded emergency.
    pub fn spawn<S: KeyValueStore>(
        engine: &EmergencyStateEngine<S>,
        id: EmergencyId,
    ) -> Result<Self, CoreError> {
        Self::start(engine, id, None::<futures_util::stream::Empty<DistanceSample>>)
    }

    /// Start the ticker plus a consumer for `feed`, routing proximity
    /// suggestions through the engine.
    pub fn spawn_with_feed<S, F>(
        engine: &EmergencyStateEngine<S>,
        id: EmergencyId,
        feed: F,
    ) -> Result<Self, CoreError>
    where
        S: KeyValueStore,
        F: Stream<Item = DistanceSample> + Send + 'static,
    {
        Self::start(engine, id, Some(feed))
    }

    fn start<S, F>(
        engine: &EmergencyStateEngine<S>,
        id: EmergencyId,
        feed: Option<F>,
    ) -> Result<Self, CoreError>
    where
        S: KeyValueStore,
        F: Stream<Item = DistanceSample> + Send + 'static,
    {
        let initial = engine
            .elapsed_in_current_state(&id)
            .ok_or_else(|| CoreError::NotLoaded { id: id.to_string() })?;

        let cancel = CancellationToken::new();
        let (elapsed_tx, elapsed) = watch::channel(initial);
        let tick = engine.config().monitor.tick;

        let mut handles = vec![tokio::spawn(elapsed_task(
            engine.clone(),
            id.clone(),
            tick,
            elapsed_tx,
            cancel.clone(),
        ))];
        if let Some(feed) = feed {
            handles.push(tokio::spawn(proximity_task(
                engine.clone(),
                id.clone(),
                feed,
                cancel.clone(),
            )));
        }

        debug!(%id, tasks = handles.len(), "monitor started");
        Ok(Self {
            id,
            cancel,
            elapsed,
            handles,
        })
    }

    pub fn id(&self) -> &EmergencyId {
        &self.id
    }

    /// Time in the current status, refreshed every tick.
    pub fn elapsed(&self) -> watch::Receiver<Duration> {
        self.elapsed.clone()
    }

    /// Whether every background task has exited.
    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(JoinHandle::is_finished)
    }

    /// Wait for the tasks to stop on their own (terminal status, feed end).
    pub async fn join(mut self) {
        self.reap().await;
    }

    /// Cancel the tasks and wait for them to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        self.reap().await;
        debug!(id = %self.id, "monitor stopped");
    }

    async fn reap(&mut self) {
        for handle in std::mem::take(&mut self.handles) {
            if let Err(e) = handle.await {
                warn!(id = %self.id, error = %e, "monitor task ended abnormally");
            }
        }
    }
}

impl Drop for EmergencyMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Publishes time-in-status every `period`; resets on each commit.
async fn elapsed_task<S: KeyValueStore>(
    engine: EmergencyStateEngine<S>,
    id: EmergencyId,
    period: Duration,
    elapsed_tx: watch::Sender<Duration>,
    cancel: CancellationToken,
) {
    let Some(mut updates) = engine.subscribe(&id) else {
        return;
    };
    if updates.current().status.is_terminal() {
        return;
    }

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = updates.changed() => {
                let Some(snapshot) = changed else {
                    debug!(%id, "emergency disposed, stopping ticker");
                    break;
                };
                elapsed_tx.send_replace(Duration::ZERO);
                if snapshot.status.is_terminal() {
                    debug!(%id, status = %snapshot.status, "terminal status, stopping ticker");
                    break;
                }
            }
            _ = interval.tick() => {
                let Some(elapsed) = engine.elapsed_in_current_state(&id) else {
                    break;
                };
                elapsed_tx.send_replace(elapsed);
            }
        }
    }
}

/// Feeds distance samples for `id` into the proximity policy.
async fn proximity_task<S, F>(
    engine: EmergencyStateEngine<S>,
    id: EmergencyId,
    feed: F,
    cancel: CancellationToken,
) where
    S: KeyValueStore,
    F: Stream<Item = DistanceSample> + Send + 'static,
{
    let mut feed = std::pin::pin!(feed);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sample = feed.next() => {
                let Some(sample) = sample else {
                    debug!(%id, "distance feed ended");
                    break;
                };
                if sample.emergency_id == id {
                    handle_sample(&engine, &id, &sample).await;
                }
                if engine.current_status(&id).is_none_or(EmergencyStatus::is_terminal) {
                    break;
                }
            }
        }
    }
}

async fn handle_sample<S: KeyValueStore>(
    engine: &EmergencyStateEngine<S>,
    id: &EmergencyId,
    sample: &DistanceSample,
) {
    match engine
        .advance_for_distance(id, sample.distance_km, sample.location)
        .await
    {
        Ok(None) => {}
        Ok(Some(TransitionOutcome::Applied { snapshot, changed })) => {
            if changed {
                info!(%id, status = %snapshot.status, distance_km = sample.distance_km, "proximity auto-advance");
            }
        }
        Ok(Some(TransitionOutcome::Rejected { from, to })) => {
            debug!(%id, %from, %to, "proximity suggestion rejected");
        }
        Ok(Some(TransitionOutcome::Failed(e))) => {
            warn!(%id, error = %e, "proximity auto-advance not persisted");
        }
        Err(e) => {
            warn!(%id, error = %e, "proximity sample for unloaded emergency");
        }
    }
}
