//! Status synchronization for submitted generation jobs.
//!
//! Polling is the source of truth: the loop fetches status, reports it, and
//! schedules the next fetch a fixed interval after the previous one
//! *completed*, so slow responses can never overlap in-flight requests.
//! Push-channel events are forwarded to the consumer as they arrive, in
//! receipt order; a terminal push event additionally cuts the current delay
//! short so the verifying fetch happens immediately. Terminal resolution
//! happens only through the polled snapshot, so duplicate terminal events
//! are no-ops.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use reelgen_api::ApiError;
use reelgen_types::{GenerationStatus, GenerationStatusResponse, PushEvent};

use crate::backend::GenerationBackend;
use crate::push::PushSubscription;

/// Delay between status fetches, measured from completion of the previous
/// fetch.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Failure modes of job tracking.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The job reached a terminal state other than `completed`. Resubmitting
    /// the same job id cannot help; the caller must create a new job.
    #[error("generation {generation_id} ended as {status}")]
    Terminal {
        generation_id: String,
        status: GenerationStatus,
    },
    /// A fetch failed at the transport or protocol level. Polling does not
    /// silently retry past this; the caller decides whether to re-track.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The tracking loop was cancelled before reaching a terminal state.
    #[error("tracking was cancelled")]
    Cancelled,
}

/// Poll `generation_id` until it reaches a terminal state.
///
/// `on_update` runs once per fetch with the full response; consumers must
/// tolerate repeated identical updates. Resolves on `completed`, rejects on
/// `failed`/`cancelled` or on the first fetch error.
pub async fn poll_until_terminal<F>(
    backend: &dyn GenerationBackend,
    generation_id: &str,
    interval: Duration,
    mut on_update: F,
) -> Result<GenerationStatusResponse, TrackError>
where
    F: FnMut(&GenerationStatusResponse),
{
    loop {
        let response = backend.get_generation(generation_id).await?;
        on_update(&response);

        match response.status {
            GenerationStatus::Completed => return Ok(response),
            status if status.is_terminal() => {
                return Err(TrackError::Terminal {
                    generation_id: generation_id.to_string(),
                    status,
                });
            }
            _ => {}
        }

        sleep(interval).await;
    }
}

/// Update delivered by [`track`].
///
/// Polled snapshots and push-channel events are interleaved in the order
/// they arrive; terminal resolution always goes through a snapshot.
#[derive(Clone, Debug)]
pub enum TrackUpdate {
    /// Full snapshot from a status fetch.
    Snapshot(GenerationStatusResponse),
    /// Fine-grained event from the push channel.
    Event(PushEvent),
}

/// Follow a job to its terminal state using polling, with an optional push
/// subscription delivering fine-grained events between fetches.
///
/// Push events are forwarded to `on_update` as they arrive, in receipt
/// order; a terminal event additionally cuts the poll delay short so the
/// verifying fetch happens immediately. When the push channel ends without
/// a terminal event (reconnects exhausted, connect timeout), tracking
/// degrades to polling alone.
pub async fn track<F>(
    backend: &dyn GenerationBackend,
    generation_id: &str,
    interval: Duration,
    mut push: Option<PushSubscription>,
    mut on_update: F,
) -> Result<GenerationStatusResponse, TrackError>
where
    F: FnMut(TrackUpdate),
{
    loop {
        let response = backend.get_generation(generation_id).await?;
        on_update(TrackUpdate::Snapshot(response.clone()));

        match response.status {
            GenerationStatus::Completed => return Ok(response),
            status if status.is_terminal() => {
                return Err(TrackError::Terminal {
                    generation_id: generation_id.to_string(),
                    status,
                });
            }
            _ => {}
        }

        let mut push_ended = false;
        match push.as_mut() {
            Some(subscription) => {
                let deadline = sleep(interval);
                tokio::pin!(deadline);
                loop {
                    tokio::select! {
                        _ = &mut deadline => break,
                        event = subscription.next_event() => match event {
                            Some(event) => {
                                debug!(%generation_id, kind = ?event.kind, "push event received");
                                let terminal = event.kind.is_terminal();
                                on_update(TrackUpdate::Event(event));
                                if terminal {
                                    // Verify through the status machine right away.
                                    break;
                                }
                            }
                            None => {
                                push_ended = true;
                                break;
                            }
                        },
                    }
                }
            }
            None => sleep(interval).await,
        }
        if push_ended {
            debug!(%generation_id, "push channel ended; continuing on polling alone");
            push = None;
        }
    }
}

/// Owns at most one running tracking loop.
///
/// Starting a new job cancels the previous loop and drops its push
/// subscription (which unsubscribes) before the new one begins, so exactly
/// one job is ever tracked per instance.
pub struct Tracker {
    backend: Arc<dyn GenerationBackend>,
    interval: Duration,
    active: Option<ActiveTrack>,
}

struct ActiveTrack {
    generation_id: String,
    handle: JoinHandle<Result<GenerationStatusResponse, TrackError>>,
}

impl Tracker {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            interval: DEFAULT_POLL_INTERVAL,
            active: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Begin tracking `generation_id`, cancelling any previous job first.
    pub fn start<F>(&mut self, generation_id: &str, push: Option<PushSubscription>, on_update: F)
    where
        F: FnMut(TrackUpdate) + Send + 'static,
    {
        self.stop();

        let backend = Arc::clone(&self.backend);
        let interval = self.interval;
        let id = generation_id.to_string();
        let handle = tokio::spawn(async move { track(backend.as_ref(), &id, interval, push, on_update).await });

        self.active = Some(ActiveTrack {
            generation_id: generation_id.to_string(),
            handle,
        });
    }

    /// Cancel the running loop, if any.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(generation_id = %active.generation_id, "cancelling tracking loop");
            active.handle.abort();
        }
    }

    /// Id of the job currently being tracked.
    pub fn active_generation_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.generation_id.as_str())
    }

    /// Wait for the active loop to finish. Returns `Cancelled` when no loop
    /// is active or the loop was aborted.
    pub async fn wait(&mut self) -> Result<GenerationStatusResponse, TrackError> {
        let Some(active) = self.active.take() else {
            return Err(TrackError::Cancelled);
        };
        match active.handle.await {
            Ok(result) => result,
            Err(_join_error) => Err(TrackError::Cancelled),
        }
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use reelgen_types::PushEventType;

    const FAST: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn resolves_on_third_fetch_and_stops() {
        let backend = ScriptedBackend::new();
        backend.push_status(Ok(ScriptedBackend::status("gen-1", GenerationStatus::Queued)));
        backend.push_status(Ok(ScriptedBackend::status("gen-1", GenerationStatus::Processing)));
        backend.push_status(Ok(ScriptedBackend::status("gen-1", GenerationStatus::Completed)));

        let mut seen = Vec::new();
        let response = poll_until_terminal(&backend, "gen-1", FAST, |update| seen.push(update.status))
            .await
            .unwrap();

        assert_eq!(response.status, GenerationStatus::Completed);
        assert_eq!(backend.status_call_count(), 3, "no fourth fetch may occur");
        assert_eq!(
            seen,
            vec![GenerationStatus::Queued, GenerationStatus::Processing, GenerationStatus::Completed]
        );
    }

    #[tokio::test]
    async fn rejects_on_failed_with_job_identity() {
        let backend = ScriptedBackend::new();
        backend.push_status(Ok(ScriptedBackend::status("gen-2", GenerationStatus::Failed)));

        let error = poll_until_terminal(&backend, "gen-2", FAST, |_| {}).await.unwrap_err();

        match error {
            TrackError::Terminal { generation_id, status } => {
                assert_eq!(generation_id, "gen-2");
                assert_eq!(status, GenerationStatus::Failed);
            }
            other => panic!("expected terminal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_rejects_immediately() {
        let backend = ScriptedBackend::new();
        backend.push_status(Ok(ScriptedBackend::status("gen-3", GenerationStatus::Processing)));
        backend.push_status(Err(ApiError::Http { status: 503 }));

        let error = poll_until_terminal(&backend, "gen-3", FAST, |_| {}).await.unwrap_err();

        assert!(matches!(error, TrackError::Api(_)));
        assert_eq!(backend.status_call_count(), 2, "polling must not retry past a fetch failure");
    }

    #[tokio::test]
    async fn duplicate_terminal_status_resolves_exactly_once() {
        let backend = ScriptedBackend::new();
        backend.push_status(Ok(ScriptedBackend::status("gen-4", GenerationStatus::Completed)));
        backend.push_status(Ok(ScriptedBackend::status("gen-4", GenerationStatus::Completed)));

        let mut updates = 0;
        let response = poll_until_terminal(&backend, "gen-4", FAST, |_| updates += 1).await.unwrap();

        assert_eq!(response.status, GenerationStatus::Completed);
        assert_eq!(updates, 1);
        assert_eq!(backend.status_call_count(), 1);
    }

    #[tokio::test]
    async fn track_without_push_behaves_like_polling() {
        let backend = ScriptedBackend::new();
        backend.push_status(Ok(ScriptedBackend::status("gen-5", GenerationStatus::Composing)));
        backend.push_status(Ok(ScriptedBackend::status("gen-5", GenerationStatus::Completed)));

        let response = track(&backend, "gen-5", FAST, None, |_| {}).await.unwrap();

        assert_eq!(response.status, GenerationStatus::Completed);
        assert_eq!(backend.status_call_count(), 2);
    }

    fn push_event(kind: PushEventType, generation_id: &str) -> PushEvent {
        PushEvent {
            kind,
            data: serde_json::Value::Null,
            generation_id: generation_id.into(),
        }
    }

    #[tokio::test]
    async fn push_events_reach_the_consumer_in_receipt_order() {
        let backend = ScriptedBackend::new();
        backend.push_status(Ok(ScriptedBackend::status("gen-6", GenerationStatus::Processing)));
        backend.push_status(Ok(ScriptedBackend::status("gen-6", GenerationStatus::Completed)));

        let (events_tx, events_rx) = tokio::sync::mpsc::channel(8);
        events_tx.send(push_event(PushEventType::Progress, "gen-6")).await.unwrap();
        events_tx.send(push_event(PushEventType::ClipCompleted, "gen-6")).await.unwrap();
        let push = PushSubscription::from_channel(events_rx);

        let mut updates = Vec::new();
        let response = track(&backend, "gen-6", Duration::from_millis(30), Some(push), |update| updates.push(update))
            .await
            .unwrap();

        assert_eq!(response.status, GenerationStatus::Completed);
        let event_kinds: Vec<_> = updates
            .iter()
            .filter_map(|update| match update {
                TrackUpdate::Event(event) => Some(event.kind),
                TrackUpdate::Snapshot(_) => None,
            })
            .collect();
        assert_eq!(event_kinds, vec![PushEventType::Progress, PushEventType::ClipCompleted]);
        let snapshots = updates.iter().filter(|update| matches!(update, TrackUpdate::Snapshot(_))).count();
        assert_eq!(snapshots, 2);
    }

    #[tokio::test]
    async fn terminal_push_event_short_circuits_the_poll_delay_once() {
        let backend = ScriptedBackend::new();
        backend.push_status(Ok(ScriptedBackend::status("gen-7", GenerationStatus::Processing)));
        backend.push_status(Ok(ScriptedBackend::status("gen-7", GenerationStatus::Completed)));

        let (events_tx, events_rx) = tokio::sync::mpsc::channel(8);
        events_tx.send(push_event(PushEventType::Completed, "gen-7")).await.unwrap();
        events_tx.send(push_event(PushEventType::Completed, "gen-7")).await.unwrap();
        let push = PushSubscription::from_channel(events_rx);

        // With an hour-long interval only the terminal event can unblock
        // the verifying fetch in time.
        let response = tokio::time::timeout(
            Duration::from_secs(5),
            track(&backend, "gen-7", Duration::from_secs(3600), Some(push), |_| {}),
        )
        .await
        .expect("terminal event must trigger an immediate fetch")
        .unwrap();

        assert_eq!(response.status, GenerationStatus::Completed);
        // The duplicate terminal event causes no extra fetch and no second
        // resolution.
        assert_eq!(backend.status_call_count(), 2);
    }

    #[tokio::test]
    async fn starting_a_new_track_replaces_the_previous_job() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.status_when_empty(ScriptedBackend::status("job", GenerationStatus::Processing));

        let mut tracker = Tracker::new(backend.clone() as Arc<dyn GenerationBackend>).with_interval(Duration::from_millis(5));
        tracker.start("job-a", None, |_| {});
        assert_eq!(tracker.active_generation_id(), Some("job-a"));

        tracker.start("job-b", None, |_| {});
        assert_eq!(tracker.active_generation_id(), Some("job-b"));

        // Let the aborted loop die at its next await point before scripting
        // the terminal answer for job-b.
        sleep(Duration::from_millis(20)).await;
        backend.push_status(Ok(ScriptedBackend::status("job-b", GenerationStatus::Completed)));

        let response = tracker.wait().await.unwrap();
        assert_eq!(response.generation_id, "job-b");
    }

    #[tokio::test]
    async fn stop_cancels_the_active_loop() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.status_when_empty(ScriptedBackend::status("job-c", GenerationStatus::Queued));

        let mut tracker = Tracker::new(backend as Arc<dyn GenerationBackend>).with_interval(Duration::from_millis(5));
        tracker.start("job-c", None, |_| {});
        tracker.stop();

        assert_eq!(tracker.active_generation_id(), None);
        assert!(matches!(tracker.wait().await, Err(TrackError::Cancelled)));
    }
}
