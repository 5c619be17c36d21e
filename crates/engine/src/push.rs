//! Push-channel subscription for generation status events.
//!
//! The backend exposes a websocket stream keyed by generation id. This
//! module owns the connection lifecycle: connect with a timeout, decode
//! typed [`PushEvent`]s, forward them in receipt order, and reconnect with
//! bounded, linearly growing delays when the stream drops. A terminal event
//! (`completed`/`error`) ends the subscription; dropping the handle
//! unsubscribes immediately.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use reelgen_types::{ConnectionState, PushEvent};

/// Connection behavior for the push channel.
#[derive(Clone, Debug)]
pub struct PushChannelConfig {
    /// How long a single connection attempt may take before it is treated
    /// as failed.
    pub connect_timeout: Duration,
    /// Reconnect attempts after a drop before giving up. The tracker then
    /// continues on polling alone.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay; attempt `n` waits `n` times this.
    pub reconnect_delay: Duration,
}

impl Default for PushChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            max_reconnect_attempts: 3,
            reconnect_delay: Duration::from_millis(500),
        }
    }
}

/// Delay before reconnect attempt `attempt` (1-based), growing linearly.
fn reconnect_delay(config: &PushChannelConfig, attempt: u32) -> Duration {
    config.reconnect_delay.saturating_mul(attempt.max(1))
}

/// Live subscription to one generation's event stream.
///
/// Events arrive through [`PushSubscription::next_event`] in receipt order.
/// The stream ends (returns `None`) after a terminal event, after reconnect
/// attempts are exhausted, or when the handle is dropped.
pub struct PushSubscription {
    events: mpsc::Receiver<PushEvent>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl PushSubscription {
    /// Open a subscription for `generation_id` against the websocket `url`.
    ///
    /// The connection is established on a background task; events buffer
    /// until consumed.
    pub fn connect(url: String, generation_id: String, config: PushChannelConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (state_tx, state_rx) = watch::channel(ConnectionState::default());

        let task = tokio::spawn(run_subscription(url, generation_id, config, events_tx, state_tx));

        Self {
            events: events_rx,
            state: state_rx,
            task,
        }
    }

    /// Next event in receipt order, or `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    /// Snapshot of the current connection health.
    pub fn connection_state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }
}

#[cfg(test)]
impl PushSubscription {
    /// Subscription fed directly from a channel, for tests that need push
    /// traffic without a live socket.
    pub(crate) fn from_channel(events: mpsc::Receiver<PushEvent>) -> Self {
        let (_state_tx, state_rx) = watch::channel(ConnectionState::default());
        Self {
            events,
            state: state_rx,
            task: tokio::spawn(async {}),
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum SessionEnd {
    /// A terminal event was delivered; the subscription is complete.
    Finished,
    /// The stream dropped or errored before a terminal event.
    Disconnected,
}

async fn run_subscription(
    url: String,
    generation_id: String,
    config: PushChannelConfig,
    events_tx: mpsc::Sender<PushEvent>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut attempt: u32 = 0;

    loop {
        match timeout(config.connect_timeout, connect_async(url.as_str())).await {
            Ok(Ok((stream, _response))) => {
                state_tx.send_modify(|state| state.mark_connected());
                attempt = 0;
                debug!(%generation_id, "push channel connected");

                match run_session(stream, &generation_id, &events_tx).await {
                    SessionEnd::Finished => return,
                    SessionEnd::Disconnected => state_tx.send_modify(|state| state.mark_disconnected()),
                }
            }
            Ok(Err(error)) => {
                warn!(%generation_id, error = %error, "push channel connect failed");
                state_tx.send_modify(|state| state.mark_error(error.to_string()));
            }
            Err(_elapsed) => {
                warn!(%generation_id, timeout_ms = config.connect_timeout.as_millis() as u64, "push channel connect timed out");
                state_tx.send_modify(|state| state.mark_error("push channel connection timed out"));
            }
        }

        attempt += 1;
        if attempt > config.max_reconnect_attempts {
            debug!(%generation_id, attempts = attempt - 1, "push channel reconnect attempts exhausted");
            state_tx.send_modify(|state| state.mark_disconnected());
            return;
        }
        state_tx.send_modify(|state| state.mark_reconnecting());
        sleep(reconnect_delay(&config, attempt)).await;
    }
}

async fn run_session(
    stream: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    generation_id: &str,
    events_tx: &mpsc::Sender<PushEvent>,
) -> SessionEnd {
    let (mut sink, mut stream) = stream.split();

    let subscribe = serde_json::json!({ "type": "subscribe", "generation_id": generation_id });
    if sink.send(Message::Text(subscribe.to_string().into())).await.is_err() {
        return SessionEnd::Disconnected;
    }

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<PushEvent>(text.as_str()) {
                Ok(event) => {
                    if event.generation_id != generation_id {
                        continue;
                    }
                    let terminal = event.kind.is_terminal();
                    if events_tx.send(event).await.is_err() {
                        // Consumer dropped the subscription.
                        return SessionEnd::Finished;
                    }
                    if terminal {
                        return SessionEnd::Finished;
                    }
                }
                Err(error) => debug!(%generation_id, error = %error, "Ignoring undecodable push frame"),
            },
            Ok(Message::Close(_)) => return SessionEnd::Disconnected,
            Ok(_) => {}
            Err(error) => {
                warn!(%generation_id, error = %error, "push channel stream error");
                return SessionEnd::Disconnected;
            }
        }
    }

    SessionEnd::Disconnected
}
