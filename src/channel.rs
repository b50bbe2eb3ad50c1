//! # Status Channel
//!
//! ## Responsibility
//! Keeps one logical real-time connection to a session's status endpoint,
//! turns its text frames into control signals and calls back into the
//! rendering layer when the current track ends.
//!
//! ## Guarantees
//! - At most one transport connection is live at a time; a dropped connection
//!   is closed before the next attempt opens.
//! - Frames are handled one at a time on a single task, so callbacks run in
//!   arrival order and are never coalesced.
//! - Unexpected closures and failed attempts reconnect immediately, forever,
//!   to the same URL, until the server terminates the session or the owner
//!   calls [`ChannelHandle::stop`].
//! - `stop()` is idempotent, makes the state `ClosedFinal` before it
//!   returns and wins over any in-flight attempt. An attempt that completes
//!   in the same instant is closed, never used.
//!
//! ## NOT Responsible For
//! - Backoff or retry limits (the transport's own failure rate is the throttle)
//! - Fetching now-playing data (the `on_track_ended` callback does that)

use std::sync::Arc;

use reqwest::Url;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::endpoint::{redacted_url, Endpoint, SessionKey};
use crate::error::RemoteError;
use crate::machine::{Action, ChannelMachine, ChannelState};
use crate::transport::{Connection, Transport, WsTransport};

/// Callback invoked from the channel's driver task.
pub type Callback = Box<dyn FnMut() + Send + 'static>;

/// A configured, not yet started status channel.
///
/// Use [`StatusChannel::builder`] to construct one.
pub struct StatusChannel<T: Transport = WsTransport> {
    key: SessionKey,
    url: Url,
    transport: T,
    on_track_ended: Callback,
    on_terminated: Callback,
}

impl StatusChannel<WsTransport> {
    /// Start building a channel for `key` on `endpoint`.
    pub fn builder(endpoint: &Endpoint, key: SessionKey) -> StatusChannelBuilder<WsTransport> {
        StatusChannelBuilder::new(endpoint, key)
    }
}

impl<T: Transport> StatusChannel<T> {
    /// The status URL every attempt dials.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Spawn the driver task and begin connecting.
    ///
    /// Must be called from within a Tokio runtime. Dropping the returned
    /// handle has the same effect as calling [`ChannelHandle::stop`].
    pub fn start(self) -> ChannelHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ChannelState::Connecting);
        let state_tx = Arc::new(state_tx);
        let task = tokio::spawn(self.run(stop_rx, Arc::clone(&state_tx)));
        ChannelHandle {
            stop_tx,
            state_tx,
            state_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut stop_rx: watch::Receiver<bool>,
        state_tx: Arc<watch::Sender<ChannelState>>,
    ) {
        let (mut machine, mut action) = ChannelMachine::start();
        publish(&state_tx, &machine);

        while action == Action::Connect {
            if stop_pending(&stop_rx) {
                machine.stop();
                publish(&state_tx, &machine);
                break;
            }
            debug!(
                key = %self.key,
                url = %redacted_url(&self.url),
                attempt = machine.attempts(),
                "connecting"
            );

            // Connect is polled first: an attempt that is ready alongside a
            // stop is taken, then closed below.
            let attempt = tokio::select! {
                biased;
                res = self.transport.connect(&self.url) => Some(res),
                _ = stop_requested(&mut stop_rx) => None,
            };

            let conn = match attempt {
                None => {
                    machine.stop();
                    publish(&state_tx, &machine);
                    break;
                }
                Some(Err(e)) => {
                    warn!(
                        key = %self.key,
                        error = %e,
                        attempt = machine.attempts(),
                        "status channel connect failed, reconnecting"
                    );
                    action = after_closure(&mut machine, &state_tx).await;
                    continue;
                }
                Some(Ok(conn)) => conn,
            };

            if stop_pending(&stop_rx) {
                machine.stop();
            }
            if machine.opened() == Action::Close {
                let mut conn = conn;
                conn.close().await;
                publish(&state_tx, &machine);
                info!(key = %self.key, "status channel stopped while connecting");
                break;
            }
            publish(&state_tx, &machine);
            info!(key = %self.key, attempt = machine.attempts(), "status channel open");

            action = self.pump(&mut machine, conn, &mut stop_rx, &state_tx).await;
        }

        debug!(key = %self.key, attempts = machine.attempts(), "status channel finished");
    }

    /// Read frames from one connection until it closes or the channel stops.
    ///
    /// Returns `Action::Connect` when another attempt should follow.
    async fn pump(
        &mut self,
        machine: &mut ChannelMachine,
        mut conn: T::Conn,
        stop_rx: &mut watch::Receiver<bool>,
        state_tx: &watch::Sender<ChannelState>,
    ) -> Action {
        enum Next {
            Stop,
            Frame(Option<String>),
        }

        loop {
            let next = tokio::select! {
                biased;
                _ = stop_requested(stop_rx) => Next::Stop,
                frame = conn.next_text() => Next::Frame(frame),
            };

            match next {
                Next::Stop => {
                    machine.stop();
                    publish(state_tx, machine);
                    conn.close().await;
                    info!(key = %self.key, "status channel stopped");
                    return Action::Idle;
                }
                Next::Frame(None) => {
                    // Let the old connection settle before the next attempt.
                    conn.close().await;
                    drop(conn);
                    info!(key = %self.key, "status channel closed, reconnecting");
                    return after_closure(machine, state_tx).await;
                }
                Next::Frame(Some(payload)) => match machine.frame(&payload) {
                    Action::NotifyTrackEnded => {
                        debug!(key = %self.key, "track ended");
                        (self.on_track_ended)();
                    }
                    Action::NotifyTerminated => {
                        publish(state_tx, machine);
                        info!(key = %self.key, "session terminated by server");
                        (self.on_terminated)();
                        conn.close().await;
                        return Action::Idle;
                    }
                    _ => trace!(key = %self.key, len = payload.len(), "ignoring unrecognised frame"),
                },
            }
        }
    }
}

/// Closure and failed attempts share this path: reconnect unless final.
///
/// `ClosedReconnecting` is published on its own scheduler turn so watchers
/// get to see it before `Connecting` replaces it.
async fn after_closure(
    machine: &mut ChannelMachine,
    state_tx: &watch::Sender<ChannelState>,
) -> Action {
    if machine.closed() != Action::Connect {
        return Action::Idle;
    }
    publish(state_tx, machine);
    tokio::task::yield_now().await;
    let action = machine.reconnect();
    publish(state_tx, machine);
    action
}

/// Publish the machine's state. `ClosedFinal` is sticky: once the handle or
/// the driver has set it, later publishes are ignored.
fn publish(state_tx: &watch::Sender<ChannelState>, machine: &ChannelMachine) {
    let state = machine.state();
    state_tx.send_if_modified(|current| {
        if *current == state || current.is_final() {
            return false;
        }
        trace!(from = %current, to = %state, "status channel state");
        *current = state;
        true
    });
}

/// True once a stop was requested or every handle was dropped.
fn stop_pending(stop_rx: &watch::Receiver<bool>) -> bool {
    *stop_rx.borrow() || stop_rx.has_changed().is_err()
}

/// Resolves once a stop was requested or every handle was dropped.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stopped| *stopped).await;
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owner's view of a running channel.
pub struct ChannelHandle {
    stop_tx: watch::Sender<bool>,
    state_tx: Arc<watch::Sender<ChannelState>>,
    state_rx: watch::Receiver<ChannelState>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Close the channel for good. Calling it again has no effect.
    ///
    /// The state reads `ClosedFinal` as soon as this returns; the driver
    /// task closes any live connection in the background.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
        self.state_tx.send_if_modified(|state| {
            if state.is_final() {
                return false;
            }
            *state = ChannelState::ClosedFinal;
            true
        });
    }

    /// Current state.
    pub fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    /// Watch state transitions. The receiver is read-only.
    pub fn subscribe(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Wait until the channel reaches `ClosedFinal`.
    pub async fn wait_final(&self) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|state| state.is_final()).await;
    }

    /// Wait for the driver task to exit.
    ///
    /// This does not stop the channel; call [`stop`](Self::stop) first to
    /// shut it down from the client side.
    pub async fn join(self) -> ChannelState {
        let ChannelHandle {
            stop_tx,
            state_tx: _,
            state_rx,
            task,
        } = self;
        if let Err(e) = task.await {
            warn!(error = %e, "status channel task failed");
        }
        drop(stop_tx);
        let state = *state_rx.borrow();
        state
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`StatusChannel`].
///
/// # Example
/// ```rust,ignore
/// let handle = StatusChannel::builder(&endpoint, key)
///     .on_track_ended(move || { let _ = refresh_tx.send(()); })
///     .build()?
///     .start();
/// ```
pub struct StatusChannelBuilder<T: Transport = WsTransport> {
    key: SessionKey,
    url: Url,
    transport: T,
    on_track_ended: Option<Callback>,
    on_terminated: Option<Callback>,
}

impl StatusChannelBuilder<WsTransport> {
    pub fn new(endpoint: &Endpoint, key: SessionKey) -> Self {
        Self {
            url: endpoint.status_url(&key),
            key,
            transport: WsTransport,
            on_track_ended: None,
            on_terminated: None,
        }
    }
}

impl<T: Transport> StatusChannelBuilder<T> {
    /// Refresh callback for the `END` signal. **Required.**
    pub fn on_track_ended<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_track_ended = Some(Box::new(f));
        self
    }

    /// Called once when the server sends `DISCONNECTED`. Defaults to a log line.
    pub fn on_terminated<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_terminated = Some(Box::new(f));
        self
    }

    /// Swap the transport, e.g. for a scripted one in tests.
    pub fn transport<U: Transport>(self, transport: U) -> StatusChannelBuilder<U> {
        StatusChannelBuilder {
            key: self.key,
            url: self.url,
            transport,
            on_track_ended: self.on_track_ended,
            on_terminated: self.on_terminated,
        }
    }

    /// # Errors
    /// `RemoteError::MissingField("on_track_ended")` when no refresh callback
    /// was set.
    pub fn build(self) -> Result<StatusChannel<T>, RemoteError> {
        let on_track_ended = self
            .on_track_ended
            .ok_or(RemoteError::MissingField("on_track_ended"))?;
        let on_terminated = match self.on_terminated {
            Some(f) => f,
            None => {
                let key = self.key.clone();
                let log_only: Callback =
                    Box::new(move || info!(key = %key, "voice client disconnected"));
                log_only
            }
        };
        Ok(StatusChannel {
            key: self.key,
            url: self.url,
            transport: self.transport,
            on_track_ended,
            on_terminated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::new("bot.example.com", true).unwrap()
    }

    #[test]
    fn builder_requires_track_ended_callback() {
        let key = SessionKey::new("abc").unwrap();
        let result = StatusChannel::builder(&endpoint(), key).build();
        assert!(matches!(result, Err(RemoteError::MissingField("on_track_ended"))));
    }

    #[test]
    fn builder_derives_status_url_from_key() {
        let key = SessionKey::new("abc").unwrap();
        let channel = StatusChannel::builder(&endpoint(), key)
            .on_track_ended(|| {})
            .build()
            .unwrap();
        assert_eq!(
            channel.url().as_str(),
            "wss://bot.example.com/audio-control/status?key=abc"
        );
        assert_eq!(channel.key().as_str(), "abc");
    }
}
