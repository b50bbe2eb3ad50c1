//! # Status channel state machine
//!
//! ## Responsibility
//! Owns the [`ChannelState`] of one status channel and decides, for every
//! event the transport reports, what the driver must do next.
//!
//! ## Guarantees
//! - Once `ClosedFinal` is reached the machine never asks for another
//!   connection attempt.
//! - Every `END` frame received while `Open` yields exactly one
//!   [`Action::NotifyTrackEnded`], in arrival order.
//! - Closures that are not preceded by a terminate signal or `stop()` always
//!   lead to a new connection attempt (no backoff, no attempt limit).
//!
//! ## NOT Responsible For
//! - I/O of any kind (see `channel.rs` for the async driver)

use crate::signal::ControlSignal;

/// Lifecycle state of a status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is established and frames are being processed.
    Open,
    /// The connection dropped; a new attempt is about to start.
    ClosedReconnecting,
    /// Terminal: closed by the server's terminate signal or by `stop()`.
    ClosedFinal,
}

impl ChannelState {
    /// True for `ClosedFinal`.
    pub fn is_final(&self) -> bool {
        matches!(self, ChannelState::ClosedFinal)
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::ClosedReconnecting => "closed_reconnecting",
            ChannelState::ClosedFinal => "closed_final",
        };
        write!(f, "{s}")
    }
}

/// What the driver must do after feeding an event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open a new connection to the (unchanged) status URL.
    Connect,
    /// Invoke the track-ended callback, then keep reading.
    NotifyTrackEnded,
    /// Invoke the termination callback and close the connection.
    NotifyTerminated,
    /// Close the live connection, if any. No reconnect follows.
    Close,
    /// Nothing to do.
    Idle,
}

/// Pure transition logic for one status channel.
#[derive(Debug, Clone)]
pub struct ChannelMachine {
    state: ChannelState,
    attempts: u64,
}

impl ChannelMachine {
    /// Create a machine for a channel that is about to start.
    ///
    /// The machine begins in `Connecting` and counts that first attempt.
    pub fn start() -> (Self, Action) {
        let machine = Self {
            state: ChannelState::Connecting,
            attempts: 1,
        };
        (machine, Action::Connect)
    }

    /// Current state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Number of connection attempts requested so far, including the first.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Begin the next connection attempt after a closure.
    ///
    /// Returns `Action::Idle` once the channel is final.
    pub fn reconnect(&mut self) -> Action {
        if self.state.is_final() {
            return Action::Idle;
        }
        self.state = ChannelState::Connecting;
        self.attempts = self.attempts.saturating_add(1);
        Action::Connect
    }

    /// The transport finished opening a connection.
    ///
    /// A connection that completes after `stop()` must be closed straight away.
    pub fn opened(&mut self) -> Action {
        if self.state.is_final() {
            return Action::Close;
        }
        self.state = ChannelState::Open;
        Action::Idle
    }

    /// A text frame arrived on the open connection.
    pub fn frame(&mut self, payload: &str) -> Action {
        if self.state != ChannelState::Open {
            return Action::Idle;
        }
        match ControlSignal::parse(payload) {
            Some(ControlSignal::TrackEnded) => Action::NotifyTrackEnded,
            Some(ControlSignal::SessionTerminated) => {
                self.state = ChannelState::ClosedFinal;
                Action::NotifyTerminated
            }
            None => Action::Idle,
        }
    }

    /// The connection closed, or a connection attempt failed.
    ///
    /// Both cases take the same path: reconnect unless final.
    pub fn closed(&mut self) -> Action {
        if self.state.is_final() {
            return Action::Idle;
        }
        self.state = ChannelState::ClosedReconnecting;
        Action::Connect
    }

    /// The owner asked the channel to stop. Idempotent.
    pub fn stop(&mut self) -> Action {
        if self.state.is_final() {
            return Action::Idle;
        }
        self.state = ChannelState::ClosedFinal;
        Action::Close
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
