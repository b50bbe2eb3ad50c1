//! Control signals carried by the status endpoint.

/// Wire token the server sends when the current track finishes.
pub const TRACK_ENDED_TOKEN: &str = "END";

/// Wire token the server sends when it tears the playback session down.
pub const SESSION_TERMINATED_TOKEN: &str = "DISCONNECTED";

/// The closed set of text frames the status channel reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSignal {
    /// The server finished the current track; now-playing data is stale.
    TrackEnded,
    /// The server has torn down the session; stop reconnecting.
    SessionTerminated,
}

impl ControlSignal {
    /// Decode a text frame.
    ///
    /// Matching is exact. Anything other than the two known tokens returns
    /// `None` so newer servers can add signals without breaking old clients.
    pub fn parse(payload: &str) -> Option<Self> {
        match payload {
            TRACK_ENDED_TOKEN => Some(ControlSignal::TrackEnded),
            SESSION_TERMINATED_TOKEN => Some(ControlSignal::SessionTerminated),
            _ => None,
        }
    }

    /// The token this signal is encoded as on the wire.
    pub fn as_token(&self) -> &'static str {
        match self {
            ControlSignal::TrackEnded => TRACK_ENDED_TOKEN,
            ControlSignal::SessionTerminated => SESSION_TERMINATED_TOKEN,
        }
    }
}

impl std::fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ControlSignal::TrackEnded => "track_ended",
            ControlSignal::SessionTerminated => "session_terminated",
        };
        write!(f, "{s}")
    }
}
