//! HTTP side of the audio-control panel: the now-playing document and the
//! playback command routes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::endpoint::{redacted_url, Endpoint, SessionKey};
use crate::error::RemoteError;

/// The track the server is currently playing for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    /// URL of the track artwork.
    pub thumbnail: String,
    pub title: String,
    pub description: String,
}

/// Playback commands exposed by the server as `GET /<path>?key=<key>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCommand {
    Pause,
    Resume,
    Skip,
    Stop,
    Repeat,
    Shuffle,
    StopAfter,
}

impl AudioCommand {
    /// Every command, in panel button order.
    pub const ALL: [AudioCommand; 7] = [
        AudioCommand::Pause,
        AudioCommand::Resume,
        AudioCommand::Skip,
        AudioCommand::Stop,
        AudioCommand::Repeat,
        AudioCommand::Shuffle,
        AudioCommand::StopAfter,
    ];

    /// Server route for this command.
    pub fn path(&self) -> &'static str {
        match self {
            AudioCommand::Pause => "/pause",
            AudioCommand::Resume => "/resume",
            AudioCommand::Skip => "/skip",
            AudioCommand::Stop => "/stop",
            AudioCommand::Repeat => "/repeat",
            AudioCommand::Shuffle => "/shuffle",
            AudioCommand::StopAfter => "/stopafter",
        }
    }

    /// Button caption.
    pub fn title(&self) -> &'static str {
        match self {
            AudioCommand::Pause => "Pause",
            AudioCommand::Resume => "Resume",
            AudioCommand::Skip => "Skip",
            AudioCommand::Stop => "Stop",
            AudioCommand::Repeat => "Toggle repeat",
            AudioCommand::Shuffle => "Toggle shuffle",
            AudioCommand::StopAfter => "Toggle stopafter",
        }
    }
}

impl std::fmt::Display for AudioCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path().trim_start_matches('/'))
    }
}

/// Thin `reqwest` wrapper for the now-playing and command routes.
#[derive(Debug, Clone)]
pub struct NowPlayingClient {
    endpoint: Endpoint,
    client: reqwest::Client,
}

impl NowPlayingClient {
    pub fn new(endpoint: Endpoint, request_timeout: Duration) -> Self {
        // Builder failure only happens when the TLS backend cannot initialise;
        // fall back to a default client rather than panicking.
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Fetch the current track.
    ///
    /// # Returns
    /// - `Ok(Some(_))` on 200 with a parseable body.
    /// - `Ok(None)` on 404: the session exists but nothing is playing.
    /// - `Err(RemoteError::UnknownSession)` on 400.
    /// - `Err(RemoteError::Http)` on any other status.
    pub async fn fetch(&self, key: &SessionKey) -> Result<Option<NowPlaying>, RemoteError> {
        let url = self.endpoint.playing_url(key);
        debug!(key = %key, "fetching now playing");

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RemoteError::Connect {
                url: redacted_url(&url),
                detail: e.without_url().to_string(),
            })?;

        match resp.status().as_u16() {
            200 => {}
            400 => return Err(RemoteError::UnknownSession),
            404 => return Ok(None),
            status => {
                return Err(RemoteError::Http {
                    status,
                    url: redacted_url(&url),
                })
            }
        }

        let bytes = resp.bytes().await.map_err(|e| RemoteError::Decode {
            url: redacted_url(&url),
            detail: e.without_url().to_string(),
        })?;
        serde_json::from_slice::<NowPlaying>(&bytes)
            .map(Some)
            .map_err(|e| RemoteError::Decode {
                url: redacted_url(&url),
                detail: e.to_string(),
            })
    }

    /// Send one playback command. The server answers 204 on success.
    pub async fn send(&self, command: AudioCommand, key: &SessionKey) -> Result<(), RemoteError> {
        let url = self.endpoint.command_url(command, key);
        debug!(key = %key, %command, "sending playback command");

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RemoteError::Connect {
                url: redacted_url(&url),
                detail: e.without_url().to_string(),
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 400 {
            return Err(RemoteError::UnknownSession);
        }
        Err(RemoteError::Http {
            status: status.as_u16(),
            url: redacted_url(&url),
        })
    }
}
