//! # voice-remote
//!
//! Client for a voice bot's audio-control panel: a self-healing status
//! channel that reports when the current track ends, plus the HTTP calls for
//! now-playing data and playback commands.
//!
//! ```rust,ignore
//! let endpoint = Endpoint::new("bot.example.com", true)?;
//! let key = SessionKey::new("session-key")?;
//! let handle = StatusChannel::builder(&endpoint, key)
//!     .on_track_ended(|| println!("track ended"))
//!     .build()?
//!     .start();
//! // ... later, when the panel goes away:
//! handle.stop();
//! ```

pub mod channel;
pub mod cli;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod machine;
pub mod now_playing;
pub mod render;
pub mod signal;
pub mod transport;

pub use channel::{ChannelHandle, StatusChannel, StatusChannelBuilder};
pub use endpoint::{Endpoint, SessionKey};
pub use error::RemoteError;
pub use machine::ChannelState;
pub use now_playing::{AudioCommand, NowPlaying, NowPlayingClient};
pub use signal::ControlSignal;
