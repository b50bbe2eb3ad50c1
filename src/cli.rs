use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ConfigOverrides;
use crate::now_playing::AudioCommand;

#[derive(Parser, Debug)]
#[command(name = "voice-remote")]
#[command(version)]
#[command(about = "Remote control and live status for a voice bot's audio session")]
pub struct Args {
    /// TOML config file (host, secure, key, log_filter, request_timeout_secs)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server host, e.g. bot.example.com or 127.0.0.1:8080
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Use ws:// and http:// instead of wss:// and https://
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Session key handed out by the bot
    #[arg(long, global = true, env = "VOICE_REMOTE_KEY")]
    pub key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Follow the session live, redrawing whenever a track ends
    Watch,
    /// Show the current track once
    Playing,
    /// Pause playback
    Pause,
    /// Resume playback
    Resume,
    /// Skip to the next track
    Skip,
    /// Stop playback
    Stop,
    /// Toggle repeat-one mode
    Repeat,
    /// Toggle shuffle
    Shuffle,
    /// Toggle stopping after the current track
    StopAfter,
}

impl Command {
    /// The playback command this subcommand sends, if any.
    pub fn audio_command(&self) -> Option<AudioCommand> {
        match self {
            Command::Watch | Command::Playing => None,
            Command::Pause => Some(AudioCommand::Pause),
            Command::Resume => Some(AudioCommand::Resume),
            Command::Skip => Some(AudioCommand::Skip),
            Command::Stop => Some(AudioCommand::Stop),
            Command::Repeat => Some(AudioCommand::Repeat),
            Command::Shuffle => Some(AudioCommand::Shuffle),
            Command::StopAfter => Some(AudioCommand::StopAfter),
        }
    }
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            insecure: self.insecure,
            key: self.key.clone(),
        }
    }
}
