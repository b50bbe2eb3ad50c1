//! Terminal rendering of the audio-control panel.
//!
//! The [`Renderer`] is the panel's drawing target. The caller creates it and
//! hands it to whatever reacts to track changes; nothing here is global.

use std::io::{self, Write};

use colored::*;

use crate::endpoint::{Endpoint, SessionKey};
use crate::now_playing::{AudioCommand, NowPlaying};

pub struct Renderer<W: Write> {
    out: W,
}

impl Renderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Redraw the panel for the current track, or the idle notice.
    pub fn now_playing(&mut self, playing: Option<&NowPlaying>) -> io::Result<()> {
        writeln!(self.out)?;
        match playing {
            Some(np) => {
                writeln!(self.out, "{} {}", "▶".green().bold(), np.title.bold())?;
                if !np.description.is_empty() {
                    writeln!(self.out, "  {}", np.description)?;
                }
                writeln!(self.out, "  {} {}", "thumbnail:".dimmed(), np.thumbnail)?;
            }
            None => writeln!(self.out, "{}", "Nothing is playing".yellow())?,
        }
        self.out.flush()
    }

    /// List the playback commands available for this session.
    pub fn controls(&mut self, endpoint: &Endpoint, key: &SessionKey) -> io::Result<()> {
        writeln!(self.out, "{}", "Controls:".dimmed())?;
        for command in AudioCommand::ALL {
            writeln!(
                self.out,
                "  {:<18} {}",
                command.title(),
                endpoint.command_url(command, key).as_str().dimmed()
            )?;
        }
        self.out.flush()
    }

    pub fn command_sent(&mut self, command: AudioCommand) -> io::Result<()> {
        writeln!(self.out, "{} {}", "✓".green(), command.title())?;
        self.out.flush()
    }

    pub fn session_ended(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "Voice client disconnected.".red())?;
        self.out.flush()
    }

    pub fn error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{} {}", "error:".red().bold(), message)?;
        self.out.flush()
    }
}
