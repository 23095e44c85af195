// Etude
// Copyright (C) 2021  Wesley Merkel
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! A thread-friendly event loop around [`PlaybackScheduler`].
//!
//! [`Player`] owns a scheduler and sleeps until either its next timer is due or a command arrives
//! from a [`Handle`]. Commands can also be read as JSON lines from any reader with
//! [`Player::listen`], and [`EventWriter`] reports playback events back out as JSON lines.

use super::{AudioSink, PlaybackEvent, PlaybackObserver, PlaybackScheduler};
use crate::{config, config::Config, event::NoteEvent, tempo::Tempo};
use serde::{Deserialize, Serialize};
use std::{
    io::{self, BufRead, Read, Write},
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A request sent to a running [`Player`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum Command {
    Play {
        events: Vec<NoteEvent>,
        /// Falls back to the player's current tempo.
        #[serde(default)]
        bpm: Option<f64>,
        /// Falls back to the player's current transposition.
        #[serde(default)]
        transpose: Option<i32>,
    },
    Stop,
    SetTempo {
        bpm: f64,
    },
    SetTranspose {
        semitones: i32,
    },
    Quit,
}

/// Drives a [`PlaybackScheduler`] from commands.
///
/// The player remembers the last tempo and transposition it was given, so changing either while
/// idle affects the next `play` command.
#[derive(Debug)]
pub struct Player<S, O> {
    scheduler: PlaybackScheduler<S, O>,
    config: Config,
    tempo: Tempo,
    transpose: i32,
    receiver: Receiver<Result<Command>>,
    sender: Sender<Result<Command>>,
}

impl<S, O> Player<S, O>
where
    S: AudioSink,
    O: PlaybackObserver,
{
    pub fn new(sink: S, observer: O, config: Config) -> Result<Player<S, O>> {
        config.validate()?;
        let tempo = config.default_tempo().map_err(config::Error::from)?;
        let (sender, receiver) = mpsc::channel();
        Ok(Player {
            scheduler: PlaybackScheduler::with_config(sink, observer, &config),
            config,
            tempo,
            transpose: 0,
            receiver,
            sender,
        })
    }

    pub fn handle(&self) -> Handle {
        Handle {
            sender: self.sender.clone(),
            config: self.config.clone(),
        }
    }

    /// Forwards JSON commands, one per line, from `read` to this player.
    ///
    /// A line that cannot be read or parsed ends [`Player::run`] with an error.
    pub fn listen<R>(&self, read: R)
    where
        R: Read + Send + 'static,
    {
        spawn_command_forwarder(self.sender.clone(), read);
    }

    /// Runs until a [`Command::Quit`] arrives or every [`Handle`] is dropped.
    ///
    /// Playback is stopped before returning. The scheduler is handed back so that its sink and
    /// observer can be inspected.
    pub fn run(self) -> Result<PlaybackScheduler<S, O>> {
        let Player {
            mut scheduler,
            config,
            mut tempo,
            mut transpose,
            receiver,
            sender,
        } = self;
        drop(sender);

        loop {
            let message = match scheduler.poll() {
                Some(deadline) => {
                    let wait = deadline.saturating_sub(scheduler.sink().now());
                    match receiver.recv_timeout(wait) {
                        Ok(message) => message,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match receiver.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };

            let command = match message {
                Ok(command) => command,
                Err(err) => {
                    log::error!("{}", err);
                    scheduler.stop();
                    return Err(err);
                }
            };
            log::debug!("command: {:?}", command);

            match command {
                Command::Play {
                    events,
                    bpm,
                    transpose: semitones,
                } => {
                    if let Some(bpm) = bpm {
                        match config.tempo(bpm) {
                            Ok(new_tempo) => tempo = new_tempo,
                            Err(err) => log::warn!("ignoring tempo: {}", err),
                        }
                    }
                    if let Some(semitones) = semitones {
                        transpose = semitones;
                    }
                    scheduler.play(events, tempo, transpose);
                }
                Command::Stop => {
                    scheduler.stop();
                }
                Command::SetTempo { bpm } => match config.tempo(bpm) {
                    Ok(new_tempo) => {
                        tempo = new_tempo;
                        scheduler.set_tempo(tempo);
                    }
                    Err(err) => log::warn!("ignoring tempo: {}", err),
                },
                Command::SetTranspose { semitones } => {
                    transpose = semitones;
                    scheduler.set_transpose(transpose);
                }
                Command::Quit => break,
            }
        }

        scheduler.stop();
        Ok(scheduler)
    }
}

/// A handle to a running [`Player`].
///
/// Returned by [`Player::handle`]. Commands sent after the player has stopped are dropped.
#[derive(Debug, Clone)]
pub struct Handle {
    sender: Sender<Result<Command>>,
    config: Config,
}

impl Handle {
    /// Plays `events` at the player's current tempo and transposition.
    pub fn play(&self, events: Vec<NoteEvent>) {
        self.send(Command::Play {
            events,
            bpm: None,
            transpose: None,
        });
    }

    pub fn play_with(&self, events: Vec<NoteEvent>, bpm: f64, transpose: i32) {
        self.send(Command::Play {
            events,
            bpm: Some(bpm),
            transpose: Some(transpose),
        });
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Changes the tempo, clamped to the player's configured range.
    pub fn set_tempo(&self, bpm: f64) {
        let bpm = self.config.clamp_bpm(bpm);
        self.send(Command::SetTempo { bpm });
    }

    pub fn set_transpose(&self, semitones: i32) {
        self.send(Command::SetTranspose { semitones });
    }

    pub fn quit(self) {
        self.send(Command::Quit);
    }

    fn send(&self, command: Command) {
        let _ = self.sender.send(Ok(command));
    }
}

/// Writes every [`PlaybackEvent`] to `W` as a line of JSON.
#[derive(Debug)]
pub struct EventWriter<W> {
    write: W,
}

impl<W: Write> EventWriter<W> {
    pub fn new(write: W) -> EventWriter<W> {
        EventWriter { write }
    }

    pub fn into_inner(self) -> W {
        self.write
    }

    fn emit(&mut self, event: &PlaybackEvent) -> Result<()> {
        let event = serde_json::to_string(event).map_err(Error::EventSerialize)?;
        writeln!(self.write, "{}", event).map_err(Error::EventWrite)?;
        Ok(())
    }
}

impl<W: Write> PlaybackObserver for EventWriter<W> {
    fn notify(&mut self, event: &PlaybackEvent) {
        if let Err(err) = self.emit(event) {
            log::error!("{}", err);
        }
    }
}

fn spawn_command_forwarder<R>(sender: Sender<Result<Command>>, read: R)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let lines = io::BufReader::new(read).lines();
        for line in lines {
            let command = line
                .map_err(Error::CommandRead)
                .and_then(|line| serde_json::from_str(&line).map_err(Error::CommandDeserialize));
            let read_failed = command.is_err();
            let send_failed = sender.send(command).is_err();
            if read_failed || send_failed {
                break;
            }
        }
    });
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid player configuration: {0}")]
    Config(#[from] config::Error),
    #[error("failed to deserialize command: {0}")]
    CommandDeserialize(serde_json::Error),
    #[error("failed to read command from input stream: {0}")]
    CommandRead(io::Error),
    #[error("failed to serialize event: {0}")]
    EventSerialize(serde_json::Error),
    #[error("failed to write event to output stream: {0}")]
    EventWrite(io::Error),
}
