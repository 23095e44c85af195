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

//! Score transposition and synchronized playback for music practice.
//!
//! # Introduction
//!
//! Etude is the engine behind a practice tool: it moves a MusicXML score into another key, plays a
//! sequence of notes or drum hits against an audio clock at a chosen tempo, and keeps the rendered
//! notation highlighted on the note that is currently sounding. Audio output and notation
//! rendering are left to the embedding application, which plugs them in through the
//! [`AudioSink`](scheduler::AudioSink) and [`NotationRenderer`](highlight::NotationRenderer)
//! traits.
//!
//! The crate contains:
//!
//!  * [`pitch`] - Note names, semitone arithmetic and sharp-only enharmonic spelling, along with
//!    the key choices offered to players.
//!
//!  * [`score`] - A MusicXML document model that rewrites `<pitch>` elements in place, and
//!    [`score::loader`] for fetching scores by URL.
//!
//!  * [`event`] and [`tempo`] - Timed note events and the beat arithmetic that turns them into
//!    offsets in seconds.
//!
//!  * [`scheduler`] - A [`PlaybackScheduler`](scheduler::PlaybackScheduler) that plays event
//!    sequences and reports the current position, and a [`driver`](scheduler::driver) that runs
//!    it on its own thread.
//!
//!  * [`highlight`] - Paints the current position onto rendered notation.
//!
//!  * [`catalog`] - The built-in practice material for piano, bass, guitar and drums.
//!
//!  * [`config`] - Playback settings that can be loaded from JSON.
//!
//! # Examples
//!
//! Transpose a score up a whole step and play the bass practice line in D, highlighting notes as
//! they play.
//!
//! ```no_run
//! use etude::{
//!     catalog::{self, Instrument},
//!     config::Config,
//!     highlight::{NotationRenderer, NoteHandle, RenderError, ScoreRenderHighlighter},
//!     pitch::Step,
//!     scheduler::{driver::Player, AudioSink, AudioUnavailable},
//!     score::loader::{show_score, FileSource},
//! };
//! use std::time::{Duration, Instant};
//!
//! struct Speaker(Instant);
//!
//! impl AudioSink for Speaker {
//!     fn now(&self) -> Duration {
//!         self.0.elapsed()
//!     }
//!
//!     fn ensure_unlocked(&mut self) -> Result<(), AudioUnavailable> {
//!         Ok(())
//!     }
//!
//!     fn trigger_pitch(&mut self, note: &str, at: Duration, _: Duration) -> Result<(), AudioUnavailable> {
//!         println!("{:?}: {}", at, note);
//!         Ok(())
//!     }
//!
//!     fn trigger_percussion(&mut self, drum: &str, at: Duration) -> Result<(), AudioUnavailable> {
//!         println!("{:?}: {}", at, drum);
//!         Ok(())
//!     }
//! }
//!
//! struct Glyph;
//!
//! impl NoteHandle for Glyph {
//!     fn set_color(&mut self, _: &str) {}
//!     fn set_descendants_color(&mut self, _: &str) {}
//! }
//!
//! struct Page(Vec<Glyph>);
//!
//! impl NotationRenderer for Page {
//!     type Handle = Glyph;
//!
//!     fn load(&mut self, score: &str) -> Result<(), RenderError> {
//!         self.0 = score.matches("<note>").map(|_| Glyph).collect();
//!         Ok(())
//!     }
//!
//!     fn clear(&mut self) {
//!         self.0.clear();
//!     }
//!
//!     fn handles_mut(&mut self) -> &mut [Glyph] {
//!         &mut self.0
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut highlighter = ScoreRenderHighlighter::new(Page(Vec::new()), config.highlight.clone());
//!     show_score(&FileSource::new("public"), "/scores/bass.xml", 2, &mut highlighter)?;
//!
//!     let player = Player::new(Speaker(Instant::now()), highlighter, config)?;
//!     let handle = player.handle();
//!     let thread = std::thread::spawn(move || player.run());
//!
//!     handle.play_with(catalog::practice_sequence(Instrument::Bass, Step::D)?, 90.0, 0);
//!     std::thread::sleep(Duration::from_secs(10));
//!     handle.quit();
//!
//!     thread.join().map_err(|_| "player thread panicked")??;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod event;
pub mod highlight;
pub mod pitch;
pub mod scheduler;
pub mod score;
pub mod tempo;
