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

//! Converting tempos and note lengths into seconds.
//!
//! Offsets are measured in seconds from the start of a playback session. [`OffsetTable`]
//! computes every event's offset in a single forward pass so long sequences do not accumulate
//! error from summing the same prefix over and over.
//!
//! # Examples
//!
//! ```
//! use etude::{
//!     event::{NoteEvent, NoteLength},
//!     tempo::{OffsetTable, Tempo},
//! };
//!
//! let events = vec![
//!     NoteEvent::pitch("C4", NoteLength::QUARTER),
//!     NoteEvent::pitch("C4", NoteLength::QUARTER),
//!     NoteEvent::pitch("G4", NoteLength::HALF),
//! ];
//! let tempo = Tempo::from_bpm(120.0)?;
//! let table = OffsetTable::new(&events, tempo.beat_seconds());
//!
//! assert_eq!(table.offset(2), Some(1.0));
//! assert_eq!(table.total(), 2.0);
//! # Ok::<(), etude::tempo::InvalidTempo>(())
//! ```

use crate::event::{NoteEvent, NoteLength};
use std::time::Duration;
use thiserror::Error;

/// A musical tempo.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tempo {
    bpm: f64,
}

impl Default for Tempo {
    /// Returns a tempo of 120 BPM (beats per minute).
    fn default() -> Tempo {
        Tempo { bpm: 120.0 }
    }
}

impl Tempo {
    /// Create a tempo from a BPM (beats per minute).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTempo`] if `bpm` is not finite or not greater than zero.
    ///
    /// ```
    /// use etude::tempo::Tempo;
    /// use std::time::Duration;
    ///
    /// assert_eq!(Tempo::from_bpm(60.0).unwrap().beat_duration(), Duration::from_secs(1));
    /// assert!(Tempo::from_bpm(0.0).is_err());
    /// ```
    pub fn from_bpm(bpm: f64) -> Result<Tempo, InvalidTempo> {
        if bpm.is_finite() && bpm > 0.0 {
            Ok(Tempo { bpm })
        } else {
            Err(InvalidTempo(bpm))
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Length of one beat in seconds.
    pub fn beat_seconds(&self) -> f64 {
        beat_duration(self.bpm)
    }

    pub fn beat_duration(&self) -> Duration {
        Duration::from_secs_f64(self.beat_seconds())
    }
}

/// The error returned by [`Tempo::from_bpm`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("tempo must be a positive number of beats per minute, got {0}")]
pub struct InvalidTempo(pub f64);

/// Seconds per beat at the given BPM.
pub fn beat_duration(bpm: f64) -> f64 {
    60.0 / bpm
}

/// Resolves a note length into seconds.
///
/// Symbolic values are multiples of `beat_seconds`; millisecond values ignore the tempo.
pub fn resolve_duration(length: NoteLength, beat_seconds: f64) -> f64 {
    match length {
        NoteLength::Beats(value) => value.beats() * beat_seconds,
        NoteLength::Millis(millis) => millis as f64 / 1000.0,
    }
}

/// Seconds from the start of `events` until the event at `upto` begins.
///
/// Indices past the end return the total length of the sequence.
pub fn cumulative_offset(events: &[NoteEvent], upto: usize, beat_seconds: f64) -> f64 {
    events
        .iter()
        .take(upto)
        .map(|event| resolve_duration(event.duration, beat_seconds))
        .sum()
}

/// Start offsets and lengths for a whole event sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetTable {
    slots: Vec<Slot>,
    total: f64,
}

/// Where a single event sits in time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub offset: f64,
    pub duration: f64,
}

impl OffsetTable {
    pub fn new(events: &[NoteEvent], beat_seconds: f64) -> OffsetTable {
        let mut total = 0.0;
        let slots = events
            .iter()
            .map(|event| {
                let duration = resolve_duration(event.duration, beat_seconds);
                let slot = Slot {
                    offset: total,
                    duration,
                };
                total += duration;
                slot
            })
            .collect();
        OffsetTable { slots, total }
    }

    pub fn offset(&self, index: usize) -> Option<f64> {
        self.slots.get(index).map(|slot| slot.offset)
    }

    pub fn duration(&self, index: usize) -> Option<f64> {
        self.slots.get(index).map(|slot| slot.duration)
    }

    /// When the last event ends.
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}
