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

//! Timed note and drum events.
//!
//! A [`NoteEvent`] is the unit the [scheduler](crate::scheduler) plays: a pitch name or a
//! percussion instrument id, and how long it lasts. Lengths are either symbolic note values that
//! scale with the tempo, or absolute milliseconds that do not.
//!
//! Events serialize to the same shape the instrument data uses:
//!
//! ```
//! use etude::event::{NoteEvent, NoteLength};
//!
//! let events: Vec<NoteEvent> = serde_json::from_str(
//!     r#"[
//!         {"kind": "pitch", "label": "C4", "duration": "4n"},
//!         {"kind": "percussion", "label": "kick", "duration": 500}
//!     ]"#,
//! )?;
//!
//! assert_eq!(events[0], NoteEvent::pitch("C4", NoteLength::QUARTER));
//! assert_eq!(events[1], NoteEvent::percussion("kick", NoteLength::Millis(500)));
//! # Ok::<(), serde_json::Error>(())
//! ```

use serde::{Deserialize, Serialize};

/// A playable event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub kind: EventKind,
    /// A note name such as `"C4"` for pitch events, an instrument id such as `"kick"` for
    /// percussion events.
    pub label: String,
    pub duration: NoteLength,
}

impl NoteEvent {
    pub fn pitch(label: impl Into<String>, duration: NoteLength) -> NoteEvent {
        NoteEvent {
            kind: EventKind::Pitch,
            label: label.into(),
            duration,
        }
    }

    pub fn percussion(label: impl Into<String>, duration: NoteLength) -> NoteEvent {
        NoteEvent {
            kind: EventKind::Percussion,
            label: label.into(),
            duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Pitch,
    Percussion,
}

/// How long an event lasts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteLength {
    /// A note value measured in beats.
    Beats(BeatValue),
    /// An absolute length in milliseconds, independent of tempo.
    Millis(u64),
}

impl NoteLength {
    pub const QUARTER: NoteLength = NoteLength::Beats(BeatValue::Quarter);
    pub const HALF: NoteLength = NoteLength::Beats(BeatValue::Half);
}

impl From<BeatValue> for NoteLength {
    fn from(value: BeatValue) -> NoteLength {
        NoteLength::Beats(value)
    }
}

impl From<u64> for NoteLength {
    fn from(millis: u64) -> NoteLength {
        NoteLength::Millis(millis)
    }
}

/// Symbolic note values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeatValue {
    #[serde(rename = "4n")]
    Quarter,
    #[serde(rename = "2n")]
    Half,
}

impl BeatValue {
    /// The number of beats this value spans.
    pub fn beats(self) -> f64 {
        match self {
            BeatValue::Quarter => 1.0,
            BeatValue::Half => 2.0,
        }
    }
}
