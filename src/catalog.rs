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

//! The built-in practice material for each instrument.

use crate::event::{BeatValue, EventKind, NoteEvent, NoteLength};
use crate::pitch::{transpose_by_key_offset, InvalidPitch, Step};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use self::BeatValue::{Half, Quarter};
use self::Drum::{Hihat, Kick, Snare};
use self::Step::{A, C, D, E, F, G};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Piano,
    Drum,
    Bass,
    Guitar,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [
        Instrument::Piano,
        Instrument::Drum,
        Instrument::Bass,
        Instrument::Guitar,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::Drum => "drum",
            Instrument::Bass => "bass",
            Instrument::Guitar => "guitar",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Instrument::Piano => "Piano",
            Instrument::Drum => "Drum",
            Instrument::Bass => "Bass",
            Instrument::Guitar => "Guitar",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Instrument {
    type Err = UnknownInstrument;

    fn from_str(s: &str) -> Result<Instrument, UnknownInstrument> {
        Instrument::ALL
            .iter()
            .copied()
            .find(|instrument| instrument.id() == s)
            .ok_or_else(|| UnknownInstrument(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown instrument {0:?}")]
pub struct UnknownInstrument(pub String);

/// A piece of the drum kit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Drum {
    Kick,
    Snare,
    Hihat,
}

impl Drum {
    /// The percussion id handed to the audio sink.
    pub fn id(self) -> &'static str {
        match self {
            Drum::Kick => "kick",
            Drum::Snare => "snare",
            Drum::Hihat => "hihat",
        }
    }

    /// The drum written on the staff at `step` in drum notation.
    pub fn for_step(step: Step) -> Option<Drum> {
        match step {
            Step::C => Some(Drum::Kick),
            Step::E => Some(Drum::Snare),
            Step::G => Some(Drum::Hihat),
            _ => None,
        }
    }

    fn event(self, duration: NoteLength) -> NoteEvent {
        NoteEvent::percussion(self.id(), duration)
    }
}

// Twinkle Twinkle Little Star.
const MELODY: [(Step, BeatValue); 14] = [
    (C, Quarter),
    (C, Quarter),
    (G, Quarter),
    (G, Quarter),
    (A, Quarter),
    (A, Quarter),
    (G, Half),
    (F, Quarter),
    (F, Quarter),
    (E, Quarter),
    (E, Quarter),
    (D, Quarter),
    (D, Quarter),
    (C, Half),
];

const DRUM_PATTERN: [Drum; 15] = [
    Kick, Snare, Hihat, Snare, Kick, Hihat, Snare, Hihat, Kick, Snare, Kick, Snare, Kick, Hihat,
    Snare,
];

const DRUM_HIT_MS: u64 = 500;
const DRUM_LAST_HIT_MS: u64 = 1000;
const HOME_OCTAVE: i32 = 4;

/// The practice sequence for `instrument`.
///
/// Melodic instruments get bare step letters with beat durations. The drum gets its pattern in
/// milliseconds.
pub fn sequence_for(instrument: Instrument) -> Vec<NoteEvent> {
    match instrument {
        Instrument::Drum => {
            let last = DRUM_PATTERN.len() - 1;
            DRUM_PATTERN
                .iter()
                .enumerate()
                .map(|(i, drum)| {
                    let millis = if i == last { DRUM_LAST_HIT_MS } else { DRUM_HIT_MS };
                    drum.event(NoteLength::Millis(millis))
                })
                .collect()
        }
        Instrument::Piano | Instrument::Bass | Instrument::Guitar => MELODY
            .iter()
            .map(|(step, value)| NoteEvent::pitch(step.to_string(), NoteLength::Beats(*value)))
            .collect(),
    }
}

/// The octave bare letters are voiced in for `instrument`, or `None` for the drum.
pub fn voicing_octave_for(instrument: Instrument) -> Option<i32> {
    match instrument {
        Instrument::Bass => Some(2),
        Instrument::Guitar | Instrument::Piano => Some(4),
        Instrument::Drum => None,
    }
}

/// The practice sequence for `instrument` in `key`, ready to play.
///
/// Each letter is moved through the natural notes from C to `key` and then voiced at the
/// instrument's octave, so in D the melody starts on `D4` for piano and `D2` for bass. Drum
/// sequences are returned unchanged.
pub fn practice_sequence(instrument: Instrument, key: Step) -> Result<Vec<NoteEvent>, InvalidPitch> {
    let octave = match voicing_octave_for(instrument) {
        Some(octave) => octave,
        None => return Ok(sequence_for(instrument)),
    };
    let key = key.to_string();

    sequence_for(instrument)
        .into_iter()
        .map(|event| {
            if event.kind != EventKind::Pitch {
                return Ok(event);
            }
            let letter = transpose_by_key_offset(&event.label, "C", &key)?;
            Ok(NoteEvent {
                label: format!("{}{}", letter, octave),
                ..event
            })
        })
        .collect()
}

/// The drum pattern played one hit per quarter note, so it follows the tempo.
pub fn drum_practice_sequence() -> Vec<NoteEvent> {
    DRUM_PATTERN
        .iter()
        .map(|drum| drum.event(NoteLength::QUARTER))
        .collect()
}

/// The melody played on the landing page, with octaves and millisecond durations.
pub fn home_melody() -> Vec<NoteEvent> {
    MELODY
        .iter()
        .map(|(step, value)| {
            let millis = match value {
                Quarter => 500,
                Half => 1000,
            };
            NoteEvent::pitch(format!("{}{}", step, HOME_OCTAVE), NoteLength::Millis(millis))
        })
        .collect()
}
