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

//! Note naming, semitone arithmetic and enharmonic spelling.
//!
//! Pitches are spelled with sharps only. A [`Pitch`] is a step letter, an alteration in
//! semitones, and an octave number. Its absolute semitone value counts up from C0 (so C4 is 48
//! and the [MIDI number](Pitch::midi) of C4 is 60).
//!
//! Two unrelated kinds of transposition live here:
//!
//! * [`transpose_note_name`] moves a note by an exact number of semitones and re-spells it.
//! * [`transpose_by_key_offset`] rotates only the step letter through the seven natural notes,
//!   the way the per-instrument practice pages move a melody from C to another key letter. It is
//!   not semitone accurate and the two must not be substituted for each other.
//!
//! # Examples
//!
//! ```
//! use etude::pitch::{transpose_by_key_offset, transpose_note_name};
//!
//! assert_eq!(transpose_note_name("C4", 2).unwrap(), "D4");
//! assert_eq!(transpose_note_name("B4", 1).unwrap(), "C5");
//! assert_eq!(transpose_by_key_offset("C", "C", "D").unwrap(), "D");
//! ```

use std::{fmt, ops::RangeInclusive, str::FromStr};
use thiserror::Error;

/// One of the seven natural note letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// The natural notes in ascending order starting from C.
    pub const ALL: [Step; 7] = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];

    /// Semitones between C and this step within one octave.
    pub fn semitones_from_c(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    /// Parses a step letter, case insensitive.
    pub fn from_char(c: char) -> Option<Step> {
        Some(match c.to_ascii_uppercase() {
            'C' => Step::C,
            'D' => Step::D,
            'E' => Step::E,
            'F' => Step::F,
            'G' => Step::G,
            'A' => Step::A,
            'B' => Step::B,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            Step::C => 'C',
            Step::D => 'D',
            Step::E => 'E',
            Step::F => 'F',
            Step::G => 'G',
            Step::A => 'A',
            Step::B => 'B',
        }
    }

    /// Position of this step in [`Step::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Moves the letter `offset` places through the natural-note cycle, wrapping in both
    /// directions.
    pub fn rotate(self, offset: i32) -> Step {
        let len = Step::ALL.len() as i32;
        Step::ALL[(self.index() as i32 + offset).rem_euclid(len) as usize]
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Step {
    type Err = InvalidPitch;

    fn from_str(s: &str) -> Result<Step, InvalidPitch> {
        let mut chars = s.trim().chars();
        match (chars.next().and_then(Step::from_char), chars.next()) {
            (Some(step), None) => Ok(step),
            _ => Err(InvalidPitch::new(s, Reason::Step)),
        }
    }
}

/// Octave numbers accepted in note names and scores.
pub const OCTAVES: RangeInclusive<i32> = -16..=16;

/// Alterations accepted in scores, in semitones.
pub const ALTERS: RangeInclusive<i32> = -12..=12;

/// A spelled pitch.
///
/// Pitches produced by [`spell_semitone`] always have an `alter` of 0 or 1. Pitches read from a
/// score may carry any alteration, e.g. -2 for a double flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub step: Step,
    pub alter: i32,
    pub octave: i32,
}

impl Pitch {
    pub fn new(step: Step, alter: i32, octave: i32) -> Pitch {
        Pitch {
            step,
            alter,
            octave,
        }
    }

    /// The absolute semitone value of this pitch, where C0 is 0.
    pub fn semitone(&self) -> i32 {
        semitone_of(self.step, self.alter, self.octave)
    }

    /// Spells an absolute semitone value using sharps.
    pub fn from_semitone(semitone: i32) -> Pitch {
        spell_semitone(semitone)
    }

    /// Returns this pitch moved by `semitones`, re-spelled with sharps.
    ///
    /// Saturates at the ends of the `i32` range.
    pub fn transpose(&self, semitones: i32) -> Pitch {
        spell_semitone(self.semitone().saturating_add(semitones))
    }

    /// Like [`Pitch::transpose`], but returns `None` if the result falls outside [`OCTAVES`].
    pub fn checked_transpose(&self, semitones: i32) -> Option<Pitch> {
        let pitch = spell_semitone(self.semitone().checked_add(semitones)?);
        if OCTAVES.contains(&pitch.octave) {
            Some(pitch)
        } else {
            None
        }
    }

    /// The MIDI note number of this pitch (C4 = 60).
    pub fn midi(&self) -> i32 {
        self.semitone() + 12
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.step)?;
        let accidental = if self.alter > 0 { '#' } else { 'b' };
        for _ in 0..self.alter.abs() {
            write!(f, "{}", accidental)?;
        }
        write!(f, "{}", self.octave)
    }
}

impl FromStr for Pitch {
    type Err = InvalidPitch;

    /// Parses note names such as `C4`, `F#3`, `Bb2` or `B-1`.
    fn from_str(s: &str) -> Result<Pitch, InvalidPitch> {
        let text = s.trim();
        let mut chars = text.char_indices();
        let step = chars
            .next()
            .and_then(|(_, c)| Step::from_char(c))
            .ok_or_else(|| InvalidPitch::new(s, Reason::Step))?;

        let rest = &text[1..];
        let alter: i32 = match rest.chars().next() {
            Some('#') => 1,
            Some('b') => -1,
            _ => 0,
        };
        let octave = &rest[alter.abs() as usize..];
        let digits = octave.strip_prefix('-').unwrap_or(octave);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidPitch::new(s, Reason::Octave));
        }
        let octave = octave
            .parse::<i32>()
            .ok()
            .filter(|octave| OCTAVES.contains(octave))
            .ok_or_else(|| InvalidPitch::new(s, Reason::Octave))?;

        Ok(Pitch::new(step, alter, octave))
    }
}

/// Computes the absolute semitone value `stepsToC[step] + alter + 12 * octave`.
///
/// Saturates at the ends of the `i32` range.
pub fn semitone_of(step: Step, alter: i32, octave: i32) -> i32 {
    octave
        .saturating_mul(12)
        .saturating_add(alter)
        .saturating_add(step.semitones_from_c())
}

/// Spells an absolute semitone value with the canonical sharps-only table.
///
/// Uses floored division so negative values land in the octave below zero.
///
/// ```
/// use etude::pitch::{spell_semitone, Pitch, Step};
///
/// assert_eq!(spell_semitone(49), Pitch::new(Step::C, 1, 4));
/// assert_eq!(spell_semitone(-1), Pitch::new(Step::B, 0, -1));
/// ```
pub fn spell_semitone(semitone: i32) -> Pitch {
    const SPELLING: [(Step, i32); 12] = [
        (Step::C, 0),
        (Step::C, 1),
        (Step::D, 0),
        (Step::D, 1),
        (Step::E, 0),
        (Step::F, 0),
        (Step::F, 1),
        (Step::G, 0),
        (Step::G, 1),
        (Step::A, 0),
        (Step::A, 1),
        (Step::B, 0),
    ];
    let (step, alter) = SPELLING[semitone.rem_euclid(12) as usize];
    Pitch::new(step, alter, semitone.div_euclid(12))
}

/// Transposes a note name like `"C4"` by a number of semitones.
///
/// # Errors
///
/// Returns [`InvalidPitch`] if `note` is not a valid note name, or if the result would leave
/// [`OCTAVES`].
pub fn transpose_note_name(note: &str, semitones: i32) -> Result<String, InvalidPitch> {
    let pitch: Pitch = note.parse()?;
    pitch
        .checked_transpose(semitones)
        .map(|pitch| pitch.to_string())
        .ok_or_else(|| InvalidPitch::new(note, Reason::Octave))
}

/// Rotates the step letter of `note` by the distance between two key letters.
///
/// Only the leading letter takes part in the rotation. Whatever follows it, an accidental or an
/// octave number, is carried over untouched, so `"C2"` moved from C to D becomes `"D2"`.
///
/// # Errors
///
/// Returns [`InvalidPitch`] if the note does not start with a step letter or if either key is not
/// a single step letter.
pub fn transpose_by_key_offset(note: &str, from_key: &str, to_key: &str) -> Result<String, InvalidPitch> {
    let from: Step = from_key.parse()?;
    let to: Step = to_key.parse()?;
    let text = note.trim();
    let step = text
        .chars()
        .next()
        .and_then(Step::from_char)
        .ok_or_else(|| InvalidPitch::new(note, Reason::Step))?;

    let offset = to.index() as i32 - from.index() as i32;
    Ok(format!("{}{}", step.rotate(offset), &text[1..]))
}

/// A transposition target offered to the user, in semitones above C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOption {
    pub label: &'static str,
    pub semitones: i32,
}

/// The twelve keys a score can be transposed to.
pub const KEY_OPTIONS: [KeyOption; 12] = [
    KeyOption { label: "C", semitones: 0 },
    KeyOption { label: "C# / Db", semitones: 1 },
    KeyOption { label: "D", semitones: 2 },
    KeyOption { label: "D# / Eb", semitones: 3 },
    KeyOption { label: "E", semitones: 4 },
    KeyOption { label: "F", semitones: 5 },
    KeyOption { label: "F# / Gb", semitones: 6 },
    KeyOption { label: "G", semitones: 7 },
    KeyOption { label: "G# / Ab", semitones: 8 },
    KeyOption { label: "A", semitones: 9 },
    KeyOption { label: "A# / Bb", semitones: 10 },
    KeyOption { label: "B", semitones: 11 },
];

/// Looks up the key option for a semitone offset, wrapping into a single octave.
pub fn key_option(semitones: i32) -> KeyOption {
    KEY_OPTIONS[semitones.rem_euclid(12) as usize]
}

/// The error returned when note or pitch text cannot be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid pitch {text:?}: {reason}")]
pub struct InvalidPitch {
    text: String,
    reason: Reason,
}

impl InvalidPitch {
    pub(crate) fn new(text: impl Into<String>, reason: Reason) -> InvalidPitch {
        InvalidPitch {
            text: text.into(),
            reason,
        }
    }

    /// The text that failed to parse.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }
}

/// What was wrong with the text given to [`InvalidPitch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Reason {
    #[error("unrecognized step letter")]
    Step,
    #[error("missing or malformed octave")]
    Octave,
    #[error("malformed alteration")]
    Alter,
}
