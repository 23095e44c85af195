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

//! MusicXML score documents and pitch transposition.
//!
//! A [`ScoreDocument`] keeps the original text of a score and the location of every `<pitch>`
//! element in it. Transposing a document rewrites the `<step>`, `<alter>` and `<octave>` children
//! of those elements and nothing else: every byte outside of them is written back exactly as it
//! was read.
//!
//! Pitches are re-spelled with sharps. An `<alter>` element is written only when the new pitch
//! has a non-zero alteration, and it is inserted right before `<octave>` when the original pitch
//! had none. A consequence is that an explicit `<alter>0</alter>` disappears even when
//! transposing by zero semitones.
//!
//! # Examples
//!
//! ```
//! use etude::score::ScoreDocument;
//!
//! let source = "<note><pitch><step>B</step><octave>4</octave></pitch><duration>1</duration></note>";
//! let score = ScoreDocument::parse(source)?;
//!
//! assert_eq!(
//!     score.transpose(1).to_string(),
//!     "<note><pitch><step>C</step><octave>5</octave></pitch><duration>1</duration></note>"
//! );
//! assert_eq!(
//!     score.transpose(-1).to_string(),
//!     "<note><pitch><step>A</step><alter>1</alter><octave>4</octave></pitch><duration>1</duration></note>"
//! );
//! # etude::score::Result::Ok(())
//! ```

use crate::highlight::RenderError;
use crate::pitch::{InvalidPitch, Pitch, Reason, Step, ALTERS, OCTAVES};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::{fmt, io, ops::RangeInclusive};
use thiserror::Error;

pub mod loader;

/// A specialized [`Result`] type for loading scores.
pub type Result<T> = std::result::Result<T, Error>;

/// A parsed score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDocument {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Verbatim(String),
    Pitch(PitchElement),
}

#[derive(Debug, Clone, PartialEq)]
struct PitchElement {
    pitch: Pitch,
    source: String,
    rewritten: bool,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Raw(String),
    Step,
    Alter,
    Octave,
}

impl ScoreDocument {
    /// Parse a MusicXML document.
    ///
    /// `<pitch>` elements missing a `<step>` or an `<octave>` are kept as plain content and are
    /// not affected by transposition.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not well formed XML, a `<pitch>` element is never closed,
    /// or a pitch has an unknown step letter or a non-integer alter or octave.
    pub fn parse(source: &str) -> Result<ScoreDocument> {
        let mut reader = Reader::from_str(source);
        let mut segments = Vec::new();
        let mut copied = 0;

        loop {
            let start = reader.buffer_position();
            match read_event(&mut reader)? {
                Event::Start(element) if element.name().as_ref() == b"pitch" => {
                    if let Some((pitch, end)) = read_pitch(&mut reader, source, start)? {
                        if copied < start {
                            segments.push(Segment::Verbatim(source[copied..start].to_owned()));
                        }
                        segments.push(Segment::Pitch(pitch));
                        copied = end;
                    } else {
                        log::debug!("leaving incomplete <pitch> at byte {} untouched", start);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if copied < source.len() {
            segments.push(Segment::Verbatim(source[copied..].to_owned()));
        }
        Ok(ScoreDocument { segments })
    }

    /// The pitches in this document in the order they appear.
    pub fn pitches(&self) -> impl Iterator<Item = Pitch> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Pitch(element) => Some(element.pitch),
            Segment::Verbatim(_) => None,
        })
    }

    /// Returns a copy of this document with every pitch moved by `semitones`.
    pub fn transpose(&self, semitones: i32) -> ScoreDocument {
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Pitch(element) => Segment::Pitch(PitchElement {
                    pitch: element.pitch.transpose(semitones),
                    rewritten: true,
                    ..element.clone()
                }),
                Segment::Verbatim(text) => Segment::Verbatim(text.clone()),
            })
            .collect();
        ScoreDocument { segments }
    }
}

impl fmt::Display for ScoreDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Verbatim(text) => f.write_str(text)?,
                Segment::Pitch(element) => element.write(f)?,
            }
        }
        Ok(())
    }
}

impl PitchElement {
    fn write(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.rewritten {
            return f.write_str(&self.source);
        }
        for part in &self.parts {
            match part {
                Part::Raw(text) => f.write_str(text)?,
                Part::Step => write!(f, "{}", self.pitch.step)?,
                Part::Alter if self.pitch.alter != 0 => {
                    write!(f, "<alter>{}</alter>", self.pitch.alter)?
                }
                Part::Alter => {}
                Part::Octave => write!(f, "{}", self.pitch.octave)?,
            }
        }
        Ok(())
    }
}

/// Transposes every pitch in `document` by `semitones`.
pub fn transpose(document: &ScoreDocument, semitones: i32) -> ScoreDocument {
    document.transpose(semitones)
}

/// Parses, transposes and re-serializes a MusicXML document in one step.
pub fn transpose_xml(source: &str, semitones: i32) -> Result<String> {
    Ok(ScoreDocument::parse(source)?.transpose(semitones).to_string())
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Step,
    Alter,
    Octave,
}

// Reads the children of a <pitch> element whose start tag began at `start`. Returns the element
// and the byte offset just past its end tag, or `None` if it lacks a step or an octave.
fn read_pitch(
    reader: &mut Reader<&[u8]>,
    source: &str,
    start: usize,
) -> Result<Option<(PitchElement, usize)>> {
    let mut parts = Vec::new();
    let mut cursor = start;
    let mut field = None;
    let mut has_alter = false;
    let mut step = None;
    let mut alter = 0;
    let mut octave = None;

    let end = loop {
        let position = reader.buffer_position();
        match read_event(reader)? {
            Event::Start(element) => match element.name().as_ref() {
                b"step" => field = Some(Field::Step),
                b"octave" => {
                    if !has_alter {
                        parts.push(Part::Raw(source[cursor..position].to_owned()));
                        parts.push(Part::Alter);
                        cursor = position;
                        has_alter = true;
                    }
                    field = Some(Field::Octave);
                }
                b"alter" => {
                    parts.retain(|part| *part != Part::Alter);
                    parts.push(Part::Raw(source[cursor..position].to_owned()));
                    cursor = position;
                    has_alter = true;
                    field = Some(Field::Alter);
                }
                _ => field = None,
            },
            Event::Empty(element) if element.name().as_ref() == b"alter" => {
                parts.retain(|part| *part != Part::Alter);
                parts.push(Part::Raw(source[cursor..position].to_owned()));
                parts.push(Part::Alter);
                cursor = reader.buffer_position();
                has_alter = true;
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(|source| Error::Xml {
                    position,
                    source,
                })?;
                let value = value.trim();
                let after = reader.buffer_position();
                match field {
                    Some(Field::Step) => {
                        step = Some(parse_step(value, position)?);
                        parts.push(Part::Raw(source[cursor..position].to_owned()));
                        parts.push(Part::Step);
                        cursor = after;
                    }
                    Some(Field::Octave) => {
                        octave = Some(parse_integer(value, Reason::Octave, OCTAVES, position)?);
                        parts.push(Part::Raw(source[cursor..position].to_owned()));
                        parts.push(Part::Octave);
                        cursor = after;
                    }
                    Some(Field::Alter) => {
                        alter = parse_integer(value, Reason::Alter, ALTERS, position)?
                    }
                    None => {}
                }
            }
            Event::End(element) => match element.name().as_ref() {
                b"alter" => {
                    // The whole <alter> element is regenerated on output.
                    parts.push(Part::Alter);
                    cursor = reader.buffer_position();
                    field = None;
                }
                b"pitch" => break reader.buffer_position(),
                _ => field = None,
            },
            Event::Eof => return Err(Error::UnterminatedPitch(start)),
            _ => {}
        }
    };
    parts.push(Part::Raw(source[cursor..end].to_owned()));

    Ok(match (step, octave) {
        (Some(step), Some(octave)) => Some((
            PitchElement {
                pitch: Pitch::new(step, alter, octave),
                source: source[start..end].to_owned(),
                rewritten: false,
                parts,
            },
            end,
        )),
        _ => None,
    })
}

fn read_event<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>> {
    reader.read_event().map_err(|source| Error::Xml {
        position: reader.buffer_position(),
        source,
    })
}

fn parse_step(value: &str, position: usize) -> Result<Step> {
    value
        .parse()
        .map_err(|source| Error::InvalidPitch { position, source })
}

fn parse_integer(
    value: &str,
    reason: Reason,
    range: RangeInclusive<i32>,
    position: usize,
) -> Result<i32> {
    let invalid = || Error::InvalidPitch {
        position,
        source: InvalidPitch::new(value, reason),
    };
    let number: f64 = value.parse().map_err(|_| invalid())?;
    let in_range = number >= f64::from(*range.start()) && number <= f64::from(*range.end());
    if !in_range || number.fract() != 0.0 {
        return Err(invalid());
    }
    Ok(number as i32)
}

/// The error type returned when a score cannot be loaded.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed score XML near byte {position}: {source}")]
    Xml {
        position: usize,
        source: quick_xml::Error,
    },
    #[error("invalid pitch in score at byte {position}: {source}")]
    InvalidPitch {
        position: usize,
        source: InvalidPitch,
    },
    #[error("<pitch> element starting at byte {0} is never closed")]
    UnterminatedPitch(usize),
    #[error("fetching score {url:?}: {source}")]
    Fetch { url: String, source: io::Error },
    #[error("rendering score: {0}")]
    Render(#[from] RenderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <part id="P1">
    <measure number="1">
      <note>
        <pitch>
          <step>C</step>
          <octave>4</octave>
        </pitch>
        <duration>1</duration>
        <type>quarter</type>
      </note>
      <note>
        <pitch>
          <step>F</step>
          <alter>1</alter>
          <octave>4</octave>
        </pitch>
        <duration>1</duration>
      </note>
      <note>
        <rest/>
        <duration>2</duration>
      </note>
      <note>
        <pitch>
          <step>B</step>
          <alter>-1</alter>
          <octave>3</octave>
        </pitch>
      </note>
    </measure>
  </part>
</score-partwise>
"#;

    #[test]
    fn parse_keeps_source_test() {
        let score = ScoreDocument::parse(SCORE).unwrap();
        assert_eq!(SCORE, score.to_string());
        assert_eq!(
            vec![
                Pitch::new(Step::C, 0, 4),
                Pitch::new(Step::F, 1, 4),
                Pitch::new(Step::B, -1, 3)
            ],
            score.pitches().collect::<Vec<_>>()
        );
    }

    #[test]
    fn transpose_test() {
        let score = ScoreDocument::parse(SCORE).unwrap().transpose(2);
        let expected = SCORE
            .replace(
                "<step>C</step>\n          <octave>4</octave>",
                "<step>D</step>\n          <octave>4</octave>",
            )
            .replace(
                "<step>F</step>\n          <alter>1</alter>\n          <octave>4</octave>",
                "<step>G</step>\n          <alter>1</alter>\n          <octave>4</octave>",
            )
            .replace(
                "<step>B</step>\n          <alter>-1</alter>\n          <octave>3</octave>",
                "<step>C</step>\n          \n          <octave>4</octave>",
            );
        assert_eq!(expected, score.to_string());
    }

    #[test]
    fn transpose_inserts_alter_before_octave() {
        let score = ScoreDocument::parse(SCORE).unwrap().transpose(1);
        let text = score.to_string();
        assert!(text.contains("<step>C</step>\n          <alter>1</alter><octave>4</octave>"));
        assert!(text.contains("<step>G</step>\n          \n          <octave>4</octave>"));
        assert!(text.contains("<step>B</step>\n          \n          <octave>3</octave>"));
    }

    #[test]
    fn transpose_zero_drops_explicit_natural() {
        let source = "<pitch><step>E</step><alter>0</alter><octave>2</octave></pitch>";
        let score = ScoreDocument::parse(source).unwrap();
        assert_eq!(source, score.to_string());
        assert_eq!(
            "<pitch><step>E</step><octave>2</octave></pitch>",
            score.transpose(0).to_string()
        );
    }

    #[test]
    fn transpose_is_associative() {
        let score = ScoreDocument::parse(SCORE).unwrap();
        for a in -14..14 {
            for b in -14..14 {
                let stepwise = score.transpose(a).transpose(b);
                let direct = score.transpose(a + b);
                assert_eq!(direct.to_string(), stepwise.to_string());
            }
        }
    }

    #[test]
    fn transpose_zero_keeps_semitones() {
        let score = ScoreDocument::parse(SCORE).unwrap();
        let semitones = |doc: &ScoreDocument| doc.pitches().map(|p| p.semitone()).collect::<Vec<_>>();
        assert_eq!(semitones(&score), semitones(&score.transpose(0)));
        assert_eq!(
            semitones(&score),
            semitones(&score.transpose(5).transpose(-5))
        );
    }

    #[test]
    fn transpose_below_octave_zero() {
        let source = "<pitch><step>C</step><octave>0</octave></pitch>";
        assert_eq!(
            "<pitch><step>B</step><octave>-1</octave></pitch>",
            transpose_xml(source, -1).unwrap()
        );
    }

    #[test]
    fn unpitched_and_incomplete_content_is_untouched() {
        let source = concat!(
            "<note><unpitched><display-step>C</display-step>",
            "<display-octave>5</display-octave></unpitched></note>",
            "<note><pitch><step>G</step></pitch></note>",
            "<!-- <pitch><step>C</step><octave>4</octave></pitch> -->"
        );
        assert_eq!(source, transpose_xml(source, 3).unwrap());
    }

    #[test]
    fn alter_after_octave_is_rewritten_in_place() {
        let source = "<pitch><step>D</step><octave>4</octave><alter>1</alter></pitch>";
        assert_eq!(
            "<pitch><step>E</step><octave>4</octave></pitch>",
            transpose_xml(source, 1).unwrap()
        );
    }

    #[test]
    fn parse_errors_test() {
        assert!(matches!(
            ScoreDocument::parse("<pitch><step>H</step><octave>4</octave></pitch>"),
            Err(Error::InvalidPitch { .. })
        ));
        assert!(matches!(
            ScoreDocument::parse("<pitch><step>C</step><octave>four</octave></pitch>"),
            Err(Error::InvalidPitch { .. })
        ));
        assert!(matches!(
            ScoreDocument::parse("<pitch><step>C</step><alter>0.5</alter><octave>4</octave></pitch>"),
            Err(Error::InvalidPitch { .. })
        ));
        assert!(matches!(
            ScoreDocument::parse("<note><pitch><step>C</step></note>"),
            Err(Error::Xml { .. })
        ));
        assert!(ScoreDocument::parse("<pitch><step>C</step><octave>4</octave>").is_err());
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        for pitch in &[
            "<pitch><step>C</step><octave>999999999</octave></pitch>",
            "<pitch><step>C</step><octave>1e12</octave></pitch>",
            "<pitch><step>C</step><octave>-17</octave></pitch>",
            "<pitch><step>C</step><alter>13</alter><octave>4</octave></pitch>",
            "<pitch><step>C</step><alter>NaN</alter><octave>4</octave></pitch>",
        ] {
            match ScoreDocument::parse(pitch) {
                Err(Error::InvalidPitch { source, .. }) => {
                    assert!(source.reason() == Reason::Octave || source.reason() == Reason::Alter)
                }
                other => panic!("expected an invalid pitch in {}, got {:?}", pitch, other),
            }
        }

        let highest = ScoreDocument::parse("<pitch><step>B</step><octave>16</octave></pitch>").unwrap();
        assert_eq!(
            "<pitch><step>C</step><octave>17</octave></pitch>",
            highest.transpose(1).to_string()
        );
    }
}
