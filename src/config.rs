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

//! Playback settings.
//!
//! Every field has a default, so a configuration file only needs to name what it changes:
//!
//! ```
//! use etude::config::Config;
//! use std::time::Duration;
//!
//! let config = Config::from_json(r#"{ "ahead_by_ms": 50, "max_bpm": 240 }"#)?;
//!
//! assert_eq!(config.ahead_by(), Duration::from_millis(50));
//! assert_eq!(config.clamp_bpm(300.0), 240.0);
//! assert_eq!(config.clamp_bpm(20.0), 60.0);
//! # Ok::<(), etude::config::Error>(())
//! ```

use crate::highlight::HighlightStyle;
use crate::tempo::{InvalidTempo, Tempo};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How far ahead of its start time an event's sound is handed to the audio sink.
    pub ahead_by_ms: u64,
    pub default_bpm: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub highlight: HighlightStyle,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            ahead_by_ms: 100,
            default_bpm: 120.0,
            min_bpm: 60.0,
            max_bpm: 200.0,
            highlight: HighlightStyle::default(),
        }
    }
}

impl Config {
    /// Read a configuration from JSON and check that its tempo settings make sense.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, the BPM range is empty, or the default BPM is
    /// not a valid tempo.
    pub fn from_json(json: &str) -> Result<Config, Error> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        Tempo::from_bpm(self.min_bpm)?;
        Tempo::from_bpm(self.max_bpm)?;
        if self.min_bpm > self.max_bpm {
            return Err(Error::TempoRange {
                min: self.min_bpm,
                max: self.max_bpm,
            });
        }
        Tempo::from_bpm(self.default_bpm)?;
        Ok(())
    }

    pub fn ahead_by(&self) -> Duration {
        Duration::from_millis(self.ahead_by_ms)
    }

    /// Limits a BPM to the configured range.
    pub fn clamp_bpm(&self, bpm: f64) -> f64 {
        bpm.max(self.min_bpm).min(self.max_bpm)
    }

    /// The tempo at `bpm` after limiting it to the configured range.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTempo`] if `bpm` is not a valid tempo before clamping.
    pub fn tempo(&self, bpm: f64) -> Result<Tempo, InvalidTempo> {
        Tempo::from_bpm(bpm)?;
        Tempo::from_bpm(self.clamp_bpm(bpm))
    }

    pub fn default_tempo(&self) -> Result<Tempo, InvalidTempo> {
        self.tempo(self.default_bpm)
    }
}

/// The error type returned by [`Config::from_json`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("parsing configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("minimum BPM {min} is above maximum BPM {max}")]
    TempoRange { min: f64, max: f64 },
    #[error(transparent)]
    Tempo(#[from] InvalidTempo),
}
