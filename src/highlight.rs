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

//! Keeping rendered notation in step with playback.
//!
//! A [`NotationRenderer`] turns a score into visual note handles, listed in the same order as the
//! events being played. [`ScoreRenderHighlighter`] paints the handle of the event that is
//! currently sounding and returns every other handle to its default color.

use crate::scheduler::{PlaybackEvent, PlaybackObserver};
use crate::score::ScoreDocument;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Colors used for highlighting, as CSS color strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightStyle {
    pub default_color: String,
    pub accent_color: String,
}

impl Default for HighlightStyle {
    fn default() -> HighlightStyle {
        HighlightStyle {
            default_color: "#000".to_owned(),
            accent_color: "#2196F3".to_owned(),
        }
    }
}

/// A single rendered note.
pub trait NoteHandle {
    /// Colors the note itself.
    fn set_color(&mut self, color: &str);

    /// Colors every visual part drawn as part of the note, such as its stem, flag and
    /// accidentals.
    fn set_descendants_color(&mut self, color: &str);
}

/// Draws scores and exposes their notes.
pub trait NotationRenderer {
    type Handle: NoteHandle;

    /// Renders a MusicXML document, replacing whatever was drawn before.
    fn load(&mut self, score: &str) -> Result<(), RenderError>;

    /// Removes everything that has been drawn.
    fn clear(&mut self);

    /// The rendered notes, in playback order.
    fn handles_mut(&mut self) -> &mut [Self::Handle];
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to render score: {0}")]
pub struct RenderError(pub String);

/// Resets every handle to the default color, then accents the handle at `current`.
///
/// An index past the end only resets.
pub fn apply_highlight<H: NoteHandle>(handles: &mut [H], current: Option<usize>, style: &HighlightStyle) {
    for handle in handles.iter_mut() {
        paint(handle, &style.default_color);
    }
    if let Some(handle) = current.and_then(|index| handles.get_mut(index)) {
        paint(handle, &style.accent_color);
    }
}

fn paint<H: NoteHandle>(handle: &mut H, color: &str) {
    handle.set_color(color);
    handle.set_descendants_color(color);
}

/// Shows a score and highlights the note being played.
///
/// Implements [`PlaybackObserver`], so it can be handed straight to a
/// [`PlaybackScheduler`](crate::scheduler::PlaybackScheduler).
#[derive(Debug)]
pub struct ScoreRenderHighlighter<R> {
    renderer: R,
    style: HighlightStyle,
    current: Option<usize>,
    loaded: bool,
}

impl<R: NotationRenderer> ScoreRenderHighlighter<R> {
    pub fn new(renderer: R, style: HighlightStyle) -> ScoreRenderHighlighter<R> {
        ScoreRenderHighlighter {
            renderer,
            style,
            current: None,
            loaded: false,
        }
    }

    /// Renders `score`. On failure nothing is left on display.
    pub fn load(&mut self, score: &ScoreDocument) -> Result<(), RenderError> {
        self.current = None;
        if let Err(err) = self.renderer.load(&score.to_string()) {
            self.clear();
            return Err(err);
        }
        self.loaded = true;
        apply_highlight(self.renderer.handles_mut(), None, &self.style);
        Ok(())
    }

    /// Highlights the note at `current`, or no note at all.
    pub fn show(&mut self, current: Option<usize>) {
        self.current = current;
        if self.loaded {
            apply_highlight(self.renderer.handles_mut(), current, &self.style);
        }
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn clear(&mut self) {
        self.renderer.clear();
        self.loaded = false;
        self.current = None;
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

impl<R: NotationRenderer> PlaybackObserver for ScoreRenderHighlighter<R> {
    fn notify(&mut self, event: &PlaybackEvent) {
        if let PlaybackEvent::Position(current) = event {
            self.show(*current);
        }
    }
}
