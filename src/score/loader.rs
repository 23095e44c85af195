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

//! Fetching scores and putting them on display.

use super::{Error, Result, ScoreDocument};
use crate::highlight::{NotationRenderer, ScoreRenderHighlighter};
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

/// Somewhere scores can be fetched from by URL.
///
/// Implemented for closures taking the URL and returning the document text.
pub trait ScoreSource {
    fn fetch(&self, url: &str) -> io::Result<String>;
}

impl<F> ScoreSource for F
where
    F: Fn(&str) -> io::Result<String>,
{
    fn fetch(&self, url: &str) -> io::Result<String> {
        self(url)
    }
}

/// Serves score URLs such as `/scores/twinkle.xml` from a directory on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> FileSource {
        FileSource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Only plain names below the root are served.
    fn resolve(&self, url: &str) -> io::Result<PathBuf> {
        let relative = Path::new(url.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("score URL {:?} leaves the score directory", url),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl ScoreSource for FileSource {
    fn fetch(&self, url: &str) -> io::Result<String> {
        fs::read_to_string(self.resolve(url)?)
    }
}

/// Fetches and parses the score at `url`, moving it by `semitones` if that is not zero.
pub fn load_score<S>(source: &S, url: &str, semitones: i32) -> Result<ScoreDocument>
where
    S: ScoreSource + ?Sized,
{
    let result = source
        .fetch(url)
        .map_err(|source| Error::Fetch {
            url: url.to_owned(),
            source,
        })
        .and_then(|text| ScoreDocument::parse(&text));

    match result {
        Ok(document) if semitones != 0 => Ok(document.transpose(semitones)),
        Ok(document) => Ok(document),
        Err(err) => {
            log::error!("failed to load score {:?}: {}", url, err);
            Err(err)
        }
    }
}

/// Loads the score at `url` and hands it to `highlighter` for display.
///
/// Nothing is left on display if loading or rendering fails.
pub fn show_score<S, R>(
    source: &S,
    url: &str,
    semitones: i32,
    highlighter: &mut ScoreRenderHighlighter<R>,
) -> Result<ScoreDocument>
where
    S: ScoreSource + ?Sized,
    R: NotationRenderer,
{
    let document = match load_score(source, url, semitones) {
        Ok(document) => document,
        Err(err) => {
            highlighter.clear();
            return Err(err);
        }
    };
    if let Err(err) = highlighter.load(&document) {
        log::error!("failed to render score {:?}: {}", url, err);
        return Err(Error::Render(err));
    }
    Ok(document)
}
