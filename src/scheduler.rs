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

//! Playing event sequences against an audio clock.
//!
//! A [`PlaybackScheduler`] turns a list of [`NoteEvent`]s into timers on the clock of an
//! [`AudioSink`]. For every event it arms two timers: one that hands the event's sound to the
//! sink, and one that moves the current position to the event's index. A final timer ends the
//! session once the last event's duration has elapsed.
//!
//! The scheduler is a cooperative state machine. It never sleeps and never spawns threads; the
//! owner calls [`PlaybackScheduler::poll`] whenever the deadline it returned has passed. The
//! [`driver`] module provides an event loop that does exactly that.
//!
//! # Sessions
//!
//! Each call to [`PlaybackScheduler::play`] starts a new session. Starting a session cancels
//! every timer of the previous one before anything new is armed, and every timer carries the id
//! of the session that armed it, so a timer from an old session can never move the position of a
//! new one. Within a session positions are reported in order, `Some(0)`, `Some(1)`, ... followed
//! by `None` once the session ends.
//!
//! # Ahead-of-time sounds
//!
//! Sounds are handed to the sink [`ahead_by`](PlaybackScheduler::ahead_by) before they are due,
//! along with the absolute clock time at which they should be heard. Position updates fire
//! exactly on time, so the notation highlight moves when the sound is heard rather than when it
//! was sent. A session's first event is due `ahead_by` after `play` is called.
//!
//! # Examples
//!
//! ```
//! use etude::{
//!     event::{NoteEvent, NoteLength},
//!     scheduler::{AudioSink, AudioUnavailable, PlaybackEvent, PlaybackScheduler},
//!     tempo::Tempo,
//! };
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct Silent {
//!     now: Duration,
//! }
//!
//! impl AudioSink for Silent {
//!     fn now(&self) -> Duration {
//!         self.now
//!     }
//!
//!     fn ensure_unlocked(&mut self) -> Result<(), AudioUnavailable> {
//!         Err(AudioUnavailable::new("no output device"))
//!     }
//!
//!     fn trigger_pitch(&mut self, _: &str, _: Duration, _: Duration) -> Result<(), AudioUnavailable> {
//!         Ok(())
//!     }
//!
//!     fn trigger_percussion(&mut self, _: &str, _: Duration) -> Result<(), AudioUnavailable> {
//!         Ok(())
//!     }
//! }
//!
//! let mut positions = Vec::new();
//! let mut scheduler = PlaybackScheduler::new(Silent::default(), |event: &PlaybackEvent| {
//!     if let PlaybackEvent::Position(index) = event {
//!         positions.push(*index);
//!     }
//! })
//! .ahead_by(Duration::from_millis(0));
//!
//! let events = vec![
//!     NoteEvent::pitch("C4", NoteLength::QUARTER),
//!     NoteEvent::pitch("D4", NoteLength::QUARTER),
//! ];
//! scheduler.play(events, Tempo::from_bpm(120.0)?, 0);
//!
//! // Without sound the positions still advance.
//! while let Some(deadline) = scheduler.poll() {
//!     scheduler.sink_mut().now = deadline;
//! }
//!
//! drop(scheduler);
//! assert_eq!(positions, vec![Some(0), Some(1), None]);
//! # Ok::<(), etude::tempo::InvalidTempo>(())
//! ```

use crate::config::Config;
use crate::event::{EventKind, NoteEvent};
use crate::pitch::transpose_note_name;
use crate::tempo::{OffsetTable, Tempo};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use thiserror::Error;

pub mod driver;
mod timer;

use timer::{Action, Timer, TimerQueue};

/// An audio output that can schedule sounds on its own clock.
///
/// Implementations own sample loading and playback. The scheduler only ever writes to the sink;
/// it never reads back anything but the clock.
pub trait AudioSink {
    /// The current time on the sink's clock. Must never go backwards.
    fn now(&self) -> Duration;

    /// Makes sure sound can be heard, unlocking the output device if necessary.
    ///
    /// Called once at the start of every session.
    fn ensure_unlocked(&mut self) -> Result<(), AudioUnavailable>;

    /// Plays `note` (for example `"C#4"`) at clock time `at` for `duration`.
    fn trigger_pitch(&mut self, note: &str, at: Duration, duration: Duration) -> Result<(), AudioUnavailable>;

    /// Plays a percussion sample such as `"kick"` at clock time `at`.
    fn trigger_percussion(&mut self, instrument: &str, at: Duration) -> Result<(), AudioUnavailable>;
}

/// The error returned by an [`AudioSink`] that cannot produce sound.
///
/// The scheduler never surfaces this error. Playback carries on silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("audio output unavailable: {0}")]
pub struct AudioUnavailable(String);

impl AudioUnavailable {
    pub fn new(reason: impl Into<String>) -> AudioUnavailable {
        AudioUnavailable(reason.into())
    }
}

/// Identifies one playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that happened during playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "value")]
pub enum PlaybackEvent {
    /// A session was armed and is about to play.
    Started(SessionId),
    /// The current event index changed. `None` means nothing is playing.
    Position(Option<usize>),
    /// The last event of the session finished.
    Completed(SessionId),
    /// The session was stopped or replaced by a new one before it finished.
    Stopped(SessionId),
}

/// Receives [`PlaybackEvent`]s from a [`PlaybackScheduler`].
///
/// As a convenience, this trait is implemented for closures taking `&PlaybackEvent`.
pub trait PlaybackObserver {
    fn notify(&mut self, event: &PlaybackEvent);
}

impl<F> PlaybackObserver for F
where
    F: FnMut(&PlaybackEvent),
{
    fn notify(&mut self, event: &PlaybackEvent) {
        self(event)
    }
}

impl PlaybackObserver for () {
    fn notify(&mut self, _event: &PlaybackEvent) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// Timers for a new session are being armed.
    Scheduling,
    Playing,
}

/// The state of the session currently playing.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    id: SessionId,
    events: Vec<NoteEvent>,
    offsets: OffsetTable,
    tempo: Tempo,
    transpose: i32,
    start: Duration,
    current_index: Option<usize>,
    audio: bool,
}

impl PlaybackSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn transpose(&self) -> i32 {
        self.transpose
    }

    /// The sink clock time at which the first event is heard.
    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Whether the sink accepted the unlock request at the start of this session.
    pub fn has_audio(&self) -> bool {
        self.audio
    }

    // `None` if the offset does not fit on the clock.
    fn clock_time(&self, seconds: f64) -> Option<Duration> {
        let offset = Duration::try_from_secs_f64(seconds).ok()?;
        self.start.checked_add(offset)
    }
}

// A timer fired for a session that is no longer current.
#[derive(Debug, Error)]
#[error("timer for stale session {0} discarded")]
struct StaleSession(SessionId);

/// Schedules event sequences against an [`AudioSink`] and reports progress to a
/// [`PlaybackObserver`].
///
/// See [the module level documentation](self) for more.
#[derive(Debug)]
pub struct PlaybackScheduler<S, O> {
    sink: S,
    observer: O,
    ahead_by: Duration,
    state: PlaybackState,
    session: Option<PlaybackSession>,
    timers: TimerQueue,
    next_session: u64,
}

impl<S, O> PlaybackScheduler<S, O>
where
    S: AudioSink,
    O: PlaybackObserver,
{
    pub fn new(sink: S, observer: O) -> PlaybackScheduler<S, O> {
        PlaybackScheduler {
            sink,
            observer,
            ahead_by: Duration::from_millis(100),
            state: PlaybackState::Idle,
            session: None,
            timers: TimerQueue::new(),
            next_session: 0,
        }
    }

    pub fn with_config(sink: S, observer: O, config: &Config) -> PlaybackScheduler<S, O> {
        PlaybackScheduler::new(sink, observer).ahead_by(config.ahead_by())
    }

    /// Hand sounds to the sink this long before they need to be heard.
    ///
    /// Defaults to 100 milliseconds.
    pub fn ahead_by(mut self, ahead_by: Duration) -> Self {
        self.ahead_by = ahead_by;
        self
    }

    /// Starts playing `events`, replacing any session that is already playing.
    ///
    /// Pitch events are moved by `transpose` semitones before they reach the sink. If the sink
    /// cannot be unlocked the session plays without sound, still reporting every position.
    pub fn play(&mut self, events: Vec<NoteEvent>, tempo: Tempo, transpose: i32) -> SessionId {
        self.end_session(PlaybackEvent::Stopped);
        self.state = PlaybackState::Scheduling;

        let id = SessionId(self.next_session);
        self.next_session += 1;
        log::debug!(
            "play: session {}, {} events at {} BPM, transposed {} semitones",
            id,
            events.len(),
            tempo.bpm(),
            transpose
        );

        let audio = match self.sink.ensure_unlocked() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("session {} will play without sound: {}", id, err);
                false
            }
        };

        let offsets = OffsetTable::new(&events, tempo.beat_seconds());
        let session = PlaybackSession {
            id,
            events,
            offsets,
            tempo,
            transpose,
            start: self.sink.now().saturating_add(self.ahead_by),
            current_index: None,
            audio,
        };

        // Offsets never exceed the total, so every event fits if the end does.
        let end = match session.clock_time(session.offsets.total()) {
            Some(end) => end,
            None => {
                log::warn!("session {} is too long to schedule at {} BPM", id, tempo.bpm());
                self.session = Some(session);
                self.observer.notify(&PlaybackEvent::Started(id));
                self.end_session(PlaybackEvent::Stopped);
                return id;
            }
        };

        for (index, slot) in session.offsets.slots().iter().enumerate() {
            let due = match session.clock_time(slot.offset) {
                Some(due) => due,
                None => continue,
            };
            if audio {
                self.timers
                    .arm(due.saturating_sub(self.ahead_by), id, Action::Sound(index));
            }
            self.timers.arm(due, id, Action::Position(index));
            self.state = PlaybackState::Playing;
        }
        self.timers.arm(end, id, Action::Complete);

        let empty = session.events.is_empty();
        self.session = Some(session);
        self.observer.notify(&PlaybackEvent::Started(id));
        if empty {
            self.end_session(PlaybackEvent::Completed);
        }
        id
    }

    /// Stops the current session.
    ///
    /// Returns `false` and does nothing if nothing is playing.
    pub fn stop(&mut self) -> bool {
        let stopped = self.end_session(PlaybackEvent::Stopped);
        if let Some(id) = stopped {
            log::debug!("stop: session {}", id);
        }
        stopped.is_some()
    }

    /// Restarts the current session from its first event at a new tempo.
    ///
    /// Returns the id of the new session, or `None` if nothing was playing.
    pub fn set_tempo(&mut self, tempo: Tempo) -> Option<SessionId> {
        let session = self.session.as_ref()?;
        let (events, transpose) = (session.events.clone(), session.transpose);
        log::debug!("set tempo: {} BPM", tempo.bpm());
        Some(self.play(events, tempo, transpose))
    }

    /// Restarts the current session from its first event with a new transposition.
    ///
    /// Returns the id of the new session, or `None` if nothing was playing.
    pub fn set_transpose(&mut self, transpose: i32) -> Option<SessionId> {
        let session = self.session.as_ref()?;
        let (events, tempo) = (session.events.clone(), session.tempo);
        log::debug!("set transpose: {} semitones", transpose);
        Some(self.play(events, tempo, transpose))
    }

    /// Fires every timer that is due on the sink's clock.
    ///
    /// Returns the clock time at which the next timer is due, or `None` if nothing is scheduled.
    pub fn poll(&mut self) -> Option<Duration> {
        let now = self.sink.now();
        while let Some(timer) = self.timers.pop_due(now) {
            if let Err(err) = self.fire(timer) {
                log::trace!("{}", err);
            }
        }
        self.timers.next_due()
    }

    /// When the next timer is due, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state != PlaybackState::Idle
    }

    pub fn current_index(&self) -> Option<usize> {
        self.session.as_ref().and_then(|session| session.current_index)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_parts(self) -> (S, O) {
        (self.sink, self.observer)
    }

    fn fire(&mut self, timer: Timer) -> Result<(), StaleSession> {
        let session = match &mut self.session {
            Some(session) if session.id == timer.session => session,
            _ => return Err(StaleSession(timer.session)),
        };

        match timer.action {
            Action::Sound(index) => {
                let event = &session.events[index];
                let slot = session.offsets.slots()[index];
                let at = session.clock_time(slot.offset).unwrap_or(timer.due);
                let length = Duration::try_from_secs_f64(slot.duration).unwrap_or_default();
                let result = match event.kind {
                    EventKind::Pitch => match transpose_note_name(&event.label, session.transpose) {
                        Ok(note) => {
                            log::debug!("trigger {} at {:?}", note, at);
                            self.sink.trigger_pitch(&note, at, length)
                        }
                        Err(err) => {
                            log::warn!("skipping sound for event {}: {}", index, err);
                            Ok(())
                        }
                    },
                    EventKind::Percussion => {
                        log::debug!("trigger {} at {:?}", event.label, at);
                        self.sink.trigger_percussion(&event.label, at)
                    }
                };
                if let Err(err) = result {
                    log::debug!("sound for event {} was not played: {}", index, err);
                }
            }
            Action::Position(index) => {
                session.current_index = Some(index);
                self.observer.notify(&PlaybackEvent::Position(Some(index)));
            }
            Action::Complete => {
                if let Some(id) = self.end_session(PlaybackEvent::Completed) {
                    log::debug!("session {} completed", id);
                }
            }
        }
        Ok(())
    }

    // Cancels every timer of the current session and reports how it ended.
    fn end_session(&mut self, ended: fn(SessionId) -> PlaybackEvent) -> Option<SessionId> {
        let session = self.session.take()?;
        let cancelled = self.timers.cancel_all();
        log::trace!("session {}: cancelled {} pending timers", session.id, cancelled);
        self.state = PlaybackState::Idle;
        if session.current_index.is_some() {
            self.observer.notify(&PlaybackEvent::Position(None));
        }
        self.observer.notify(&ended(session.id));
        Some(session.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NoteLength;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Debug, Default)]
    struct FakeSink {
        now: Duration,
        locked: bool,
        failing: bool,
        unlock_attempts: usize,
        sounds: Vec<(String, Duration)>,
    }

    impl AudioSink for FakeSink {
        fn now(&self) -> Duration {
            self.now
        }

        fn ensure_unlocked(&mut self) -> Result<(), AudioUnavailable> {
            self.unlock_attempts += 1;
            if self.locked {
                Err(AudioUnavailable::new("locked"))
            } else {
                Ok(())
            }
        }

        fn trigger_pitch(&mut self, note: &str, at: Duration, _: Duration) -> Result<(), AudioUnavailable> {
            if self.failing {
                return Err(AudioUnavailable::new("device lost"));
            }
            self.sounds.push((note.to_owned(), at));
            Ok(())
        }

        fn trigger_percussion(&mut self, instrument: &str, at: Duration) -> Result<(), AudioUnavailable> {
            if self.failing {
                return Err(AudioUnavailable::new("device lost"));
            }
            self.sounds.push((instrument.to_owned(), at));
            Ok(())
        }
    }

    type Log = Rc<RefCell<Vec<PlaybackEvent>>>;

    fn scheduler(sink: FakeSink) -> (PlaybackScheduler<FakeSink, impl PlaybackObserver>, Log) {
        let log: Log = Rc::default();
        let observer = {
            let log = log.clone();
            move |event: &PlaybackEvent| log.borrow_mut().push(*event)
        };
        let scheduler = PlaybackScheduler::new(sink, observer).ahead_by(Duration::from_millis(0));
        (scheduler, log)
    }

    fn positions(log: &Log) -> Vec<Option<usize>> {
        log.borrow()
            .iter()
            .filter_map(|event| match event {
                PlaybackEvent::Position(index) => Some(*index),
                _ => None,
            })
            .collect()
    }

    fn run_until<O: PlaybackObserver>(scheduler: &mut PlaybackScheduler<FakeSink, O>, time: Duration) {
        while let Some(deadline) = scheduler.poll() {
            if deadline > time {
                break;
            }
            scheduler.sink_mut().now = deadline;
        }
        scheduler.sink_mut().now = time;
        scheduler.poll();
    }

    fn quarters(notes: &[&str]) -> Vec<NoteEvent> {
        notes
            .iter()
            .map(|note| NoteEvent::pitch(*note, NoteLength::QUARTER))
            .collect()
    }

    fn bpm(bpm: f64) -> Tempo {
        Tempo::from_bpm(bpm).unwrap()
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn plays_to_completion_test() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        let id = scheduler.play(quarters(&["C4", "E4", "G4"]), bpm(120.0), 2);
        assert_eq!(PlaybackState::Playing, scheduler.state());

        run_until(&mut scheduler, ms(499));
        assert_eq!(Some(0), scheduler.current_index());
        run_until(&mut scheduler, ms(500));
        assert_eq!(Some(1), scheduler.current_index());
        run_until(&mut scheduler, ms(5000));

        assert_eq!(PlaybackState::Idle, scheduler.state());
        assert_eq!(None, scheduler.current_index());
        assert_eq!(vec![Some(0), Some(1), Some(2), None], positions(&log));
        assert_eq!(Some(&PlaybackEvent::Started(id)), log.borrow().first());
        assert_eq!(Some(&PlaybackEvent::Completed(id)), log.borrow().last());
        assert_eq!(
            vec![
                ("D4".to_owned(), ms(0)),
                ("F#4".to_owned(), ms(500)),
                ("A4".to_owned(), ms(1000)),
            ],
            scheduler.sink().sounds
        );
    }

    #[test]
    fn completes_after_last_duration() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        let events = vec![
            NoteEvent::pitch("C4", NoteLength::QUARTER),
            NoteEvent::pitch("G4", NoteLength::HALF),
        ];
        scheduler.play(events, bpm(60.0), 0);
        run_until(&mut scheduler, ms(2999));
        assert!(scheduler.is_playing());
        assert_eq!(Some(1), scheduler.current_index());
        run_until(&mut scheduler, ms(3000));
        assert!(!scheduler.is_playing());
        assert_eq!(vec![Some(0), Some(1), None], positions(&log));
    }

    #[test]
    fn stop_test() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        let id = scheduler.play(quarters(&["C4", "D4", "E4"]), bpm(120.0), 0);
        run_until(&mut scheduler, ms(600));
        assert!(scheduler.stop());

        assert_eq!(PlaybackState::Idle, scheduler.state());
        assert_eq!(None, scheduler.current_index());
        assert_eq!(None, scheduler.next_deadline());
        run_until(&mut scheduler, ms(5000));
        assert_eq!(vec![Some(0), Some(1), None], positions(&log));
        assert_eq!(Some(&PlaybackEvent::Stopped(id)), log.borrow().last());
        assert_eq!(2, scheduler.sink().sounds.len());
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        assert!(!scheduler.stop());
        assert!(!scheduler.stop());
        assert_eq!(PlaybackState::Idle, scheduler.state());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn new_session_supersedes_old_one() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        let first = scheduler.play(quarters(&["C4", "D4", "E4", "F4"]), bpm(120.0), 0);
        run_until(&mut scheduler, ms(1200));
        assert_eq!(Some(2), scheduler.current_index());

        let second = scheduler.play(quarters(&["G4", "A4"]), bpm(120.0), 0);
        assert_ne!(first, second);
        run_until(&mut scheduler, ms(10_000));

        assert_eq!(
            vec![
                PlaybackEvent::Started(first),
                PlaybackEvent::Position(Some(0)),
                PlaybackEvent::Position(Some(1)),
                PlaybackEvent::Position(Some(2)),
                PlaybackEvent::Position(None),
                PlaybackEvent::Stopped(first),
                PlaybackEvent::Started(second),
                PlaybackEvent::Position(Some(0)),
                PlaybackEvent::Position(Some(1)),
                PlaybackEvent::Position(None),
                PlaybackEvent::Completed(second),
            ],
            *log.borrow()
        );
        let notes: Vec<&str> = scheduler.sink().sounds.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(vec!["C4", "D4", "E4", "G4", "A4"], notes);
    }

    #[test]
    fn stale_timers_are_discarded() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        let first = scheduler.play(quarters(&["C4", "D4"]), bpm(120.0), 0);
        scheduler.play(quarters(&["E4"]), bpm(120.0), 0);

        // Simulate a cancellation that missed a timer.
        scheduler.timers.arm(ms(0), first, Action::Position(1));
        run_until(&mut scheduler, ms(0));

        assert_eq!(Some(0), scheduler.current_index());
        assert_eq!(vec![Some(0)], positions(&log));
    }

    #[test]
    fn locked_audio_keeps_positions_moving() {
        let sink = FakeSink {
            locked: true,
            ..FakeSink::default()
        };
        let (mut scheduler, log) = scheduler(sink);
        scheduler.play(quarters(&["C4", "D4"]), bpm(120.0), 0);
        assert!(!scheduler.session().unwrap().has_audio());
        run_until(&mut scheduler, ms(2000));

        assert_eq!(1, scheduler.sink().unlock_attempts);
        assert!(scheduler.sink().sounds.is_empty());
        assert_eq!(vec![Some(0), Some(1), None], positions(&log));
    }

    #[test]
    fn failing_triggers_keep_positions_moving() {
        let sink = FakeSink {
            failing: true,
            ..FakeSink::default()
        };
        let (mut scheduler, log) = scheduler(sink);
        scheduler.play(quarters(&["C4", "D4"]), bpm(120.0), 0);
        run_until(&mut scheduler, ms(2000));
        assert_eq!(vec![Some(0), Some(1), None], positions(&log));
    }

    #[test]
    fn malformed_notes_are_silent_but_keep_their_slot() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        scheduler.play(quarters(&["C4", "X9", "E4"]), bpm(120.0), 0);
        run_until(&mut scheduler, ms(2000));

        assert_eq!(vec![Some(0), Some(1), Some(2), None], positions(&log));
        assert_eq!(
            vec![("C4".to_owned(), ms(0)), ("E4".to_owned(), ms(1000))],
            scheduler.sink().sounds
        );
    }

    #[test]
    fn unplayable_octaves_are_skipped() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        scheduler.play(quarters(&["C999999999", "D4"]), bpm(120.0), 1);
        run_until(&mut scheduler, ms(2000));

        assert_eq!(vec![Some(0), Some(1), None], positions(&log));
        assert_eq!(vec![("D#4".to_owned(), ms(500))], scheduler.sink().sounds);
    }

    #[test]
    fn sessions_too_long_for_the_clock_stop_cleanly() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        let id = scheduler.play(quarters(&["C4", "D4"]), bpm(1e-18), 0);

        assert_eq!(PlaybackState::Idle, scheduler.state());
        assert_eq!(None, scheduler.current_index());
        assert_eq!(None, scheduler.next_deadline());
        assert_eq!(
            vec![PlaybackEvent::Started(id), PlaybackEvent::Stopped(id)],
            *log.borrow()
        );

        // The scheduler is still usable afterwards.
        scheduler.play(quarters(&["E4"]), bpm(120.0), 0);
        run_until(&mut scheduler, ms(1000));
        assert_eq!(vec![Some(0), None], positions(&log));
    }

    #[test]
    fn percussion_and_millisecond_events() {
        let (mut scheduler, _log) = scheduler(FakeSink::default());
        let events = vec![
            NoteEvent::percussion("kick", NoteLength::Millis(250)),
            NoteEvent::percussion("snare", NoteLength::Millis(250)),
        ];
        scheduler.play(events, bpm(60.0), 5);
        run_until(&mut scheduler, ms(1000));
        assert_eq!(
            vec![("kick".to_owned(), ms(0)), ("snare".to_owned(), ms(250))],
            scheduler.sink().sounds
        );
    }

    #[test]
    fn sounds_are_sent_ahead_of_positions() {
        let log: Log = Rc::default();
        let observer = {
            let log = log.clone();
            move |event: &PlaybackEvent| log.borrow_mut().push(*event)
        };
        let mut scheduler = PlaybackScheduler::new(FakeSink::default(), observer).ahead_by(ms(100));
        scheduler.play(quarters(&["C4", "D4"]), bpm(120.0), 0);
        assert_eq!(ms(100), scheduler.session().unwrap().start());

        run_until(&mut scheduler, ms(0));
        assert_eq!(vec![("C4".to_owned(), ms(100))], scheduler.sink().sounds);
        assert_eq!(None, scheduler.current_index());

        run_until(&mut scheduler, ms(100));
        assert_eq!(Some(0), scheduler.current_index());

        run_until(&mut scheduler, ms(500));
        assert_eq!(2, scheduler.sink().sounds.len());
        assert_eq!(Some(0), scheduler.current_index());

        run_until(&mut scheduler, ms(600));
        assert_eq!(Some(1), scheduler.current_index());
    }

    #[test]
    fn simultaneous_events_fire_in_sequence_order() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        let events = vec![
            NoteEvent::percussion("kick", NoteLength::Millis(0)),
            NoteEvent::percussion("hihat", NoteLength::Millis(0)),
            NoteEvent::percussion("snare", NoteLength::Millis(100)),
        ];
        scheduler.play(events, bpm(120.0), 0);
        run_until(&mut scheduler, ms(0));
        assert_eq!(vec![Some(0), Some(1), Some(2)], positions(&log));
        let drums: Vec<&str> = scheduler.sink().sounds.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(vec!["kick", "hihat", "snare"], drums);
    }

    #[test]
    fn empty_sequence_completes_immediately() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        let id = scheduler.play(Vec::new(), bpm(120.0), 0);
        assert_eq!(PlaybackState::Idle, scheduler.state());
        assert_eq!(None, scheduler.next_deadline());
        assert_eq!(
            vec![PlaybackEvent::Started(id), PlaybackEvent::Completed(id)],
            *log.borrow()
        );
    }

    #[test]
    fn tempo_change_restarts_session() {
        let (mut scheduler, log) = scheduler(FakeSink::default());
        assert_eq!(None, scheduler.set_tempo(bpm(60.0)));

        scheduler.play(quarters(&["C4", "D4", "E4"]), bpm(120.0), 0);
        run_until(&mut scheduler, ms(600));
        let restarted = scheduler.set_tempo(bpm(60.0)).unwrap();
        assert_eq!(60.0, scheduler.session().unwrap().tempo().bpm());
        assert_eq!(restarted, scheduler.session().unwrap().id());

        run_until(&mut scheduler, ms(1599));
        assert_eq!(Some(0), scheduler.current_index());
        run_until(&mut scheduler, ms(1600));
        assert_eq!(Some(1), scheduler.current_index());
        run_until(&mut scheduler, ms(10_000));
        assert_eq!(
            vec![Some(0), Some(1), None, Some(0), Some(1), Some(2), None],
            positions(&log)
        );
    }

    #[test]
    fn transpose_change_restarts_session() {
        let (mut scheduler, _log) = scheduler(FakeSink::default());
        scheduler.play(quarters(&["C4", "D4"]), bpm(120.0), 0);
        run_until(&mut scheduler, ms(0));
        scheduler.set_transpose(-1);
        run_until(&mut scheduler, ms(10_000));
        let notes: Vec<&str> = scheduler.sink().sounds.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(vec!["C4", "B3", "C#4"], notes);
    }
}
