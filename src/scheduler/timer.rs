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

use super::SessionId;
use std::{cmp::Ordering, cmp::Reverse, collections::BinaryHeap, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Sound(usize),
    Position(usize),
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub due: Duration,
    pub session: SessionId,
    pub action: Action,
    seq: u64,
}

// Timers that are due at the same time fire in the order they were armed.
impl Ord for Timer {
    fn cmp(&self, other: &Timer) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Timer) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Timer>>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> TimerQueue {
        TimerQueue::default()
    }

    pub fn arm(&mut self, due: Duration, session: SessionId, action: Action) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Timer {
            due,
            session,
            action,
            seq,
        }));
    }

    /// Removes and returns the earliest timer if it is due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<Timer> {
        match self.heap.peek() {
            Some(Reverse(timer)) if timer.due <= now => self.heap.pop().map(|Reverse(timer)| timer),
            _ => None,
        }
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.heap.peek().map(|Reverse(timer)| timer.due)
    }

    /// Drops every pending timer, returning how many there were.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.heap.len();
        self.heap.clear();
        cancelled
    }
}
