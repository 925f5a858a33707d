//! Drives a [`LyricTrack`] against playback time.

use super::parser::LyricTrack;
use std::time::Duration;

/// Lines shown around the active fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricWindow {
    pub active: Option<usize>,
    /// `rows` lines, the active one in the middle; "" outside the track.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LyricTimer {
    track: LyricTrack,
    running: bool,
    rows: usize,
    last: Option<LyricWindow>,
}

impl LyricTimer {
    pub fn new(rows: usize) -> Self {
        Self {
            track: LyricTrack::placeholder(),
            running: false,
            rows,
            last: None,
        }
    }

    /// Replace the track and start ticking. Any running track is stopped first.
    pub fn start(&mut self, track: LyricTrack) {
        self.stop();
        self.track = track;
        self.running = true;
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        self.running = false;
        self.last = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn track(&self) -> &LyricTrack {
        &self.track
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// 0 hides lyrics; otherwise 3 or 5.
    pub fn set_rows(&mut self, rows: usize) {
        self.rows = rows;
        self.last = None;
    }

    pub fn window(&self) -> Option<&LyricWindow> {
        self.last.as_ref()
    }

    /// Window for `elapsed`, or `None` when stopped or hidden.
    pub fn on_tick(&mut self, elapsed: Duration) -> Option<&LyricWindow> {
        if !self.running || self.rows == 0 {
            return None;
        }
        let active = self.track.active_index(elapsed);
        let center = active.map_or(-1, |i| i as isize);
        let half = (self.rows / 2) as isize;
        let lines = (0..self.rows as isize)
            .map(|i| {
                self.track
                    .fragment_at(center - half + i)
                    .map(|f| f.text.clone())
                    .unwrap_or_default()
            })
            .collect();
        self.last = Some(LyricWindow { active, lines });
        self.last.as_ref()
    }
}
