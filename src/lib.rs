//! Session core of a terminal music client: paged menu navigation over a
//! catalog, a play queue with play modes and failure-bounded auto-advance,
//! and time-synced lyrics.

pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod input;
pub mod lyrics;
pub mod menu;
pub mod playback;
pub mod player;
pub mod storage;
pub mod tui;

#[cfg(test)]
mod testing;
