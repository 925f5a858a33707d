//! Time-synchronized lyrics
//!
//! This module provides:
//! - LRC parsing into a [`LyricTrack`]
//! - [`LyricTimer`], which turns playback time into a window of lines
//! - asynchronous loading (sidecar file, cache, LRCLIB)

pub mod loader;
pub mod lrclib;
pub mod parser;
pub mod timer;

pub use loader::{LyricLoader, TokioLyricLoader};
pub use lrclib::LrclibClient;
pub use parser::{LyricFragment, LyricTrack};
pub use timer::{LyricTimer, LyricWindow};
