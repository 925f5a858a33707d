use std::time::{Duration, Instant};

/// Everything the session loop reacts to. Producers (input, mpv, lyric
/// loaders) only send these; none of them touch session state.
#[derive(Debug, Clone)]
pub enum Event {
    Input { event: InputEvent, at: Instant },
    Audio(AudioEvent),
    Lyrics(LyricsEvent),
    /// The user finished logging in; replay the operation that asked for it.
    LoginCompleted,
}

impl Event {
    pub fn input(event: InputEvent) -> Self {
        Event::Input {
            event,
            at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Key(crossterm::event::KeyEvent),
    Mouse(crossterm::event::MouseEvent),
    Resize { width: u16, height: u16 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    Tick { elapsed: Duration },
    /// The current track played to its end.
    Done,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsEvent {
    pub generation: u64,
    pub track_id: String,
    /// Raw LRC text, `None` when nothing was found.
    pub payload: Option<String>,
}
