use crate::playback::PlayMode;

/// What the user asked for, after key mapping. Cloned into the pending
/// retry slot when it fails for lack of a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,

    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PageUp,
    PageDown,
    Enter,
    Back,
    Reload,
    LocatePlaying,

    PlayPause,
    Next,
    Prev,
    Stop,
    SeekForward,
    SeekBack,
    CycleMode,
    SetMode(PlayMode),
    /// Start a similar-tracks queue from the selected (or playing) track.
    Intelligent,

    Resize { width: u16, height: u16 },
}
