use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the queue index moves after a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    #[default]
    ListLoop,
    Order,
    SingleLoop,
    Random,
    Intelligent,
}

impl PlayMode {
    /// Next mode in the user-facing cycle. Intelligent is entered explicitly
    /// and cycles back to ListLoop.
    pub fn cycle(self) -> Self {
        match self {
            PlayMode::ListLoop => PlayMode::Order,
            PlayMode::Order => PlayMode::SingleLoop,
            PlayMode::SingleLoop => PlayMode::Random,
            PlayMode::Random | PlayMode::Intelligent => PlayMode::ListLoop,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlayMode::ListLoop => "list loop",
            PlayMode::Order => "order",
            PlayMode::SingleLoop => "single loop",
            PlayMode::Random => "random",
            PlayMode::Intelligent => "intelligent",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "list_loop" => Ok(PlayMode::ListLoop),
            "order" => Ok(PlayMode::Order),
            "single_loop" => Ok(PlayMode::SingleLoop),
            "random" => Ok(PlayMode::Random),
            "intelligent" => Ok(PlayMode::Intelligent),
            other => Err(format!("unknown play mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

impl Direction {
    pub fn is_forward(self) -> bool {
        self == Direction::Next
    }
}

/// Who asked for the advance. Only matters under SingleLoop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceCause {
    /// The user pressed next/prev.
    Manual,
    /// Track finished, failed, or stalled.
    Auto,
}

/// Index after one step, or `None` when the mode does not move past an end.
pub fn step<R: Rng + ?Sized>(
    mode: PlayMode,
    index: usize,
    len: usize,
    dir: Direction,
    cause: AdvanceCause,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let clamped = || match dir {
        Direction::Next => (index + 1 < len).then_some(index + 1),
        Direction::Prev => index.checked_sub(1),
    };
    match mode {
        PlayMode::ListLoop | PlayMode::Intelligent => Some(match dir {
            Direction::Next => (index + 1) % len,
            Direction::Prev => (index + len - 1) % len,
        }),
        PlayMode::Order => clamped(),
        PlayMode::SingleLoop => match cause {
            AdvanceCause::Auto => Some(index.min(len - 1)),
            AdvanceCause::Manual => clamped(),
        },
        PlayMode::Random => Some(rng.random_range(0..len)),
    }
}
