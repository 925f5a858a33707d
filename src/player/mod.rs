pub mod mpv;

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Codec {
    Mp3,
    Flac,
    Ogg,
    Opus,
    Aac,
    Wav,
    Other(String),
}

impl Codec {
    /// Map a file extension or a service-reported type ("mp3", "m4a", ...).
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim().to_ascii_lowercase().as_str() {
            "mp3" => Codec::Mp3,
            "flac" => Codec::Flac,
            "ogg" | "oga" => Codec::Ogg,
            "opus" | "webm" => Codec::Opus,
            "m4a" | "aac" | "mp4" => Codec::Aac,
            "wav" => Codec::Wav,
            other => Codec::Other(other.to_string()),
        }
    }

    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path
            .rsplit_once('.')
            .map(|(_, e)| e)
            .filter(|e| !e.contains('/'))
            .unwrap_or("");
        Self::from_extension(ext)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Codec::Mp3 => "mp3",
            Codec::Flac => "flac",
            Codec::Ogg => "ogg",
            Codec::Opus => "opus",
            Codec::Aac => "aac",
            Codec::Wav => "wav",
            Codec::Other(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

/// Local audio backend. Commands are fire-and-forget; completion and
/// progress come back asynchronously as [`crate::app::events::AudioEvent`]s
/// on the session loop.
pub trait AudioEngine: Send {
    fn play(&mut self, url: &str, codec: &Codec, expected: Option<Duration>) -> anyhow::Result<()>;
    fn pause(&mut self) -> anyhow::Result<()>;
    fn resume(&mut self) -> anyhow::Result<()>;
    fn stop(&mut self) -> anyhow::Result<()>;
    fn seek(&mut self, position: Duration) -> anyhow::Result<()>;

    fn supports(&self, codec: &Codec) -> bool {
        !matches!(codec, Codec::Other(_))
    }
}
