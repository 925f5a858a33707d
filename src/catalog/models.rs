use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration_seconds: Option<u32>,
    /// Stream URL from the last successful resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
}

impl Track {
    pub fn duration(&self) -> Option<Duration> {
        self.duration_seconds.map(|s| Duration::from_secs(u64::from(s)))
    }

    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Playlist,
    Album,
    Radio,
}

/// A playlist, album or radio show: something that opens into a track list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub kind: CollectionKind,
    pub id: String,
    pub name: String,
    pub owner: Option<String>,
}

/// A named entry point into another listing (e.g. "My playlists").
#[derive(Debug, Clone, PartialEq)]
pub struct Shelf {
    pub title: String,
    pub subtitle: String,
    pub target: super::Target,
}

/// One element of a catalog listing.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Track(Track),
    Collection(Collection),
    Shelf(Shelf),
}
