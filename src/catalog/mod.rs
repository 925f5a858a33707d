//! Remote catalog and stream resolver interfaces.
//!
//! The session core never talks HTTP itself; it asks a [`Catalog`] for
//! listings and a [`Resolver`] for stream URLs. Both answer synchronously
//! because navigation hooks run inside the session loop.

pub mod local;
pub mod models;

use crate::error::Result;
use crate::player::Codec;
pub use models::{Collection, CollectionKind, Entry, Shelf, Track};

/// What a listing request points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Top-level shelves.
    Root,
    DailyTracks,
    UserPlaylists,
    NewAlbums,
    RadioShows,
    Playlist(String),
    Album(String),
    Radio(String),
    /// Tracks similar to a seed, optionally scoped to the playlist it came from.
    Similar {
        track_id: String,
        context: Option<String>,
    },
    /// Every track of a local library.
    LocalTracks,
}

impl Target {
    /// Whether this listing yields playable tracks rather than collections.
    pub fn yields_tracks(&self) -> bool {
        matches!(
            self,
            Target::DailyTracks
                | Target::Playlist(_)
                | Target::Album(_)
                | Target::Radio(_)
                | Target::Similar { .. }
                | Target::LocalTracks
        )
    }

    /// Stable identifier, used to build menu keys.
    pub fn key(&self) -> String {
        match self {
            Target::Root => "root".into(),
            Target::DailyTracks => "daily".into(),
            Target::UserPlaylists => "user_playlists".into(),
            Target::NewAlbums => "new_albums".into(),
            Target::RadioShows => "radio_shows".into(),
            Target::Playlist(id) => format!("playlist:{id}"),
            Target::Album(id) => format!("album:{id}"),
            Target::Radio(id) => format!("radio:{id}"),
            Target::Similar { track_id, .. } => format!("similar:{track_id}"),
            Target::LocalTracks => "local".into(),
        }
    }

    /// The listing a collection opens into.
    pub fn of_collection(c: &Collection) -> Self {
        match c.kind {
            CollectionKind::Playlist => Target::Playlist(c.id.clone()),
            CollectionKind::Album => Target::Album(c.id.clone()),
            CollectionKind::Radio => Target::Radio(c.id.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    pub target: Target,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub entries: Vec<Entry>,
    pub has_more: bool,
}

impl CatalogPage {
    pub fn tracks(&self) -> Vec<Track> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                Entry::Track(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }
}

pub trait Catalog: Send {
    /// Fetch one page of a listing. Auth and transport failures come back
    /// as [`crate::error::SessionError`] values.
    fn fetch(&self, req: &CatalogRequest) -> Result<CatalogPage>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub url: String,
    pub codec: Codec,
}

pub trait Resolver: Send {
    fn resolve(&self, track: &Track) -> Result<Stream>;
}
