//! Catalog and resolver over local audio files (and plain stream URLs).

use super::{Catalog, CatalogPage, CatalogRequest, Entry, Resolver, Shelf, Stream, Target, Track};
use crate::error::{Result, SessionError};
use crate::player::Codec;
use anyhow::Context;
use std::path::{Path, PathBuf};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "oga", "opus", "m4a", "aac", "wav", "webm"];

#[derive(Debug, Clone, Default)]
pub struct LocalLibrary {
    tracks: Vec<Track>,
}

impl LocalLibrary {
    /// Collect tracks from files, directories (one level, sorted) and URLs.
    pub fn scan(sources: &[PathBuf]) -> anyhow::Result<Self> {
        let mut tracks = Vec::new();
        for src in sources {
            let raw = src.to_string_lossy();
            if raw.contains("://") {
                tracks.push(track_for(&raw, None));
                continue;
            }
            if src.is_dir() {
                let mut files: Vec<PathBuf> = std::fs::read_dir(src)
                    .with_context(|| format!("read dir {}", src.display()))?
                    .filter_map(|e| e.ok().map(|e| e.path()))
                    .filter(|p| is_audio(p))
                    .collect();
                files.sort();
                tracks.extend(files.iter().map(|p| track_for(&p.to_string_lossy(), Some(p.as_path()))));
            } else {
                tracks.push(track_for(&raw, Some(src.as_path())));
            }
        }
        Ok(Self { tracks })
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn track_for(id: &str, path: Option<&Path>) -> Track {
    let title = path
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.rsplit('/').next().unwrap_or(id).to_string());
    let (artists, title) = match title.split_once(" - ") {
        Some((artist, title)) => (vec![artist.trim().to_string()], title.trim().to_string()),
        None => (Vec::new(), title),
    };
    Track {
        id: id.to_string(),
        title,
        artists,
        album: None,
        duration_seconds: None,
        resolved_url: None,
    }
}

impl Catalog for LocalLibrary {
    fn fetch(&self, req: &CatalogRequest) -> Result<CatalogPage> {
        match &req.target {
            Target::Root => Ok(CatalogPage {
                entries: vec![Entry::Shelf(Shelf {
                    title: "All tracks".into(),
                    subtitle: format!("{} files", self.tracks.len()),
                    target: Target::LocalTracks,
                })],
                has_more: false,
            }),
            Target::LocalTracks => {
                let start = req.offset.min(self.tracks.len());
                let end = (req.offset + req.limit).min(self.tracks.len());
                Ok(CatalogPage {
                    entries: self.tracks[start..end].iter().cloned().map(Entry::Track).collect(),
                    has_more: end < self.tracks.len(),
                })
            }
            // nothing to recommend from
            _ => Ok(CatalogPage::default()),
        }
    }
}

impl Resolver for LocalLibrary {
    fn resolve(&self, track: &Track) -> Result<Stream> {
        if !track.id.contains("://") && !Path::new(&track.id).exists() {
            return Err(SessionError::network(format!("missing file {}", track.id)));
        }
        Ok(Stream {
            url: track.id.clone(),
            codec: Codec::from_url(&track.id),
        })
    }
}
