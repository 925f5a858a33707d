//! Asynchronous lyric lookup. Results come back to the session loop as
//! [`Event::Lyrics`] tagged with the generation they were requested for.

use super::lrclib::LrclibClient;
use crate::app::events::{Event, LyricsEvent};
use crate::catalog::Track;
use crate::storage::StorageHandle;
use std::path::PathBuf;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub trait LyricLoader: Send {
    /// Start fetching lyrics for `track`. Must not block.
    fn load(&self, track: &Track, generation: u64);
}

/// Looks in a sidecar `.lrc` file, then the lyric cache, then LRCLIB.
pub struct TokioLyricLoader {
    runtime: Handle,
    tx: mpsc::Sender<Event>,
    storage: StorageHandle,
    lrclib: Option<LrclibClient>,
}

impl TokioLyricLoader {
    pub fn new(
        runtime: Handle,
        tx: mpsc::Sender<Event>,
        storage: StorageHandle,
        lrclib: Option<LrclibClient>,
    ) -> Self {
        Self {
            runtime,
            tx,
            storage,
            lrclib,
        }
    }
}

impl LyricLoader for TokioLyricLoader {
    fn load(&self, track: &Track, generation: u64) {
        let tx = self.tx.clone();
        let storage = self.storage.clone();
        let lrclib = self.lrclib.clone();
        let track = track.clone();

        self.runtime.spawn(async move {
            let payload = lookup(&track, storage, lrclib).await;
            let _ = tx
                .send(Event::Lyrics(LyricsEvent {
                    generation,
                    track_id: track.id,
                    payload,
                }))
                .await;
        });
    }
}

async fn lookup(track: &Track, storage: StorageHandle, lrclib: Option<LrclibClient>) -> Option<String> {
    if let Some(path) = sidecar_path(track)
        && let Ok(text) = tokio::fs::read_to_string(&path).await
    {
        tracing::debug!(path = %path.display(), "lyrics from sidecar");
        return Some(text);
    }

    let cached = tokio::task::spawn_blocking({
        let storage = storage.clone();
        let id = track.id.clone();
        move || storage.get_lyrics(&id)
    })
    .await;
    if let Ok(Ok(Some(text))) = cached {
        return Some(text);
    }

    let client = lrclib?;
    let artist = track.artists.first().cloned().unwrap_or_default();
    match client
        .synced_lyrics(&track.title, &artist, track.album.as_deref(), track.duration_seconds)
        .await
    {
        Ok(Some(text)) => {
            let _ = tokio::task::spawn_blocking({
                let id = track.id.clone();
                let text = text.clone();
                move || storage.cache_lyrics(&id, &text)
            })
            .await;
            Some(text)
        }
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(track = %track.id, error = %format!("{e:#}"), "lrclib lookup failed");
            None
        }
    }
}

/// `song.mp3` -> `song.lrc`, for tracks that live on disk.
fn sidecar_path(track: &Track) -> Option<PathBuf> {
    let source = track.resolved_url.as_deref().unwrap_or(&track.id);
    if source.contains("://") {
        return None;
    }
    Some(PathBuf::from(source).with_extension("lrc"))
}
