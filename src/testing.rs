//! Scripted collaborators for unit tests.

use crate::app::events::LyricsEvent;
use crate::catalog::{Catalog, CatalogPage, CatalogRequest, Entry, Resolver, Stream, Target, Track};
use crate::error::{Result, SessionError};
use crate::lyrics::LyricLoader;
use crate::player::{AudioEngine, Codec};
use crate::playback::{PlayMode, PlaybackSession, QueueSnapshot, SessionSettings, SessionStore};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Track {id}"),
        artists: vec!["Artist".to_string()],
        album: None,
        duration_seconds: Some(180),
        resolved_url: None,
    }
}

/// In-memory catalog. Listings are paged by the request's offset/limit.
/// Clones share failures and the fetch counter.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCatalog {
    listings: HashMap<Target, Vec<Entry>>,
    failures: Arc<Mutex<HashMap<Target, SessionError>>>,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(mut self, target: Target, entries: Vec<Entry>) -> Self {
        self.listings.insert(target, entries);
        self
    }

    /// `n` tracks with ids `t0..t{n-1}`.
    pub fn with_tracks(self, target: Target, n: usize) -> Self {
        let entries = (0..n).map(|i| Entry::Track(track(&format!("t{i}")))).collect();
        self.with_entries(target, entries)
    }

    /// Make every fetch of `target` fail with `err` until [`Self::recover`].
    pub fn fail(&self, target: Target, err: SessionError) {
        self.failures.lock().unwrap().insert(target, err);
    }

    pub fn recover(&self, target: &Target) {
        self.failures.lock().unwrap().remove(target);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Catalog for ScriptedCatalog {
    fn fetch(&self, req: &CatalogRequest) -> Result<CatalogPage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().get(&req.target) {
            return Err(err.clone());
        }
        let all = self.listings.get(&req.target).map(Vec::as_slice).unwrap_or(&[]);
        let start = req.offset.min(all.len());
        let end = (req.offset + req.limit).min(all.len());
        Ok(CatalogPage {
            entries: all[start..end].to_vec(),
            has_more: end < all.len(),
        })
    }
}

#[derive(Debug, Default)]
struct ResolverScript {
    fail: HashSet<String>,
    unsupported: HashSet<String>,
    fail_all: bool,
    auth: bool,
    calls: Vec<String>,
}

/// Resolves `id` to `file:///id.mp3` unless told otherwise. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResolver {
    script: Arc<Mutex<ResolverScript>>,
}

impl ScriptedResolver {
    pub fn fail(&self, id: &str) {
        self.script.lock().unwrap().fail.insert(id.to_string());
    }

    pub fn unsupported(&self, id: &str) {
        self.script.lock().unwrap().unsupported.insert(id.to_string());
    }

    pub fn fail_all(&self, on: bool) {
        self.script.lock().unwrap().fail_all = on;
    }

    pub fn require_auth(&self, on: bool) {
        self.script.lock().unwrap().auth = on;
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }
}

impl Resolver for ScriptedResolver {
    fn resolve(&self, track: &Track) -> Result<Stream> {
        let mut s = self.script.lock().unwrap();
        s.calls.push(track.id.clone());
        if s.auth {
            return Err(SessionError::AuthRequired);
        }
        if s.fail_all || s.fail.contains(&track.id) {
            return Err(SessionError::network(format!("cannot resolve {}", track.id)));
        }
        if s.unsupported.contains(&track.id) {
            return Ok(Stream {
                url: format!("file:///{}.wma", track.id),
                codec: Codec::Other("wma".into()),
            });
        }
        Ok(Stream {
            url: format!("file:///{}.mp3", track.id),
            codec: Codec::Mp3,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Play(String),
    Pause,
    Resume,
    Stop,
    Seek(Duration),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl RecordingEngine {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn played(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Play(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Seek(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: EngineCall) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl AudioEngine for RecordingEngine {
    fn play(&mut self, url: &str, _codec: &Codec, _expected: Option<Duration>) -> anyhow::Result<()> {
        self.record(EngineCall::Play(url.to_string()))
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        self.record(EngineCall::Pause)
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        self.record(EngineCall::Resume)
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.record(EngineCall::Stop)
    }

    fn seek(&mut self, position: Duration) -> anyhow::Result<()> {
        self.record(EngineCall::Seek(position))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingLoader {
    requests: Arc<Mutex<Vec<(String, u64)>>>,
}

impl RecordingLoader {
    pub fn requests(&self) -> Vec<(String, u64)> {
        self.requests.lock().unwrap().clone()
    }

    /// The event a loader would post for the latest request.
    pub fn reply(&self, payload: Option<&str>) -> Option<LyricsEvent> {
        let (track_id, generation) = self.requests().last()?.clone();
        Some(LyricsEvent {
            generation,
            track_id,
            payload: payload.map(str::to_string),
        })
    }
}

impl LyricLoader for RecordingLoader {
    fn load(&self, track: &Track, generation: u64) {
        self.requests.lock().unwrap().push((track.id.clone(), generation));
    }
}

#[derive(Debug, Default)]
struct Saved {
    snapshot: Option<QueueSnapshot>,
    mode: Option<PlayMode>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Saved>>,
}

impl MemoryStore {
    pub fn seed(&self, snapshot: Option<QueueSnapshot>, mode: Option<PlayMode>) {
        let mut s = self.saved.lock().unwrap();
        s.snapshot = snapshot;
        s.mode = mode;
    }

    pub fn snapshot(&self) -> Option<QueueSnapshot> {
        self.saved.lock().unwrap().snapshot.clone()
    }

    pub fn play_mode(&self) -> Option<PlayMode> {
        self.saved.lock().unwrap().mode
    }
}

impl SessionStore for MemoryStore {
    fn save_queue_snapshot(&self, snapshot: &QueueSnapshot) -> anyhow::Result<()> {
        self.saved.lock().unwrap().snapshot = Some(snapshot.clone());
        Ok(())
    }

    fn load_queue_snapshot(&self) -> anyhow::Result<Option<QueueSnapshot>> {
        Ok(self.snapshot())
    }

    fn save_play_mode(&self, mode: PlayMode) -> anyhow::Result<()> {
        self.saved.lock().unwrap().mode = Some(mode);
        Ok(())
    }

    fn load_play_mode(&self) -> anyhow::Result<Option<PlayMode>> {
        Ok(self.play_mode())
    }
}

/// Handles onto the fakes inside a [`PlaybackSession`] built by [`session`].
pub struct SessionFakes {
    pub engine: RecordingEngine,
    pub resolver: ScriptedResolver,
    pub loader: RecordingLoader,
    pub store: MemoryStore,
}

pub fn session() -> (PlaybackSession, SessionFakes) {
    let fakes = SessionFakes {
        engine: RecordingEngine::default(),
        resolver: ScriptedResolver::default(),
        loader: RecordingLoader::default(),
        store: MemoryStore::default(),
    };
    let s = PlaybackSession::new(
        Box::new(fakes.engine.clone()),
        Box::new(fakes.resolver.clone()),
        Box::new(fakes.loader.clone()),
        Box::new(fakes.store.clone()),
        SessionSettings::default(),
    );
    (s, fakes)
}
