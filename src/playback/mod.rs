//! Play queue, play mode and the playback state machine.
//!
//! [`PlaybackSession`] is owned by the session loop. It talks to the audio
//! engine and resolver synchronously and hears back from them only through
//! events the loop feeds in (`on_done`, `on_tick`, `apply_lyrics`).

pub mod mode;
pub mod queue;

use crate::app::events::LyricsEvent;
use crate::catalog::{CatalogRequest, Resolver, Target, Track};
use crate::error::{Result, SessionError};
use crate::lyrics::{LyricLoader, LyricTimer, LyricTrack};
use crate::menu::{FETCH_LIMIT, HookEnv, Navigator};
use crate::player::AudioEngine;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use mode::{AdvanceCause, Direction, PlayMode};
pub use queue::{PlayQueue, QueueSnapshot, same_queue};

/// Origin key of queues built by [`PlaybackSession::start_intelligent`].
pub const INTELLIGENT_KEY: &str = "intelligent";

/// Load/save hooks for what survives a restart.
pub trait SessionStore: Send {
    fn save_queue_snapshot(&self, snapshot: &QueueSnapshot) -> anyhow::Result<()>;
    fn load_queue_snapshot(&self) -> anyhow::Result<Option<QueueSnapshot>>;
    fn save_play_mode(&self, mode: PlayMode) -> anyhow::Result<()>;
    fn load_play_mode(&self) -> anyhow::Result<Option<PlayMode>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Resolving,
    Playing,
    Paused,
    Stopped,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Consecutive failures that end an auto-advance chain.
    pub max_failures: u32,
    /// How far past its expected end a track may run before it is skipped.
    pub stuck_tolerance: Duration,
    pub lyric_offset_ms: i64,
    pub lyric_rows: usize,
    pub lyrics_enabled: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_failures: 3,
            stuck_tolerance: Duration::from_secs(10),
            lyric_offset_ms: 0,
            lyric_rows: 3,
            lyrics_enabled: true,
        }
    }
}

pub struct PlaybackSession {
    queue: PlayQueue,
    mode: PlayMode,
    state: PlaybackState,
    failures: u32,
    elapsed: Duration,
    settings: SessionSettings,
    engine: Box<dyn AudioEngine>,
    resolver: Box<dyn Resolver>,
    loader: Box<dyn LyricLoader>,
    store: Box<dyn SessionStore>,
    timer: LyricTimer,
    /// Bumped on every track switch; lyric results for older values are dropped.
    lyric_generation: u64,
    rng: StdRng,
}

impl PlaybackSession {
    pub fn new(
        engine: Box<dyn AudioEngine>,
        resolver: Box<dyn Resolver>,
        loader: Box<dyn LyricLoader>,
        store: Box<dyn SessionStore>,
        settings: SessionSettings,
    ) -> Self {
        let timer = LyricTimer::new(settings.lyric_rows);
        Self {
            queue: PlayQueue::default(),
            mode: PlayMode::default(),
            state: PlaybackState::Idle,
            failures: 0,
            elapsed: Duration::ZERO,
            settings,
            engine,
            resolver,
            loader,
            store,
            timer,
            lyric_generation: 0,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current_track()
    }

    pub fn lyrics(&self) -> &LyricTimer {
        &self.timer
    }

    pub fn lyric_generation(&self) -> u64 {
        self.lyric_generation
    }

    pub fn set_lyric_rows(&mut self, rows: usize) {
        let rows = if self.settings.lyrics_enabled { rows } else { 0 };
        self.timer.set_rows(rows);
    }

    /// Load the saved play mode and queue. The queue comes back Stopped.
    pub fn load_saved(&mut self) {
        match self.store.load_play_mode() {
            Ok(Some(mode)) => self.mode = mode,
            Ok(None) => {}
            Err(e) => warn!(error = %format!("{e:#}"), "could not load play mode"),
        }
        match self.store.load_queue_snapshot() {
            Ok(Some(snapshot)) => self.restore(snapshot),
            Ok(None) => {}
            Err(e) => warn!(error = %format!("{e:#}"), "could not load queue snapshot"),
        }
    }

    pub fn restore(&mut self, snapshot: QueueSnapshot) {
        self.queue = PlayQueue::from_snapshot(snapshot);
        self.state = if self.queue.current_index().is_some() {
            PlaybackState::Stopped
        } else {
            PlaybackState::Idle
        };
        info!(len = self.queue.len(), "queue restored");
    }

    pub fn save_snapshot(&self) {
        if let Err(e) = self.store.save_queue_snapshot(&self.queue.snapshot()) {
            warn!(error = %format!("{e:#}"), "could not save queue snapshot");
        }
    }

    /// Replace the queue unless `tracks` is the same queue, in which case
    /// only the position and origin move. Returns whether it was replaced.
    pub fn enqueue(
        &mut self,
        tracks: Vec<Track>,
        origin_key: &str,
        start: usize,
        origin_menu: Option<crate::menu::Menu>,
    ) -> bool {
        if !tracks.is_empty() && self.queue.same_tracks(&tracks) {
            self.queue.set_current(start);
            self.queue.set_origin_key(origin_key);
            if let Some(menu) = origin_menu {
                self.queue.set_origin_menu(menu);
            }
            return false;
        }
        info!(origin = origin_key, len = tracks.len(), start, "queue replaced");
        self.queue = PlayQueue::new(tracks, origin_key, start, origin_menu);
        true
    }

    /// Resolve and play the track at the current index.
    pub fn play_current(&mut self, nav: &mut Navigator, env: &HookEnv<'_>) -> Result<()> {
        if self.queue.current_index().is_none() {
            return Ok(());
        }
        self.run_chain(Direction::Next, None, nav, env)
    }

    pub fn advance(
        &mut self,
        dir: Direction,
        cause: AdvanceCause,
        nav: &mut Navigator,
        env: &HookEnv<'_>,
    ) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        self.run_chain(dir, Some(cause), nav, env)
    }

    /// The engine finished the current track: exactly one advance.
    pub fn on_done(&mut self, nav: &mut Navigator, env: &HookEnv<'_>) -> Result<()> {
        if self.state != PlaybackState::Playing {
            debug!(state = ?self.state, "ignoring done outside playback");
            return Ok(());
        }
        self.state = PlaybackState::Stopped;
        self.timer.stop();
        self.advance(Direction::Next, AdvanceCause::Auto, nav, env)
    }

    /// The engine could not play the loaded stream.
    pub fn on_engine_error(
        &mut self,
        message: &str,
        nav: &mut Navigator,
        env: &HookEnv<'_>,
    ) -> Result<()> {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            return Ok(());
        }
        self.timer.stop();
        self.count_failure(&SessionError::network(message))?;
        self.run_chain(Direction::Next, Some(AdvanceCause::Auto), nav, env)
    }

    pub fn on_tick(
        &mut self,
        elapsed: Duration,
        nav: &mut Navigator,
        env: &HookEnv<'_>,
    ) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Ok(());
        }
        self.elapsed = elapsed;

        let expected = self.queue.current_track().and_then(Track::duration);
        if let Some(expected) = expected
            && elapsed > expected + self.settings.stuck_tolerance
        {
            warn!(?elapsed, ?expected, "stream ran past its end, skipping");
            self.state = PlaybackState::Stopped;
            self.timer.stop();
            return self.advance(Direction::Next, AdvanceCause::Auto, nav, env);
        }

        let offset = self.settings.lyric_offset_ms;
        let at = if offset >= 0 {
            elapsed + Duration::from_millis(offset.unsigned_abs())
        } else {
            elapsed.saturating_sub(Duration::from_millis(offset.unsigned_abs()))
        };
        self.timer.on_tick(at);
        Ok(())
    }

    pub fn toggle_pause(&mut self, nav: &mut Navigator, env: &HookEnv<'_>) -> Result<()> {
        match self.state {
            PlaybackState::Playing => {
                self.engine.pause()?;
                self.state = PlaybackState::Paused;
            }
            PlaybackState::Paused => {
                self.engine.resume()?;
                self.state = PlaybackState::Playing;
            }
            PlaybackState::Idle | PlaybackState::Stopped | PlaybackState::Failed => {
                self.play_current(nav, env)?;
            }
            PlaybackState::Resolving => {}
        }
        Ok(())
    }

    /// Space on a menu: play the selected track of a playable menu, or
    /// pause/resume when it is already the current track.
    pub fn play_selection(&mut self, nav: &mut Navigator, env: &HookEnv<'_>) -> Result<()> {
        let menu = nav.menu();
        if !menu.is_playable() || nav.selected_track().is_none() {
            return self.toggle_pause(nav, env);
        }

        let index = nav.cursor();
        let key = menu.key();
        let tracks = menu.tracks();
        let showing_queue = key == self.queue.origin_key() && self.queue.same_tracks(&tracks);
        let active = matches!(self.state, PlaybackState::Playing | PlaybackState::Paused);
        if showing_queue && active && self.queue.current_index() == Some(index) {
            return self.toggle_pause(nav, env);
        }

        if !menu.reset_queue_on_play() && key == self.queue.origin_key() {
            self.queue.set_current(index);
        } else {
            let origin = menu.clone();
            self.enqueue(tracks, &key, index, Some(origin));
        }
        self.play_current(nav, env)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.engine.stop()?;
        self.timer.stop();
        self.state = PlaybackState::Stopped;
        Ok(())
    }

    /// Seek by `delta_secs` from the current position, clamped to the track.
    pub fn seek_relative(&mut self, delta_secs: i64) -> Result<()> {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            return Ok(());
        }
        let delta = Duration::from_secs(delta_secs.unsigned_abs());
        let mut target = if delta_secs >= 0 {
            self.elapsed + delta
        } else {
            self.elapsed.saturating_sub(delta)
        };
        if let Some(total) = self.queue.current_track().and_then(Track::duration) {
            target = target.min(total);
        }
        self.engine.seek(target)?;
        self.elapsed = target;
        Ok(())
    }

    /// `None` cycles to the next mode. The result is saved.
    pub fn set_mode(&mut self, mode: Option<PlayMode>) -> PlayMode {
        self.mode = mode.unwrap_or_else(|| self.mode.cycle());
        if let Err(e) = self.store.save_play_mode(self.mode) {
            warn!(error = %format!("{e:#}"), "could not save play mode");
        }
        info!(mode = %self.mode, "play mode");
        self.mode
    }

    /// Page the navigator to the playing track when it shows the playing menu.
    pub fn locate_cursor_to_playback(
        &self,
        nav: &mut Navigator,
        env: &HookEnv<'_>,
    ) -> Result<bool> {
        let Some(index) = self.queue.current_index() else {
            return Ok(false);
        };
        if nav.menu().key() != self.queue.origin_key()
            || !self.queue.same_tracks(&nav.menu().tracks())
        {
            return Ok(false);
        }
        nav.locate(index, env)
    }

    /// Queue `seed` followed by tracks similar to it and play in Intelligent mode.
    pub fn start_intelligent(
        &mut self,
        seed: Track,
        context: Option<String>,
        nav: &mut Navigator,
        env: &HookEnv<'_>,
    ) -> Result<()> {
        let page = env.catalog.fetch(&CatalogRequest {
            target: Target::Similar {
                track_id: seed.id.clone(),
                context,
            },
            offset: 0,
            limit: FETCH_LIMIT,
        })?;
        let mut tracks = vec![seed.clone()];
        tracks.extend(page.tracks().into_iter().filter(|t| t.id != seed.id));
        info!(seed = %seed.id, len = tracks.len(), "intelligent queue");

        self.queue = PlayQueue::new(tracks, INTELLIGENT_KEY, 0, None);
        self.set_mode(Some(PlayMode::Intelligent));
        self.play_current(nav, env)
    }

    /// Apply a lyric lookup result unless the track has moved on since.
    pub fn apply_lyrics(&mut self, ev: LyricsEvent) -> bool {
        let current = self.queue.current_track().map(|t| t.id.as_str());
        if ev.generation != self.lyric_generation || current != Some(ev.track_id.as_str()) {
            debug!(
                generation = ev.generation,
                current = self.lyric_generation,
                "stale lyrics dropped"
            );
            return false;
        }
        self.timer.stop();
        self.timer
            .start(LyricTrack::parse_or_placeholder(ev.payload.as_deref()));
        true
    }

    fn run_chain(
        &mut self,
        dir: Direction,
        mut step: Option<AdvanceCause>,
        nav: &mut Navigator,
        env: &HookEnv<'_>,
    ) -> Result<()> {
        loop {
            if let Some(cause) = step {
                let Some(current) = self.queue.current_index() else {
                    return Ok(());
                };
                self.grow_at_edge(current, dir, nav, env);
                let next = mode::step(self.mode, current, self.queue.len(), dir, cause, &mut self.rng);
                let Some(next) = next else {
                    if cause == AdvanceCause::Auto {
                        debug!("end of queue");
                        self.timer.stop();
                        self.state = PlaybackState::Idle;
                    }
                    return Ok(());
                };
                self.queue.set_current(next);
                self.follow_in_menu(next, nav, env);
            }

            match self.start_current() {
                Ok(()) => return Ok(()),
                Err(e) if e.counts_as_play_failure() => {
                    self.count_failure(&e)?;
                    step = Some(AdvanceCause::Auto);
                }
                Err(e) => {
                    self.state = PlaybackState::Stopped;
                    return Err(e);
                }
            }
        }
    }

    fn count_failure(&mut self, err: &SessionError) -> Result<()> {
        self.failures += 1;
        let track = self.queue.current_track().map(|t| t.id.clone()).unwrap_or_default();
        warn!(%track, error = %err, failures = self.failures, "playback failed");
        if self.failures >= self.settings.max_failures {
            self.state = PlaybackState::Failed;
            self.timer.stop();
            return Err(SessionError::ExhaustedRetries {
                attempts: self.failures,
            });
        }
        Ok(())
    }

    fn start_current(&mut self) -> Result<()> {
        let Some(track) = self.queue.current_track().cloned() else {
            self.state = PlaybackState::Idle;
            return Ok(());
        };
        self.state = PlaybackState::Resolving;

        let stream = self.resolver.resolve(&track)?;
        if !self.engine.supports(&stream.codec) {
            return Err(SessionError::UnsupportedMedia {
                codec: stream.codec.to_string(),
            });
        }
        self.engine.play(&stream.url, &stream.codec, track.duration())?;

        if let Some(t) = self.queue.current_track_mut() {
            t.resolved_url = Some(stream.url.clone());
        }
        self.failures = 0;
        self.state = PlaybackState::Playing;
        self.elapsed = Duration::ZERO;
        info!(track = %track.id, title = %track.title, "playing");

        let mut track = track;
        track.resolved_url = Some(stream.url);
        self.switch_lyrics(&track);
        self.save_snapshot();
        Ok(())
    }

    fn switch_lyrics(&mut self, track: &Track) {
        self.timer.stop();
        self.lyric_generation += 1;
        self.timer.start(LyricTrack::placeholder());
        if self.settings.lyrics_enabled {
            self.loader.load(track, self.lyric_generation);
        }
    }

    /// The navigator shows the menu the queue was built from, with the same tracks.
    fn showing_queue(&self, nav: &Navigator) -> bool {
        nav.menu().key() == self.queue.origin_key()
            && self.queue.same_tracks(&nav.menu().tracks())
    }

    /// Grow the queue before stepping past its last track: similar tracks in
    /// Intelligent mode, otherwise the next page of the menu it came from.
    /// Failures here only mean the queue stays as it is.
    fn grow_at_edge(&mut self, current: usize, dir: Direction, nav: &mut Navigator, env: &HookEnv<'_>) {
        if dir != Direction::Next || current + 1 < self.queue.len() {
            return;
        }

        if self.mode == PlayMode::Intelligent {
            if let Err(e) = self.extend_similar(env) {
                warn!(error = %e, "could not extend intelligent queue");
            }
            return;
        }

        let grown = if self.showing_queue(nav) {
            // the cursor walks into the bottom-out hook like a keypress would
            let moved = nav.locate(current, env).and_then(|located| {
                if located {
                    nav.follow_playback(true, env)
                } else {
                    Ok(false)
                }
            });
            moved.map(|_| nav.menu().tracks())
        } else {
            match self.queue.origin_menu_mut() {
                Some(menu) => menu.run_boundary_hook(true, env.catalog).map(|_| menu.tracks()),
                None => return,
            }
        };
        match grown {
            Ok(tracks) => {
                let added = self.queue.absorb(&tracks);
                if added > 0 {
                    debug!(added, "queue extended from its menu");
                }
            }
            Err(e) => warn!(error = %e, "could not extend queue"),
        }
    }

    fn extend_similar(&mut self, env: &HookEnv<'_>) -> Result<()> {
        let Some(seed) = self.queue.current_track().cloned() else {
            return Ok(());
        };
        let page = env.catalog.fetch(&CatalogRequest {
            target: Target::Similar {
                track_id: seed.id,
                context: None,
            },
            offset: 0,
            limit: FETCH_LIMIT,
        })?;
        let fresh: Vec<Track> = page
            .tracks()
            .into_iter()
            .filter(|t| !self.queue.contains(&t.id))
            .collect();
        debug!(added = fresh.len(), "intelligent queue extended");
        self.queue.extend(fresh);
        Ok(())
    }

    /// Keep the on-screen selection on the playing track.
    fn follow_in_menu(&mut self, index: usize, nav: &mut Navigator, env: &HookEnv<'_>) {
        if !self.showing_queue(nav) || index >= nav.items().len() {
            return;
        }
        if let Err(e) = nav.locate(index, env) {
            warn!(error = %e, "could not move cursor to playing track");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Entry;
    use crate::menu::{Columns, Menu, RerenderSignal};
    use crate::testing::{ScriptedCatalog, SessionFakes, session, track};

    fn tracks(ids: &[&str]) -> Vec<Track> {
        ids.iter().map(|id| track(id)).collect()
    }

    fn idle_nav() -> Navigator {
        Navigator::new(Menu::root(), "Home", Columns::Single, 10)
    }

    fn playing(ids: &[&str], mode: PlayMode) -> (PlaybackSession, SessionFakes, Navigator) {
        let (mut s, fakes) = session();
        s.set_mode(Some(mode));
        s.enqueue(tracks(ids), "tracks:playlist:pl1", 0, None);
        (s, fakes, idle_nav())
    }

    #[test]
    fn test_advance_order_stops_at_end() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, fakes, mut nav) = playing(&["A", "B", "C"], PlayMode::Order);
        s.play_current(&mut nav, &env).unwrap();

        s.advance(Direction::Next, AdvanceCause::Manual, &mut nav, &env).unwrap();
        s.advance(Direction::Next, AdvanceCause::Manual, &mut nav, &env).unwrap();
        assert_eq!(s.queue().current_index(), Some(2));
        assert_eq!(s.current_track().unwrap().id, "C");

        s.advance(Direction::Next, AdvanceCause::Manual, &mut nav, &env).unwrap();
        assert_eq!(s.queue().current_index(), Some(2));
        assert_eq!(s.state(), PlaybackState::Playing);
        assert_eq!(fakes.engine.played().len(), 3);

        // the track ending at the last index leaves the session idle
        s.on_done(&mut nav, &env).unwrap();
        assert_eq!(s.state(), PlaybackState::Idle);
        assert_eq!(s.queue().current_index(), Some(2));
    }

    #[test]
    fn test_advance_list_loop_wraps() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, _fakes, mut nav) = playing(&["A", "B", "C"], PlayMode::ListLoop);
        s.play_current(&mut nav, &env).unwrap();
        for _ in 0..3 {
            s.advance(Direction::Next, AdvanceCause::Manual, &mut nav, &env).unwrap();
        }
        assert_eq!(s.queue().current_index(), Some(0));
        s.advance(Direction::Prev, AdvanceCause::Manual, &mut nav, &env).unwrap();
        assert_eq!(s.queue().current_index(), Some(2));
    }

    #[test]
    fn test_advance_random_in_range() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (s, _fakes, mut nav) = playing(&["A", "B", "C", "D"], PlayMode::Random);
        let mut s = s.with_rng(StdRng::seed_from_u64(7));
        s.play_current(&mut nav, &env).unwrap();
        for _ in 0..40 {
            s.advance(Direction::Next, AdvanceCause::Auto, &mut nav, &env).unwrap();
            assert!(s.queue().current_index().unwrap() < 4);
        }
    }

    #[test]
    fn test_single_loop_replays_on_done() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, fakes, mut nav) = playing(&["A", "B"], PlayMode::SingleLoop);
        s.play_current(&mut nav, &env).unwrap();
        s.on_done(&mut nav, &env).unwrap();
        assert_eq!(s.queue().current_index(), Some(0));
        assert_eq!(fakes.resolver.calls(), vec!["A", "A"]);

        s.advance(Direction::Next, AdvanceCause::Manual, &mut nav, &env).unwrap();
        assert_eq!(s.queue().current_index(), Some(1));
    }

    #[test]
    fn test_failures_exhaust_after_three() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, fakes, mut nav) = playing(&["A", "B", "C", "D", "E"], PlayMode::ListLoop);
        fakes.resolver.fail_all(true);

        let err = s.play_current(&mut nav, &env).unwrap_err();
        assert_eq!(err, SessionError::ExhaustedRetries { attempts: 3 });
        assert_eq!(s.state(), PlaybackState::Failed);
        // one auto-advance per failure below the threshold
        assert_eq!(fakes.resolver.calls(), vec!["A", "B", "C"]);
        assert!(fakes.engine.played().is_empty());
    }

    #[test]
    fn test_success_resets_failures() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, fakes, mut nav) = playing(&["A", "B", "C", "D"], PlayMode::Order);
        fakes.resolver.fail("A");
        fakes.resolver.unsupported("B");

        s.play_current(&mut nav, &env).unwrap();
        assert_eq!(s.current_track().unwrap().id, "C");
        assert_eq!(s.failures(), 0);
        assert_eq!(s.state(), PlaybackState::Playing);

        fakes.resolver.fail("D");
        s.on_done(&mut nav, &env).unwrap();
        assert_eq!(s.failures(), 1);
        // Order at the end: nothing left to retry
        assert_eq!(s.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_auth_required_keeps_counter() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, fakes, mut nav) = playing(&["A", "B"], PlayMode::ListLoop);
        fakes.resolver.require_auth(true);

        assert_eq!(s.play_current(&mut nav, &env), Err(SessionError::AuthRequired));
        assert_eq!(s.failures(), 0);
        assert_eq!(s.state(), PlaybackState::Stopped);
        assert_eq!(s.queue().current_index(), Some(0));

        fakes.resolver.require_auth(false);
        s.play_current(&mut nav, &env).unwrap();
        assert_eq!(s.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_engine_error_counts_and_advances() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, _fakes, mut nav) = playing(&["A", "B"], PlayMode::ListLoop);
        s.play_current(&mut nav, &env).unwrap();
        s.on_engine_error("decoder died", &mut nav, &env).unwrap();
        assert_eq!(s.current_track().unwrap().id, "B");
        assert_eq!(s.failures(), 0);
    }

    #[test]
    fn test_done_only_advances_while_playing() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, fakes, mut nav) = playing(&["A", "B", "C"], PlayMode::ListLoop);
        s.play_current(&mut nav, &env).unwrap();
        s.toggle_pause(&mut nav, &env).unwrap();
        assert_eq!(s.state(), PlaybackState::Paused);

        s.on_done(&mut nav, &env).unwrap();
        assert_eq!(s.queue().current_index(), Some(0));

        s.toggle_pause(&mut nav, &env).unwrap();
        s.on_done(&mut nav, &env).unwrap();
        assert_eq!(s.queue().current_index(), Some(1));
        assert_eq!(fakes.engine.played().len(), 2);
    }

    #[test]
    fn test_stale_lyrics_discarded() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, fakes, mut nav) = playing(&["A", "B"], PlayMode::ListLoop);
        s.play_current(&mut nav, &env).unwrap();
        let first = s.lyric_generation();
        s.advance(Direction::Next, AdvanceCause::Manual, &mut nav, &env).unwrap();
        assert_eq!(fakes.loader.requests(), vec![("A".to_string(), first), ("B".to_string(), first + 1)]);

        let late = LyricsEvent {
            generation: first,
            track_id: "A".into(),
            payload: Some("[00:00.00]old song".into()),
        };
        assert!(!s.apply_lyrics(late));
        assert_eq!(s.lyrics().track(), &LyricTrack::placeholder());

        let fresh = LyricsEvent {
            generation: s.lyric_generation(),
            track_id: "B".into(),
            payload: Some("[00:00.00]new song".into()),
        };
        assert!(s.apply_lyrics(fresh));
        assert_eq!(s.lyrics().track().fragments()[0].text, "new song");
    }

    #[test]
    fn test_tick_drives_lyrics_with_offset() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, _fakes, mut nav) = playing(&["A"], PlayMode::Order);
        s.settings.lyric_offset_ms = 1500;
        s.play_current(&mut nav, &env).unwrap();
        s.apply_lyrics(LyricsEvent {
            generation: s.lyric_generation(),
            track_id: "A".into(),
            payload: Some("[00:00.00]one\n[00:05.00]two\n[00:10.00]three".into()),
        });

        s.on_tick(Duration::from_secs(4), &mut nav, &env).unwrap();
        assert_eq!(s.lyrics().window().unwrap().active, Some(1));
        assert_eq!(s.elapsed(), Duration::from_secs(4));
    }

    #[test]
    fn test_stuck_stream_forces_advance() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, _fakes, mut nav) = playing(&["A", "B"], PlayMode::ListLoop);
        s.play_current(&mut nav, &env).unwrap();

        // track() lasts 180s, tolerance 10s
        s.on_tick(Duration::from_secs(185), &mut nav, &env).unwrap();
        assert_eq!(s.current_track().unwrap().id, "A");
        s.on_tick(Duration::from_secs(191), &mut nav, &env).unwrap();
        assert_eq!(s.current_track().unwrap().id, "B");
        assert_eq!(s.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_set_mode_cycles_and_saves() {
        let (mut s, fakes) = session();
        assert_eq!(s.set_mode(None), PlayMode::Order);
        assert_eq!(s.set_mode(None), PlayMode::SingleLoop);
        assert_eq!(s.set_mode(Some(PlayMode::Random)), PlayMode::Random);
        assert_eq!(fakes.store.play_mode(), Some(PlayMode::Random));
        assert_eq!(s.set_mode(None), PlayMode::ListLoop);
    }

    #[test]
    fn test_enqueue_same_queue_keeps_tracks() {
        let (mut s, _fakes) = session();
        assert!(s.enqueue(tracks(&["A", "B", "C"]), "k1", 0, None));
        assert!(!s.enqueue(tracks(&["A", "B", "C"]), "k2", 2, None));
        assert_eq!(s.queue().current_index(), Some(2));
        assert_eq!(s.queue().origin_key(), "k2");
        assert!(s.enqueue(tracks(&["A", "B"]), "k2", 0, None));
    }

    #[test]
    fn test_snapshot_saved_on_start_and_restored_stopped() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, fakes, mut nav) = playing(&["A", "B", "C"], PlayMode::ListLoop);
        s.play_current(&mut nav, &env).unwrap();
        s.advance(Direction::Next, AdvanceCause::Manual, &mut nav, &env).unwrap();

        let snap = fakes.store.snapshot().unwrap();
        assert_eq!(snap.current_index, Some(1));

        let (mut restored, _other) = session();
        restored.restore(snap);
        assert_eq!(restored.state(), PlaybackState::Stopped);
        assert_eq!(restored.current_track().unwrap().id, "B");
        restored.toggle_pause(&mut nav, &env).unwrap();
        assert_eq!(restored.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_load_saved_restores_mode_and_queue() {
        let (mut s, fakes) = session();
        fakes.store.seed(
            Some(QueueSnapshot {
                tracks: tracks(&["X", "Y"]),
                current_index: Some(1),
                origin_key: "tracks:album:a".into(),
            }),
            Some(PlayMode::Random),
        );
        s.load_saved();
        assert_eq!(s.mode(), PlayMode::Random);
        assert_eq!(s.state(), PlaybackState::Stopped);
        assert_eq!(s.queue().origin_key(), "tracks:album:a");
    }

    #[test]
    fn test_extends_from_hidden_origin_menu() {
        let target = Target::Playlist("big".into());
        let catalog = ScriptedCatalog::new().with_tracks(target.clone(), 53);
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let mut menu_nav = Navigator::new(Menu::for_target(target), "big", Columns::Single, 10);
        menu_nav.reload(&env).unwrap();
        let menu = menu_nav.menu().clone();

        let (mut s, _fakes) = session();
        s.set_mode(Some(PlayMode::Order));
        s.enqueue(menu.tracks(), &menu.key(), 49, Some(menu));
        let mut elsewhere = idle_nav();
        s.play_current(&mut elsewhere, &env).unwrap();

        s.on_done(&mut elsewhere, &env).unwrap();
        assert_eq!(s.queue().len(), 53);
        assert_eq!(s.queue().current_index(), Some(50));
        assert_eq!(s.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_displayed_menu_cursor_follows_and_grows() {
        let target = Target::Playlist("big".into());
        let catalog = ScriptedCatalog::new().with_tracks(target.clone(), 53);
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let mut nav = Navigator::new(Menu::for_target(target), "big", Columns::Double, 10);
        nav.reload(&env).unwrap();
        nav.locate(48, &env).unwrap();

        let (mut s, _fakes) = session();
        s.set_mode(Some(PlayMode::Order));
        s.play_selection(&mut nav, &env).unwrap();
        assert_eq!(s.current_track().unwrap().id, "t48");

        s.advance(Direction::Next, AdvanceCause::Manual, &mut nav, &env).unwrap();
        assert_eq!(nav.cursor(), 49);
        s.advance(Direction::Next, AdvanceCause::Manual, &mut nav, &env).unwrap();
        assert_eq!(s.queue().len(), 53);
        assert_eq!(nav.items().len(), 53);
        assert_eq!(s.queue().current_index(), Some(50));
        assert_eq!(nav.cursor(), 50);
    }

    #[test]
    fn test_partial_origin_menu_keeps_browsing_cursor() {
        let target = Target::Playlist("big".into());
        let catalog = ScriptedCatalog::new().with_tracks(target.clone(), 53);
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let mut nav = Navigator::new(Menu::for_target(target.clone()), "big", Columns::Single, 10);
        nav.reload(&env).unwrap();
        nav.locate(23, &env).unwrap();
        assert_eq!(nav.items().len(), 50);

        let all: Vec<Entry> = (0..53).map(|i| Entry::Track(track(&format!("t{i}")))).collect();
        let origin = Menu::for_target(target).with_entries(all, false);
        let (mut s, _fakes) = session();
        s.set_mode(Some(PlayMode::ListLoop));
        s.enqueue(origin.tracks(), &origin.key(), 52, Some(origin));
        s.play_current(&mut nav, &env).unwrap();
        assert!(!s.locate_cursor_to_playback(&mut nav, &env).unwrap());

        s.on_done(&mut nav, &env).unwrap();
        assert_eq!(s.queue().current_index(), Some(0));
        assert_eq!((nav.cursor(), nav.page()), (23, 3));
        assert_eq!(nav.items().len(), 50);
    }

    #[test]
    fn test_play_selection_toggles_current() {
        let target = Target::Playlist("p".into());
        let catalog = ScriptedCatalog::new().with_tracks(target.clone(), 5);
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let mut nav = Navigator::new(Menu::for_target(target), "p", Columns::Single, 10);
        nav.reload(&env).unwrap();
        nav.move_down(&env).unwrap();

        let (mut s, fakes) = session();
        s.play_selection(&mut nav, &env).unwrap();
        assert_eq!(s.current_track().unwrap().id, "t1");
        s.play_selection(&mut nav, &env).unwrap();
        assert_eq!(s.state(), PlaybackState::Paused);

        nav.move_down(&env).unwrap();
        s.play_selection(&mut nav, &env).unwrap();
        assert_eq!(s.current_track().unwrap().id, "t2");
        assert_eq!(s.state(), PlaybackState::Playing);
        assert_eq!(fakes.engine.played().len(), 2);
    }

    #[test]
    fn test_locate_cursor_to_playback() {
        let target = Target::Playlist("p".into());
        let catalog = ScriptedCatalog::new().with_tracks(target.clone(), 25);
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let mut nav = Navigator::new(Menu::for_target(target), "p", Columns::Single, 10);
        nav.reload(&env).unwrap();

        let (mut s, _fakes) = session();
        let menu = nav.menu().clone();
        s.enqueue(menu.tracks(), &menu.key(), 23, None);
        assert!(s.locate_cursor_to_playback(&mut nav, &env).unwrap());
        assert_eq!((nav.cursor(), nav.page()), (23, 3));

        s.enqueue(tracks(&["other"]), "tracks:album:x", 0, None);
        assert!(!s.locate_cursor_to_playback(&mut nav, &env).unwrap());
    }

    #[test]
    fn test_start_intelligent() {
        let seed = track("seed");
        let similar = Target::Similar {
            track_id: "seed".into(),
            context: None,
        };
        let catalog = ScriptedCatalog::new().with_entries(
            similar,
            vec![Entry::Track(track("s1")), Entry::Track(track("seed")), Entry::Track(track("s2"))],
        );
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let mut nav = idle_nav();

        let (mut s, _fakes) = session();
        s.start_intelligent(seed, None, &mut nav, &env).unwrap();
        let ids: Vec<_> = s.queue().tracks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["seed", "s1", "s2"]);
        assert_eq!(s.mode(), PlayMode::Intelligent);
        assert_eq!(s.queue().origin_key(), INTELLIGENT_KEY);
        assert_eq!(s.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_start_intelligent_needs_login() {
        let catalog = ScriptedCatalog::new();
        catalog.fail(
            Target::Similar {
                track_id: "seed".into(),
                context: None,
            },
            SessionError::AuthRequired,
        );
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, _fakes) = session();
        let res = s.start_intelligent(track("seed"), None, &mut idle_nav(), &env);
        assert_eq!(res, Err(SessionError::AuthRequired));
        assert!(s.queue().is_empty());
    }

    #[test]
    fn test_seek_and_stop() {
        let catalog = ScriptedCatalog::new();
        let render = RerenderSignal::new();
        let env = HookEnv::new(&catalog, &render);
        let (mut s, fakes, mut nav) = playing(&["A"], PlayMode::Order);
        s.play_current(&mut nav, &env).unwrap();
        s.seek_relative(-5).unwrap();
        s.seek_relative(500).unwrap();
        assert_eq!(s.elapsed(), Duration::from_secs(180));
        s.stop().unwrap();
        assert_eq!(s.state(), PlaybackState::Stopped);
        assert!(!s.lyrics().is_running());
        assert_eq!(
            fakes.engine.seeks(),
            vec![Duration::ZERO, Duration::from_secs(180)]
        );
    }
}
