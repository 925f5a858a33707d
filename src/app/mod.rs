pub mod actions;
pub mod events;

use crate::catalog::Catalog;
use crate::config::MenuConfig;
use crate::error::SessionError;
use crate::input;
use crate::menu::{HookEnv, Layout, Menu, Navigator, Rerender, RerenderSignal};
use crate::playback::{AdvanceCause, Direction, PlaybackSession};
use actions::Action;
use events::{AudioEvent, Event, InputEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const SEEK_STEP_SECS: i64 = 5;

/// Owns the navigator and the playback session and applies events to them,
/// one at a time.
pub struct Controller {
    nav: Navigator,
    session: PlaybackSession,
    catalog: Box<dyn Catalog>,
    render: RerenderSignal,
    layout: Layout,
    menu_cfg: MenuConfig,
    pending_retry: Option<Action>,
    status: Option<String>,
    should_quit: bool,
}

impl Controller {
    pub fn new(
        catalog: Box<dyn Catalog>,
        mut session: PlaybackSession,
        menu_cfg: MenuConfig,
        (width, height): (u16, u16),
    ) -> Self {
        let layout = Layout::compute(
            width,
            height,
            menu_cfg.max_page_size,
            menu_cfg.double_column_min_width,
        );
        session.set_lyric_rows(layout.lyric_rows);
        let nav = Navigator::new(Menu::root(), "Home", layout.columns, layout.page_size);
        Self {
            nav,
            session,
            catalog,
            render: RerenderSignal::new(),
            layout,
            menu_cfg,
            pending_retry: None,
            status: None,
            should_quit: false,
        }
    }

    pub fn nav(&self) -> &Navigator {
        &self.nav
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn pending_retry(&self) -> Option<&Action> {
        self.pending_retry.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn is_loading(&self) -> bool {
        self.render.is_loading()
    }

    /// Restore the saved session and populate the root menu.
    pub fn start(&mut self) {
        self.session.load_saved();
        self.dispatch(Action::Reload);
    }

    /// Process events until the channel closes or the user quits. `draw`
    /// runs once up front and after every event that asked for a rerender.
    pub fn run(&mut self, rx: &mut mpsc::Receiver<Event>, mut draw: impl FnMut(&Controller)) {
        draw(self);
        while let Some(ev) = rx.blocking_recv() {
            self.handle(ev);
            if self.should_quit {
                break;
            }
            if self.render.take() > 0 {
                draw(self);
            }
        }
        self.session.save_snapshot();
    }

    pub fn handle(&mut self, ev: Event) {
        match ev {
            Event::Input { event, at } => {
                // a resize is a fact about the terminal, not a keypress
                let is_resize = matches!(event, InputEvent::Resize { .. });
                if !is_resize && !self.nav.guard().admits(at) {
                    debug!("input arrived during a hook, dropped");
                    return;
                }
                if let Some(action) = input::map_input_to_action(&event) {
                    self.dispatch(action);
                }
            }
            Event::Audio(audio) => self.on_audio(audio),
            Event::Lyrics(lyrics) => {
                if self.session.apply_lyrics(lyrics) {
                    self.render.request_rerender();
                }
            }
            Event::LoginCompleted => {
                if let Some(action) = self.pending_retry.take() {
                    info!(?action, "replaying after login");
                    self.dispatch(action);
                }
            }
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        match self.apply(action.clone()) {
            Ok(()) => {}
            Err(SessionError::AuthRequired) => {
                self.status = Some("Login required".into());
                self.pending_retry = Some(action);
            }
            Err(e) => {
                warn!(?action, error = %e, "action failed");
                self.status = Some(e.to_string());
            }
        }
        self.render.request_rerender();
    }

    fn on_audio(&mut self, audio: AudioEvent) {
        let env = HookEnv::new(self.catalog.as_ref(), &self.render);
        let result = match audio {
            AudioEvent::Tick { elapsed } => self.session.on_tick(elapsed, &mut self.nav, &env),
            AudioEvent::Done => self.session.on_done(&mut self.nav, &env),
            AudioEvent::Failed(msg) => self.session.on_engine_error(&msg, &mut self.nav, &env),
        };
        if let Err(e) = result {
            warn!(error = %e, "playback stopped");
            self.status = Some(e.to_string());
        }
        self.render.request_rerender();
    }

    fn apply(&mut self, action: Action) -> crate::error::Result<()> {
        let env = HookEnv::new(self.catalog.as_ref(), &self.render);
        let nav = &mut self.nav;
        let session = &mut self.session;
        match action {
            Action::Quit => {
                session.save_snapshot();
                if let Err(e) = session.stop() {
                    debug!(error = %e, "stop on quit");
                }
                self.should_quit = true;
            }

            Action::MoveUp => {
                nav.move_up(&env)?;
            }
            Action::MoveDown => {
                nav.move_down(&env)?;
            }
            Action::MoveLeft => {
                nav.move_left(&env)?;
            }
            Action::MoveRight => {
                nav.move_right(&env)?;
            }
            Action::PageUp => {
                nav.prev_page(&env)?;
            }
            Action::PageDown => {
                nav.next_page(&env)?;
            }
            Action::Enter => {
                let index = nav.cursor();
                if nav.selected_track().is_some() {
                    session.play_selection(nav, &env)?;
                } else if nav.enter(index, &env)? {
                    session.locate_cursor_to_playback(nav, &env)?;
                }
            }
            Action::Back => {
                if nav.back(&env)? {
                    session.locate_cursor_to_playback(nav, &env)?;
                }
            }
            Action::Reload => {
                nav.reload(&env)?;
            }
            Action::LocatePlaying => {
                session.locate_cursor_to_playback(nav, &env)?;
            }

            Action::PlayPause => session.play_selection(nav, &env)?,
            Action::Next => session.advance(Direction::Next, AdvanceCause::Manual, nav, &env)?,
            Action::Prev => session.advance(Direction::Prev, AdvanceCause::Manual, nav, &env)?,
            Action::Stop => session.stop()?,
            Action::SeekForward => session.seek_relative(SEEK_STEP_SECS)?,
            Action::SeekBack => session.seek_relative(-SEEK_STEP_SECS)?,
            Action::CycleMode => {
                let mode = session.set_mode(None);
                self.status = Some(format!("Mode: {}", mode.label()));
            }
            Action::SetMode(mode) => {
                let mode = session.set_mode(Some(mode));
                self.status = Some(format!("Mode: {}", mode.label()));
            }
            Action::Intelligent => {
                let seed = nav
                    .selected_track()
                    .or(session.current_track())
                    .cloned();
                let Some(seed) = seed else {
                    return Ok(());
                };
                let context = nav.menu().is_playable().then(|| nav.menu().key());
                session.start_intelligent(seed, context, nav, &env)?;
            }

            Action::Resize { width, height } => {
                self.layout = Layout::compute(
                    width,
                    height,
                    self.menu_cfg.max_page_size,
                    self.menu_cfg.double_column_min_width,
                );
                nav.resize(self.layout.columns, self.layout.page_size);
                session.set_lyric_rows(self.layout.lyric_rows);
            }
        }
        Ok(())
    }
}
