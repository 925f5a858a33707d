//! Menu model: what a navigator level shows and how it fetches more.
//!
//! Each [`MenuKind`] gets a [`MenuHooks`] table of plain `fn` pointers.
//! Hooks run synchronously inside the session loop, may grow the menu's
//! entries and answer whether the pending transition should go ahead.

pub mod navigator;
pub mod stack;
pub mod viewport;

use crate::catalog::{Catalog, CatalogRequest, Entry, Target, Track};
use crate::error::Result;
use std::cell::Cell;

pub use navigator::{Columns, Navigator};
pub use stack::{MenuStack, StackFrame};
pub use viewport::Layout;

/// Entries requested per catalog round trip.
pub const FETCH_LIMIT: usize = 50;

/// Display projection of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub subtitle: String,
}

impl Item {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }

    /// "title subtitle", as shown in a child menu's header.
    pub fn heading(&self) -> String {
        format!("{} {}", self.title, self.subtitle).trim().to_string()
    }
}

impl From<&Entry> for Item {
    fn from(e: &Entry) -> Self {
        match e {
            Entry::Track(t) => Item::new(t.title.clone(), t.artist_line()),
            Entry::Collection(c) => Item::new(c.name.clone(), c.owner.clone().unwrap_or_default()),
            Entry::Shelf(s) => Item::new(s.title.clone(), s.subtitle.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuKind {
    /// Top level list of shelves.
    Root,
    /// A list of collections or shelves.
    Listing(Target),
    /// A playable list of tracks.
    Tracks(Target),
}

/// Everything a hook may look at or change.
pub struct HookContext<'a> {
    pub menu: &'a mut Menu,
    pub catalog: &'a dyn Catalog,
    /// 1-based page currently shown.
    pub page: usize,
    pub page_size: usize,
}

/// Returns `Ok(true)` to let the transition proceed, `Ok(false)` to veto it.
pub type Hook = fn(&mut HookContext<'_>) -> Result<bool>;

#[derive(Debug, Clone, Copy, Default)]
pub struct MenuHooks {
    pub enter: Option<Hook>,
    pub back: Option<Hook>,
    pub prev_page: Option<Hook>,
    pub next_page: Option<Hook>,
    pub top_out: Option<Hook>,
    pub bottom_out: Option<Hook>,
}

impl MenuHooks {
    pub fn for_kind(kind: &MenuKind) -> Self {
        match kind {
            MenuKind::Root => MenuHooks {
                enter: Some(load_first_page),
                ..Default::default()
            },
            MenuKind::Listing(_) => MenuHooks {
                enter: Some(load_first_page),
                next_page: Some(prefetch_for_next_page),
                bottom_out: Some(load_next_page),
                ..Default::default()
            },
            MenuKind::Tracks(_) => MenuHooks {
                enter: Some(load_first_page),
                bottom_out: Some(load_next_page),
                ..Default::default()
            },
        }
    }
}

/// Signal sent whenever on-screen state changes.
pub trait Rerender {
    fn request_rerender(&self);

    /// A blocking hook started or finished.
    fn loading(&self, _active: bool) {}
}

/// Counts rerender requests; the session loop drains it after each event.
#[derive(Debug, Default)]
pub struct RerenderSignal {
    pending: Cell<u64>,
    loading: Cell<bool>,
}

impl RerenderSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests since the last call.
    pub fn take(&self) -> u64 {
        self.pending.replace(0)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }
}

impl Rerender for RerenderSignal {
    fn request_rerender(&self) {
        self.pending.set(self.pending.get() + 1);
    }

    fn loading(&self, active: bool) {
        self.loading.set(active);
        self.request_rerender();
    }
}

/// Collaborators a navigation step needs.
#[derive(Clone, Copy)]
pub struct HookEnv<'a> {
    pub catalog: &'a dyn Catalog,
    pub render: &'a dyn Rerender,
}

impl<'a> HookEnv<'a> {
    pub fn new(catalog: &'a dyn Catalog, render: &'a dyn Rerender) -> Self {
        Self { catalog, render }
    }
}

#[derive(Debug, Clone)]
pub struct Menu {
    kind: MenuKind,
    entries: Vec<Entry>,
    has_more: bool,
    hooks: MenuHooks,
}

impl Menu {
    pub fn new(kind: MenuKind) -> Self {
        let hooks = MenuHooks::for_kind(&kind);
        Self {
            kind,
            entries: Vec::new(),
            has_more: false,
            hooks,
        }
    }

    pub fn root() -> Self {
        Self::new(MenuKind::Root)
    }

    /// Menu for a catalog target: playable if the target yields tracks.
    pub fn for_target(target: Target) -> Self {
        if target.yields_tracks() {
            Self::new(MenuKind::Tracks(target))
        } else {
            Self::new(MenuKind::Listing(target))
        }
    }

    /// Replace the hook table, for menus that behave unlike their kind.
    pub fn with_hooks(mut self, hooks: MenuHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_entries(mut self, entries: Vec<Entry>, has_more: bool) -> Self {
        self.entries = entries;
        self.has_more = has_more;
        self
    }

    pub fn kind(&self) -> &MenuKind {
        &self.kind
    }

    pub fn hooks(&self) -> MenuHooks {
        self.hooks
    }

    pub fn target(&self) -> Target {
        match &self.kind {
            MenuKind::Root => Target::Root,
            MenuKind::Listing(t) | MenuKind::Tracks(t) => t.clone(),
        }
    }

    /// Stable key identifying this menu, used to tie a play queue to it.
    pub fn key(&self) -> String {
        match &self.kind {
            MenuKind::Root => "root".into(),
            MenuKind::Listing(t) => format!("listing:{}", t.key()),
            MenuKind::Tracks(t) => format!("tracks:{}", t.key()),
        }
    }

    pub fn is_playable(&self) -> bool {
        matches!(self.kind, MenuKind::Tracks(_))
    }

    /// Whether pressing play here always rebuilds the queue from this menu.
    /// Similar-track menus keep whatever queue is already playing them.
    pub fn reset_queue_on_play(&self) -> bool {
        !matches!(self.kind, MenuKind::Tracks(Target::Similar { .. }))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn items(&self) -> Vec<Item> {
        self.entries.iter().map(Item::from).collect()
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                Entry::Track(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn track_at(&self, index: usize) -> Option<&Track> {
        match self.entries.get(index) {
            Some(Entry::Track(t)) => Some(t),
            _ => None,
        }
    }

    /// Child menu opened by entering `index`, if the entry opens into one.
    pub fn sub_menu(&self, index: usize) -> Option<Menu> {
        match self.entries.get(index)? {
            Entry::Track(_) => None,
            Entry::Collection(c) => Some(Menu::for_target(Target::of_collection(c))),
            Entry::Shelf(s) => Some(Menu::for_target(s.target.clone())),
        }
    }

    /// Run the bottom (or top) boundary hook on a menu no navigator is
    /// showing. The menu is only updated when the hook succeeds.
    pub fn run_boundary_hook(&mut self, forward: bool, catalog: &dyn Catalog) -> Result<bool> {
        let hook = if forward {
            self.hooks.bottom_out
        } else {
            self.hooks.top_out
        };
        let Some(hook) = hook else {
            return Ok(true);
        };
        let mut scratch = self.clone();
        let proceed = hook(&mut HookContext {
            menu: &mut scratch,
            catalog,
            page: 1,
            page_size: FETCH_LIMIT,
        })?;
        *self = scratch;
        Ok(proceed)
    }

    fn request(&self, offset: usize) -> CatalogRequest {
        CatalogRequest {
            target: self.target(),
            offset,
            limit: FETCH_LIMIT,
        }
    }
}

fn load_first_page(ctx: &mut HookContext<'_>) -> Result<bool> {
    let page = ctx.catalog.fetch(&ctx.menu.request(0))?;
    ctx.menu.entries = page.entries;
    ctx.menu.has_more = page.has_more;
    Ok(true)
}

fn load_next_page(ctx: &mut HookContext<'_>) -> Result<bool> {
    if !ctx.menu.has_more {
        return Ok(true);
    }
    let page = ctx.catalog.fetch(&ctx.menu.request(ctx.menu.entries.len()))?;
    tracing::debug!(menu = %ctx.menu.key(), added = page.entries.len(), "appended page");
    ctx.menu.entries.extend(page.entries);
    ctx.menu.has_more = page.has_more;
    Ok(true)
}

/// Fetch ahead when the page about to be shown is the last one loaded.
fn prefetch_for_next_page(ctx: &mut HookContext<'_>) -> Result<bool> {
    let shown_after_turn = (ctx.page + 1) * ctx.page_size;
    if ctx.menu.has_more && shown_after_turn >= ctx.menu.entries.len() {
        load_next_page(ctx)?;
    }
    Ok(true)
}
