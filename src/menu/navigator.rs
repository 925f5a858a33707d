//! Paginated, cursor-addressable view over the current menu.

use super::{Hook, HookContext, HookEnv, Item, Menu, MenuStack, StackFrame};
use crate::catalog::Track;
use crate::error::Result;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Columns {
    Single,
    Double,
}

impl Columns {
    pub fn per_row(self) -> usize {
        match self {
            Columns::Single => 1,
            Columns::Double => 2,
        }
    }
}

/// Input is ignored while a hook blocks the loop. Events stamped inside the
/// last suspension window are dropped once the loop gets to them.
#[derive(Debug, Clone, Default)]
pub struct InputGuard {
    suspended_at: Option<Instant>,
    last_window: Option<(Instant, Instant)>,
}

impl InputGuard {
    fn suspend(&mut self) {
        if self.suspended_at.is_none() {
            self.suspended_at = Some(Instant::now());
        }
    }

    fn resume(&mut self) {
        if let Some(start) = self.suspended_at.take() {
            self.last_window = Some((start, Instant::now()));
        }
    }

    pub fn is_listening(&self) -> bool {
        self.suspended_at.is_none()
    }

    /// Whether an input event created at `at` should be dispatched.
    pub fn admits(&self, at: Instant) -> bool {
        if !self.is_listening() {
            return false;
        }
        match self.last_window {
            Some((start, end)) => at < start || at > end,
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Navigator {
    menu: Menu,
    items: Vec<Item>,
    cursor: usize,
    /// 1-based; always `cursor / page_size + 1`.
    page: usize,
    page_size: usize,
    columns: Columns,
    title: String,
    stack: MenuStack,
    guard: InputGuard,
}

impl Navigator {
    pub fn new(menu: Menu, title: impl Into<String>, columns: Columns, page_size: usize) -> Self {
        let items = menu.items();
        Self {
            menu,
            items,
            cursor: 0,
            page: 1,
            page_size: page_size.max(1),
            columns,
            title: title.into(),
            stack: MenuStack::new(),
            guard: InputGuard::default(),
        }
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 1-based page number.
    pub fn page(&self) -> usize {
        self.page
    }

    /// 0-based page index, `cursor / page_size`.
    pub fn page_index(&self) -> usize {
        self.page - 1
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn columns(&self) -> Columns {
        self.columns
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn stack(&self) -> &MenuStack {
        &self.stack
    }

    pub fn guard(&self) -> &InputGuard {
        &self.guard
    }

    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size).max(1)
    }

    pub fn current_page_items(&self) -> &[Item] {
        let start = ((self.page - 1) * self.page_size).min(self.items.len());
        let end = (self.page * self.page_size).min(self.items.len());
        &self.items[start..end]
    }

    pub fn selected_item(&self) -> Option<&Item> {
        self.items.get(self.cursor)
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.menu.track_at(self.cursor)
    }

    /// Apply a new viewport; the cursor stays put and the page follows it.
    pub fn resize(&mut self, columns: Columns, page_size: usize) {
        let mut page_size = page_size.max(1);
        if columns == Columns::Double && page_size % 2 == 1 {
            page_size += 1;
        }
        self.columns = columns;
        self.page_size = page_size;
        self.page = self.cursor / self.page_size + 1;
    }

    /// Re-run the current menu's enter hook to (re)populate it in place.
    pub fn reload(&mut self, env: &HookEnv<'_>) -> Result<bool> {
        let proceed = self.run_hook(self.menu.hooks().enter, env)?;
        self.clamp_cursor();
        Ok(proceed)
    }

    pub fn move_up(&mut self, env: &HookEnv<'_>) -> Result<bool> {
        let step = self.columns.per_row();
        if self.cursor < step {
            if !self.run_hook(self.menu.hooks().top_out, env)? {
                return Ok(false);
            }
            if self.cursor < step {
                return Ok(false);
            }
        }
        self.move_to(self.cursor - step, env)
    }

    pub fn move_down(&mut self, env: &HookEnv<'_>) -> Result<bool> {
        let step = self.columns.per_row();
        if self.cursor + step >= self.items.len() {
            if !self.run_hook(self.menu.hooks().bottom_out, env)? {
                return Ok(false);
            }
            if self.cursor + step >= self.items.len() {
                return Ok(false);
            }
        }
        self.move_to(self.cursor + step, env)
    }

    pub fn move_left(&mut self, env: &HookEnv<'_>) -> Result<bool> {
        if self.columns == Columns::Single || self.cursor % 2 == 0 {
            return Ok(false);
        }
        self.move_to(self.cursor - 1, env)
    }

    pub fn move_right(&mut self, env: &HookEnv<'_>) -> Result<bool> {
        if self.columns == Columns::Single || self.cursor % 2 == 1 {
            return Ok(false);
        }
        if self.cursor + 1 >= self.items.len() {
            if !self.run_hook(self.menu.hooks().bottom_out, env)? {
                return Ok(false);
            }
            if self.cursor + 1 >= self.items.len() {
                return Ok(false);
            }
        }
        self.move_to(self.cursor + 1, env)
    }

    /// Move one step in list order, the way playback walks the menu.
    pub fn follow_playback(&mut self, forward: bool, env: &HookEnv<'_>) -> Result<bool> {
        let double = self.columns == Columns::Double;
        match (forward, double && self.cursor % 2 == 0) {
            (true, true) => self.move_right(env),
            (true, false) => self.move_down(env),
            (false, true) => self.move_up(env),
            (false, false) if double => self.move_left(env),
            (false, false) => self.move_up(env),
        }
    }

    pub fn next_page(&mut self, env: &HookEnv<'_>) -> Result<bool> {
        if !self.run_hook(self.menu.hooks().next_page, env)? {
            return Ok(false);
        }
        if self.page >= self.total_pages() {
            return Ok(false);
        }
        self.page += 1;
        self.cursor = (self.page - 1) * self.page_size;
        Ok(true)
    }

    pub fn prev_page(&mut self, env: &HookEnv<'_>) -> Result<bool> {
        if !self.run_hook(self.menu.hooks().prev_page, env)? {
            return Ok(false);
        }
        if self.page <= 1 {
            return Ok(false);
        }
        self.page -= 1;
        self.cursor = (self.page - 1) * self.page_size;
        Ok(true)
    }

    /// Page to the page holding `index` one page at a time, then select it.
    pub fn locate(&mut self, index: usize, env: &HookEnv<'_>) -> Result<bool> {
        if index >= self.items.len() {
            return Ok(false);
        }
        let target = index / self.page_size + 1;
        while self.page < target {
            if !self.next_page(env)? {
                break;
            }
        }
        while self.page > target {
            if !self.prev_page(env)? {
                break;
            }
        }
        if index >= self.items.len() {
            return Ok(false);
        }
        self.cursor = index;
        self.page = target;
        Ok(true)
    }

    /// Descend into the child of item `index`. Nothing is pushed unless the
    /// child's enter hook succeeds and yields at least one item.
    pub fn enter(&mut self, index: usize, env: &HookEnv<'_>) -> Result<bool> {
        let Some(selected) = self.items.get(index) else {
            return Ok(false);
        };
        let heading = selected.heading();
        let Some(mut child) = self.menu.sub_menu(index) else {
            return Ok(false);
        };

        if let Some(hook) = child.hooks().enter
            && !self.invoke(hook, &mut child, 1, env)?
        {
            return Ok(false);
        }

        let items = child.items();
        if items.is_empty() {
            tracing::debug!(menu = %child.key(), "child menu empty, staying");
            return Ok(false);
        }

        let frame = StackFrame {
            menu: std::mem::replace(&mut self.menu, child),
            items: std::mem::replace(&mut self.items, items),
            cursor: self.cursor,
            page: self.page,
            title: std::mem::replace(&mut self.title, heading),
        };
        self.stack.push(frame);
        self.cursor = 0;
        self.page = 1;
        Ok(true)
    }

    pub fn back(&mut self, env: &HookEnv<'_>) -> Result<bool> {
        if self.stack.is_empty() {
            return Ok(false);
        }
        if !self.run_hook(self.menu.hooks().back, env)? {
            return Ok(false);
        }
        let Some(frame) = self.stack.pop() else {
            return Ok(false);
        };
        self.menu = frame.menu;
        self.items = frame.items;
        self.cursor = frame.cursor;
        self.title = frame.title;
        self.page = frame.page;
        if self.page != self.cursor / self.page_size + 1 {
            // viewport changed while the frame sat on the stack
            self.page = self.cursor / self.page_size + 1;
        }
        Ok(true)
    }

    fn move_to(&mut self, target: usize, env: &HookEnv<'_>) -> Result<bool> {
        let new_page = target / self.page_size + 1;
        if new_page != self.page {
            let hooks = self.menu.hooks();
            let hook = if new_page > self.page {
                hooks.next_page
            } else {
                hooks.prev_page
            };
            if !self.run_hook(hook, env)? {
                return Ok(false);
            }
        }
        self.cursor = target;
        self.page = new_page;
        Ok(true)
    }

    /// Run a hook of the current menu against a scratch copy and commit the
    /// copy only when the hook returns without error.
    fn run_hook(&mut self, hook: Option<Hook>, env: &HookEnv<'_>) -> Result<bool> {
        let Some(hook) = hook else {
            return Ok(true);
        };
        let mut scratch = self.menu.clone();
        let proceed = self.invoke(hook, &mut scratch, self.page, env)?;
        self.menu = scratch;
        self.items = self.menu.items();
        self.clamp_cursor();
        Ok(proceed)
    }

    fn invoke(&mut self, hook: Hook, menu: &mut Menu, page: usize, env: &HookEnv<'_>) -> Result<bool> {
        self.guard.suspend();
        env.render.loading(true);
        let result = hook(&mut HookContext {
            menu,
            catalog: env.catalog,
            page,
            page_size: self.page_size,
        });
        self.guard.resume();
        env.render.loading(false);
        if let Err(e) = &result {
            tracing::warn!(menu = %menu.key(), error = %e, "menu hook failed");
        }
        result
    }

    fn clamp_cursor(&mut self) {
        if self.cursor >= self.items.len() {
            self.cursor = self.items.len().saturating_sub(1);
        }
        self.page = self.cursor / self.page_size + 1;
    }
}
