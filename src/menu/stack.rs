use super::{Item, Menu};

/// Snapshot of one navigator level, taken when descending into a child.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub menu: Menu,
    pub items: Vec<Item>,
    pub cursor: usize,
    pub page: usize,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct MenuStack {
    frames: Vec<StackFrame>,
}

impl MenuStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    pub fn peek(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
