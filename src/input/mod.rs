use crate::app::actions::Action;
use crate::app::events::{Event, InputEvent};
use crossterm::event::{
    self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
};
use tokio::sync::mpsc;

/// Forward terminal input to the session loop, stamped with its arrival time.
pub fn spawn_input_task(tx: mpsc::Sender<Event>, mouse_enabled: bool) {
    tokio::task::spawn_blocking(move || {
        loop {
            if !event::poll(std::time::Duration::from_millis(250)).unwrap_or(false) {
                if tx.is_closed() {
                    break;
                }
                continue;
            }
            let ev = match event::read() {
                Ok(CtEvent::Key(k)) if k.kind == KeyEventKind::Press => InputEvent::Key(k),
                Ok(CtEvent::Mouse(m)) if mouse_enabled => InputEvent::Mouse(m),
                Ok(CtEvent::Resize(width, height)) => InputEvent::Resize { width, height },
                Ok(_) | Err(_) => continue,
            };
            if tx.blocking_send(Event::input(ev)).is_err() {
                break;
            }
        }
    });
}

pub fn map_input_to_action(ev: &InputEvent) -> Option<Action> {
    match ev {
        InputEvent::Resize { width, height } => Some(Action::Resize {
            width: *width,
            height: *height,
        }),
        InputEvent::Mouse(m) => match m.kind {
            MouseEventKind::ScrollUp => Some(Action::MoveUp),
            MouseEventKind::ScrollDown => Some(Action::MoveDown),
            _ => None,
        },
        InputEvent::Key(k) => map_key(k),
    }
}

fn map_key(k: &KeyEvent) -> Option<Action> {
    let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
    match k.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('c') if ctrl => Some(Action::Quit),

        // Navigation - vim style
        KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::MoveLeft),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::MoveRight),
        KeyCode::Char('d') if ctrl => Some(Action::PageDown),
        KeyCode::Char('u') if ctrl => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Enter => Some(Action::Enter),
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => Some(Action::Back),
        KeyCode::Char('r') if ctrl => Some(Action::Reload),
        KeyCode::F(5) => Some(Action::Reload),
        KeyCode::Char('g') => Some(Action::LocatePlaying),

        // Playback
        KeyCode::Char(' ') => Some(Action::PlayPause),
        KeyCode::Char(']') => Some(Action::Next),
        KeyCode::Char('[') => Some(Action::Prev),
        KeyCode::Char('s') => Some(Action::Stop),
        KeyCode::Char('.') => Some(Action::SeekForward),
        KeyCode::Char(',') => Some(Action::SeekBack),
        KeyCode::Char('p') => Some(Action::CycleMode),
        KeyCode::Char('P') => Some(Action::Intelligent),

        _ => None,
    }
}
