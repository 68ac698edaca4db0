//! TUI types and key mapping

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io::IsTerminal;

/// Which pane receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Topics,
    Messages,
}

impl Focus {
    /// The other pane.
    pub fn toggled(self) -> Self {
        match self {
            Focus::Topics => Focus::Messages,
            Focus::Messages => Focus::Topics,
        }
    }
}

impl std::fmt::Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Focus::Topics => write!(f, "topics"),
            Focus::Messages => write!(f, "messages"),
        }
    }
}

/// A user intent produced by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleFocus,
    MoveUp,
    MoveDown,
    ToggleSubscription,
    ResetMessages,
    Quit,
}

/// Map a key event to an action. Releases and repeats of unbound keys map to nothing.
pub fn action_for_key(key: &KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Tab => Some(Action::ToggleFocus),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Action::ToggleSubscription),
        KeyCode::Char('r') => Some(Action::ResetMessages),
        _ => None,
    }
}

/// Check whether stdout is an interactive terminal we can take over.
pub fn should_enable_interactive() -> bool {
    std::io::stdout().is_terminal()
}
