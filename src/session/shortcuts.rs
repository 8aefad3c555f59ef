use crate::session::messages::Key;
use crate::session::state::SessionState;

/// Keyboard actions available on the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Cancel,
    ToggleColorFormat,
    CopyColor,
}

pub fn handle_key_event(state: SessionState, key: &Key) -> Option<KeyAction> {
    match key {
        // Escape always cancels; the session ignores it once terminal
        Key::Escape => Some(KeyAction::Cancel),
        _ if state.is_terminal() => None,
        Key::Shift => Some(KeyAction::ToggleColorFormat),
        Key::Character(c) if c.eq_ignore_ascii_case("c") => Some(KeyAction::CopyColor),
        _ => None,
    }
}
