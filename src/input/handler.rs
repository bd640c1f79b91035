use crossterm::event::{Event, KeyEvent, KeyEventKind};

use super::keybindings::{Action, KeyBindings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Quit,
    Action(Action),
    /// Terminal was resized to the given number of lines
    Resize(u16),
}

pub fn handle_input(event: Event, bindings: &KeyBindings) -> InputResult {
    match event {
        Event::Key(key_event) => handle_key(key_event, bindings),
        Event::Resize(_, height) => InputResult::Resize(height),
        _ => InputResult::Continue,
    }
}

fn handle_key(key: KeyEvent, bindings: &KeyBindings) -> InputResult {
    // Terminals with the kitty protocol also report releases
    if key.kind != KeyEventKind::Press {
        return InputResult::Continue;
    }

    match bindings.get(&key) {
        Some(Action::Quit) => InputResult::Quit,
        Some(action) => InputResult::Action(action),
        None => InputResult::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeybindingMode;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    fn bindings() -> KeyBindings {
        KeyBindings::new(&KeybindingMode::Default)
    }

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_quit_keys() {
        assert_eq!(
            handle_input(press(KeyCode::Char('q')), &bindings()),
            InputResult::Quit
        );
        assert_eq!(handle_input(press(KeyCode::Esc), &bindings()), InputResult::Quit);
    }

    #[test]
    fn test_mapped_action() {
        assert_eq!(
            handle_input(press(KeyCode::Char('x')), &bindings()),
            InputResult::Action(Action::ApplyLabel("xmpp"))
        );
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        assert_eq!(
            handle_input(press(KeyCode::Char('?')), &bindings()),
            InputResult::Continue
        );
    }

    #[test]
    fn test_release_is_ignored() {
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(handle_input(release, &bindings()), InputResult::Continue);
    }

    #[test]
    fn test_resize_reports_height() {
        assert_eq!(
            handle_input(Event::Resize(80, 24), &bindings()),
            InputResult::Resize(24)
        );
    }

    #[test]
    fn test_other_events_are_ignored() {
        assert_eq!(
            handle_input(Event::FocusGained, &bindings()),
            InputResult::Continue
        );
    }
}
