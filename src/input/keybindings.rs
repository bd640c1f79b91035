use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use crate::config::KeybindingMode;
use crate::constants::{LABEL_JMAP, LABEL_XMPP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Navigation
    Up,
    Down,

    Quit,

    // Selection-bound
    ToggleSeen,
    ToggleFlagged,
    Archive,
    Delete,
    ApplyLabel(&'static str),
    MarkImportant,
    SubmitDraft,

    // Global
    Compose { send_immediately: bool },
    EmptyTrash,
}

impl Action {
    /// Whether the action operates on the selected row.
    pub fn needs_selection(&self) -> bool {
        matches!(
            self,
            Action::ToggleSeen
                | Action::ToggleFlagged
                | Action::Archive
                | Action::Delete
                | Action::ApplyLabel(_)
                | Action::MarkImportant
                | Action::SubmitDraft
        )
    }
}

pub struct KeyBindings {
    bindings: HashMap<KeyEvent, Action>,
}

/// A displayable keybinding entry
#[derive(Debug, Clone, PartialEq)]
pub struct KeybindingEntry {
    pub key: String,
    pub description: &'static str,
}

impl KeyBindings {
    pub fn new(mode: &KeybindingMode) -> Self {
        let mut bindings = Self::default_bindings();
        if *mode == KeybindingMode::Vim {
            bindings.insert(ctrl_key('n'), Action::Down);
            bindings.insert(ctrl_key('p'), Action::Up);
        }
        Self { bindings }
    }

    pub fn get(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings.get(event).copied()
    }

    /// One entry per action (its first key), in display order.
    pub fn hints(&self) -> Vec<KeybindingEntry> {
        let mut pairs: Vec<_> = self.bindings.iter().collect();
        pairs.sort_by_key(|(event, action)| (action_order(action), format_key_event(event)));

        let mut entries: Vec<KeybindingEntry> = Vec::new();
        let mut last: Option<Action> = None;
        for (event, action) in pairs {
            if last == Some(*action) {
                continue;
            }
            last = Some(*action);
            entries.push(KeybindingEntry {
                key: format_key_event(event),
                description: action_description(action),
            });
        }
        entries
    }

    fn default_bindings() -> HashMap<KeyEvent, Action> {
        let mut map = HashMap::new();

        map.insert(key_code(KeyCode::Up), Action::Up);
        map.insert(key_code(KeyCode::Down), Action::Down);

        map.insert(key('q'), Action::Quit);
        map.insert(key_code(KeyCode::Esc), Action::Quit);
        map.insert(ctrl_key('c'), Action::Quit);

        map.insert(key('n'), Action::ToggleSeen);
        map.insert(key('s'), Action::ToggleFlagged);
        map.insert(key('a'), Action::Archive);
        map.insert(key('d'), Action::Delete);
        map.insert(key('j'), Action::ApplyLabel(LABEL_JMAP));
        map.insert(key('x'), Action::ApplyLabel(LABEL_XMPP));
        map.insert(key('m'), Action::MarkImportant);
        map.insert(key_code(KeyCode::Enter), Action::SubmitDraft);

        map.insert(
            key('w'),
            Action::Compose {
                send_immediately: false,
            },
        );
        map.insert(
            shift_key('W'),
            Action::Compose {
                send_immediately: true,
            },
        );
        map.insert(shift_key('T'), Action::EmptyTrash);

        map
    }
}

fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
}

fn shift_key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::SHIFT)
}

fn ctrl_key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn key_code(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

/// Format a KeyEvent for display
fn format_key_event(event: &KeyEvent) -> String {
    match event.code {
        KeyCode::Char(c) if event.modifiers.contains(KeyModifiers::CONTROL) => format!("^{}", c),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        _ => format!("{:?}", event.code),
    }
}

fn action_description(action: &Action) -> &'static str {
    match action {
        Action::Up => "up",
        Action::Down => "down",
        Action::Quit => "quit",
        Action::ToggleSeen => "seen",
        Action::ToggleFlagged => "flag",
        Action::Archive => "archive",
        Action::Delete => "delete",
        Action::ApplyLabel(name) => *name,
        Action::MarkImportant => "important",
        Action::SubmitDraft => "submit",
        Action::Compose {
            send_immediately: false,
        } => "draft",
        Action::Compose {
            send_immediately: true,
        } => "send",
        Action::EmptyTrash => "empty trash",
    }
}

fn action_order(action: &Action) -> u8 {
    match action {
        Action::Up => 0,
        Action::Down => 1,
        Action::ToggleSeen => 2,
        Action::ToggleFlagged => 3,
        Action::Archive => 4,
        Action::Delete => 5,
        Action::ApplyLabel(_) => 6,
        Action::MarkImportant => 7,
        Action::Compose {
            send_immediately: false,
        } => 8,
        Action::Compose {
            send_immediately: true,
        } => 9,
        Action::SubmitDraft => 10,
        Action::EmptyTrash => 11,
        Action::Quit => 12,
    }
}
