//! Centralized styles for the thread list and status line

use ratatui::style::{Color, Modifier, Style};

use crate::mail::types::Email;

/// ANSI palette used throughout the UI
mod colors {
    use super::Color;

    pub const FG: Color = Color::White;
    pub const BG: Color = Color::Black;
    pub const SELECTION_FG: Color = Color::Black;
    pub const SELECTION_BG: Color = Color::Cyan;
    pub const PREVIEW: Color = Color::Cyan;
    pub const ERROR: Color = Color::Red;
    pub const MUTED: Color = Color::DarkGray;
}

/// Pre-composed styles for common UI elements
pub struct Theme;

impl Theme {
    // === Rows ===

    fn base(selected: bool) -> Style {
        if selected {
            Style::default()
                .fg(colors::SELECTION_FG)
                .bg(colors::SELECTION_BG)
        } else {
            Style::default().fg(colors::FG).bg(colors::BG)
        }
    }

    /// Drafts are italic, unseen messages bold, seen ones plain.
    pub fn row(email: &Email, selected: bool) -> Style {
        let style = Self::base(selected);
        if email.is_draft() {
            style.add_modifier(Modifier::ITALIC)
        } else if email.is_seen() {
            style
        } else {
            style.add_modifier(Modifier::BOLD)
        }
    }

    pub fn preview(email: &Email, selected: bool) -> Style {
        let style = Self::row(email, selected);
        if selected {
            style
        } else {
            style.fg(colors::PREVIEW)
        }
    }

    pub fn empty_row() -> Style {
        Self::base(false)
    }

    // === Status Line ===

    pub fn status() -> Style {
        Style::default().fg(colors::FG).bg(colors::BG)
    }

    pub fn hints() -> Style {
        Style::default().fg(colors::MUTED).bg(colors::BG)
    }

    pub fn fatal() -> Style {
        Style::default()
            .fg(colors::ERROR)
            .bg(colors::BG)
            .add_modifier(Modifier::BOLD)
    }
}
