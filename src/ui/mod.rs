//! Terminal rendering of view snapshots

mod format;
pub mod theme;

use chrono::{DateTime, Local};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::app::state::{Status, ViewSnapshot};
use crate::cache::ThreadRow;
use crate::constants::STATUS_LINE_HEIGHT;
use format::{
    format_date, format_flag, format_from, format_thread_size, split_subject_preview,
    subject_preview_width,
};
use theme::Theme;

/// Draw the thread list and the status line.
pub fn render(frame: &mut Frame, snapshot: &ViewSnapshot, hints: &str, now: DateTime<Local>) {
    let [list_area, status_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(STATUS_LINE_HEIGHT),
    ])
    .areas(frame.area());

    frame.render_widget(Block::default().style(Theme::empty_row()), list_area);

    match &snapshot.status {
        Status::Fatal(message) => render_message(frame, list_area, message, true),
        Status::Loading(message) if snapshot.rows.is_empty() => {
            render_message(frame, list_area, message, false)
        }
        _ => render_list(frame, list_area, snapshot, now),
    }

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(hints.to_string(), Theme::hints()))),
        status_area,
    );
}

fn render_message(frame: &mut Frame, area: Rect, message: &str, fatal: bool) {
    let style = if fatal { Theme::fatal() } else { Theme::status() };
    frame.render_widget(Paragraph::new(message.to_string()).style(style), area);
}

fn render_list(frame: &mut Frame, area: Rect, snapshot: &ViewSnapshot, now: DateTime<Local>) {
    let lines: Vec<Line> = snapshot
        .visible()
        .map(|(index, row)| row_line(row, index == snapshot.cursor, area.width as usize, now))
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

/// One list row: flag, sender, thread size, subject + preview, date.
fn row_line(row: &ThreadRow, selected: bool, width: usize, now: DateTime<Local>) -> Line<'static> {
    let email = &row.most_recent;
    let style = Theme::row(email, selected);
    let (subject, preview) = split_subject_preview(
        &email.subject,
        &email.preview,
        subject_preview_width(width),
    );

    Line::from(vec![
        Span::styled(format_flag(email.is_flagged()), style),
        Span::styled(format_from(&row.participants), style),
        Span::styled(format_thread_size(row.count), style),
        Span::styled(subject, style),
        Span::styled(preview, Theme::preview(email, selected)),
        Span::styled(format_date(email.received_at, now), style),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::app::state::ViewState;
    use crate::app::state::tests::make_rows;
    use crate::cache::make_email;
    use crate::mail::types::{EmailAddress, Keywords};

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 14, 18, 0, 0).unwrap()
    }

    fn draw(snapshot: &ViewSnapshot, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| render(f, snapshot, "q quit", now()))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_row_layout() {
        let mut email = make_email("e1", "t1", "alice@example.com", 0);
        email.subject = "Hello".into();
        email.preview = "How are you".into();
        email.keywords = Keywords::FLAGGED;
        email.received_at = Local
            .with_ymd_and_hms(2024, 3, 14, 9, 30, 0)
            .unwrap()
            .timestamp();
        let row = ThreadRow {
            thread_id: "t1".into(),
            count: 3,
            participants: vec![
                EmailAddress::with_name("alice@example.com", "Alice Liddell"),
                EmailAddress::new("bob@example.com"),
            ],
            most_recent: email,
        };

        let text = line_text(&row_line(&row, false, 60, now()));
        assert_eq!(
            text,
            "★ Alice, bob           (  3)  Hello How are you        09:30"
        );
    }

    #[test]
    fn test_selected_row_styles() {
        let rows = make_rows(1);
        let line = row_line(&rows[0], true, 60, now());
        assert!(
            line.spans
                .iter()
                .all(|s| s.style.bg == Some(ratatui::style::Color::Cyan))
        );
    }

    #[test]
    fn test_loading_replaces_empty_list() {
        let mut view = ViewState::new(3);
        view.set_loading("Loading mailboxes…");
        let lines = draw(&view.snapshot(), 30, 4);
        assert!(lines[0].starts_with("Loading mailboxes…"));
        assert!(lines[3].starts_with("q quit"));
    }

    #[test]
    fn test_fatal_replaces_list() {
        let mut view = ViewState::new(3);
        view.replace_rows(make_rows(2));
        view.set_fatal("Unauthorized");
        let lines = draw(&view.snapshot(), 40, 4);
        assert!(lines[0].starts_with("Unauthorized"));
    }

    #[test]
    fn test_list_shows_visible_window() {
        let mut view = ViewState::new(2);
        view.replace_rows(make_rows(5));
        for _ in 0..3 {
            view.move_cursor_down();
        }
        let snapshot = view.snapshot();
        assert_eq!(snapshot.offset, 2);

        let lines = draw(&snapshot, 60, 3);
        let subjects: Vec<&ThreadRow> = snapshot.visible().map(|(_, r)| r).collect();
        assert!(lines[0].contains(&subjects[0].most_recent.subject));
        assert!(lines[1].contains(&subjects[1].most_recent.subject));
        assert!(lines[2].starts_with("q quit"));
    }
}
