//! Fixed-width column formatting for list rows.
//!
//! All widths are terminal display columns, measured with `unicode-width`.

use chrono::{DateTime, Local};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::constants::{
    DATE_WIDTH, FLAG_WIDTH, FROM_WIDTH, MAX_DISPLAYED_THREAD_SIZE, THREAD_SIZE_WIDTH,
};
use crate::mail::types::EmailAddress;

/// Cut `s` to at most `width` columns without splitting a wide character.
pub fn truncate_to_width(s: &str, width: usize) -> &str {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            return &s[..idx];
        }
        used += w;
    }
    s
}

/// Truncate or space-pad `s` to exactly `width` columns.
pub fn fit(s: &str, width: usize) -> String {
    let cut = truncate_to_width(s, width);
    let pad = width.saturating_sub(cut.width());
    format!("{cut}{}", " ".repeat(pad))
}

pub fn format_flag(flagged: bool) -> &'static str {
    if flagged { "★ " } else { "  " }
}

/// Sender column: a lone participant by full name, several by first names,
/// falling back to the address' local part.
pub fn format_from(participants: &[EmailAddress]) -> String {
    let multiple = participants.len() > 1;
    let names: Vec<&str> = participants
        .iter()
        .map(|address| match address.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                if multiple {
                    name.split_whitespace().next().unwrap_or(name)
                } else {
                    name
                }
            }
            _ => address.local_part(),
        })
        .collect();
    fit(&names.join(", "), FROM_WIDTH)
}

pub fn format_thread_size(count: usize) -> String {
    if count > 1 {
        format!(" ({:>3})  ", count.min(MAX_DISPLAYED_THREAD_SIZE))
    } else {
        " ".repeat(THREAD_SIZE_WIDTH)
    }
}

/// Columns left for subject and preview in a row of `total` columns.
pub fn subject_preview_width(total: usize) -> usize {
    total.saturating_sub(FLAG_WIDTH + FROM_WIDTH + THREAD_SIZE_WIDTH + DATE_WIDTH)
}

/// Split `width` columns between the subject and the preview.
///
/// The subject comes first; whatever is left after one separating space goes
/// to the preview. Returns the subject text and, if there is room, the preview
/// text including its leading space. Together they fill exactly `width`.
pub fn split_subject_preview(subject: &str, preview: &str, width: usize) -> (String, String) {
    let subject = truncate_to_width(subject, width);
    let rest = width - subject.width();
    if rest > 1 {
        (subject.to_string(), format!(" {}", fit(preview, rest - 1)))
    } else {
        (subject.to_string(), " ".repeat(rest))
    }
}

/// `HH:MM` for messages received today, `Mon DD` otherwise, right-aligned.
pub fn format_date(received_at: i64, now: DateTime<Local>) -> String {
    let Some(received) = DateTime::from_timestamp(received_at, 0) else {
        return " ".repeat(DATE_WIDTH);
    };
    let received = received.with_timezone(&Local);
    let text = if received.date_naive() == now.date_naive() {
        received.format("%H:%M").to_string()
    } else {
        received.format("%b %d").to_string()
    };
    format!("{:>width$}", text, width = DATE_WIDTH)
}
