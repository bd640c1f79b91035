//! Cursor movement, resize handling and incremental pagination.

use std::sync::Arc;

use crate::mail::QueryStatus;

use super::state::CursorMove;
use super::{AppContext, list_height};

pub fn cursor_up(ctx: &AppContext) {
    ctx.update(|view| view.move_cursor_up());
}

/// Move down; returns the continuation token when the cursor landed on the last row.
pub fn cursor_down(ctx: &AppContext) -> Option<String> {
    match ctx.update(|view| view.move_cursor_down()) {
        CursorMove::ReachedEnd { token } => Some(token),
        CursorMove::Moved | CursorMove::Unchanged => None,
    }
}

/// Apply a new terminal height (in lines, status line included).
pub fn resize(ctx: &AppContext, height: u16) {
    let visible = list_height(height);
    tracing::debug!("Resized to {} visible rows", visible);
    ctx.update(|view| view.on_resize(visible));
}

/// Ask the engine for the page following `token` and show it if anything arrived.
///
/// Failures are logged and the view keeps its current rows.
pub async fn paginate(ctx: Arc<AppContext>, token: String) {
    let Some(query) = ctx.active_query() else {
        return;
    };

    tracing::debug!("Fetching rows after {}", token);
    match ctx.engine.query(query, Some(&token)).await {
        Ok(QueryStatus::Updated) => ctx.reload_rows(),
        Ok(QueryStatus::Unchanged) => tracing::debug!("No rows after {}", token),
        Err(e) => tracing::warn!("Pagination after {} failed: {}", token, e),
    }
}
