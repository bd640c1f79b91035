//! Positional view state of the thread list.
//!
//! Invariant kept by every operation: when rows are non-empty,
//! `offset <= cursor < rows.len()`, and after a resize or a cursor move
//! `cursor < offset + visible_rows` (given `visible_rows > 0`).

use std::sync::Arc;

use crate::cache::ThreadRow;

/// Result of moving the cursor down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorMove {
    /// Already on the last row
    Unchanged,
    Moved,
    /// Moved onto the last row; `token` identifies it for fetching the next page
    ReachedEnd { token: String },
}

/// Status line contents when the list itself is not shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Nothing to report, show the list
    Idle,
    Loading(String),
    /// The background loop has stopped for good
    Fatal(String),
}

/// Immutable copy of the view handed to the renderer.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub rows: Arc<Vec<ThreadRow>>,
    pub cursor: usize,
    pub offset: usize,
    pub visible_rows: usize,
    pub status: Status,
}

impl ViewSnapshot {
    /// Rows currently on screen, paired with their absolute index.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &ThreadRow)> {
        self.rows
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(self.visible_rows)
    }
}

#[derive(Debug)]
pub struct ViewState {
    rows: Arc<Vec<ThreadRow>>,
    cursor: usize,
    offset: usize,
    visible_rows: usize,
    status: Status,
}

impl ViewState {
    pub fn new(visible_rows: usize) -> Self {
        Self {
            rows: Arc::new(Vec::new()),
            cursor: 0,
            offset: 0,
            visible_rows,
            status: Status::Idle,
        }
    }

    pub fn rows(&self) -> &Arc<Vec<ThreadRow>> {
        &self.rows
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn visible_rows(&self) -> usize {
        self.visible_rows
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn move_cursor_up(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        if self.cursor < self.offset {
            self.offset = self.cursor;
        }
        true
    }

    pub fn move_cursor_down(&mut self) -> CursorMove {
        if self.cursor + 1 >= self.rows.len() {
            return CursorMove::Unchanged;
        }
        self.cursor += 1;

        let window = self.visible_rows.max(1);
        if self.cursor - self.offset >= window {
            self.offset = self.cursor + 1 - window;
        }

        if self.cursor == self.rows.len() - 1 {
            CursorMove::ReachedEnd {
                token: self.rows[self.cursor].continuation_token().to_string(),
            }
        } else {
            CursorMove::Moved
        }
    }

    /// Re-derive the offset from scratch for a new window height.
    pub fn on_resize(&mut self, visible_rows: usize) {
        self.visible_rows = visible_rows;
        let max_offset = self.rows.len().saturating_sub(visible_rows);
        self.offset = self.cursor.min(max_offset);
    }

    /// Swap in a new row list.
    ///
    /// The cursor keeps its index, so after a refresh it may point at a
    /// different thread. It is only clamped when the list shrank below it.
    /// Any loading status is cleared: the rows are a completed query result.
    pub fn replace_rows(&mut self, rows: Vec<ThreadRow>) {
        self.rows = Arc::new(rows);

        let last = self.rows.len().saturating_sub(1);
        self.cursor = self.cursor.min(last);
        self.offset = self.offset.min(self.cursor);
        if self.visible_rows > 0 && self.cursor >= self.offset + self.visible_rows {
            self.offset = self.cursor + 1 - self.visible_rows;
        }

        // a finished query ends loading even when it came back empty
        if matches!(self.status, Status::Loading(_)) {
            self.status = Status::Idle;
        }
    }

    pub fn current_selection(&self) -> Option<&ThreadRow> {
        self.rows.get(self.cursor)
    }

    pub fn set_loading(&mut self, message: impl Into<String>) {
        if !matches!(self.status, Status::Fatal(_)) {
            self.status = Status::Loading(message.into());
        }
    }

    pub fn set_fatal(&mut self, message: impl Into<String>) {
        self.status = Status::Fatal(message.into());
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            rows: Arc::clone(&self.rows),
            cursor: self.cursor,
            offset: self.offset,
            visible_rows: self.visible_rows,
            status: self.status.clone(),
        }
    }
}
