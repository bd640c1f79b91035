//! Application-wide constants for tuning and layout
//!
//! Centralizes magic numbers so the renderer, the refresh loop and the
//! config defaults agree on them.

/// Default interval between background query refreshes, in seconds.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Number of rows requested per query page (initial load and each extension).
pub const QUERY_PAGE_SIZE: usize = 10;

/// Maximum time to wait for outstanding actions on shutdown before aborting them.
pub const ACTION_DRAIN_TIMEOUT_MS: u64 = 2000;

/// How often the input reader checks for shutdown while waiting for terminal events.
pub const INPUT_POLL_MS: u64 = 100;

// === Row layout ===

/// Width of the flag indicator column ("★ " or two spaces).
pub const FLAG_WIDTH: usize = 2;

/// Width of the sender column.
pub const FROM_WIDTH: usize = 20;

/// Width of the thread size column (" (NNN)  " or blanks).
pub const THREAD_SIZE_WIDTH: usize = 8;

/// Width of the right-aligned date column ("HH:MM" or "MMM DD").
pub const DATE_WIDTH: usize = 7;

/// Thread sizes above this are displayed capped.
pub const MAX_DISPLAYED_THREAD_SIZE: usize = 999;

/// Maximum number of characters of body text used for the preview column.
pub const PREVIEW_MAX_CHARS: usize = 256;

/// Lines reserved below the list for the status line.
pub const STATUS_LINE_HEIGHT: u16 = 1;

// === Actions ===

/// Label mailboxes reachable through single-key shortcuts.
pub const LABEL_JMAP: &str = "jmap";
pub const LABEL_XMPP: &str = "xmpp";
