//! Application core - view state, background refresh and input coordination

pub mod dispatch;
mod event_loop;
pub mod refresh;
pub mod render_thread;
pub mod scroll;
pub mod state;

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use anyhow::Result;

use crate::cache::QueryCache;
use crate::config::{ComposeConfig, Config};
use crate::constants::STATUS_LINE_HEIGHT;
use crate::input::KeyBindings;
use crate::mail::{EmailQuery, MailEngine};
use render_thread::{RenderThread, Redrawer};
use state::ViewState;

/// Shared context of one interactive session.
///
/// The input loop, the refresh loop and the resize task each hold an
/// `Arc<AppContext>`. All view mutations go through [`AppContext::update`],
/// which redraws from inside the same critical section.
pub struct AppContext {
    view: Mutex<ViewState>,
    pub(crate) cache: Arc<dyn QueryCache>,
    pub(crate) engine: Arc<dyn MailEngine>,
    query: OnceLock<EmailQuery>,
    redraw: Redrawer,
    pub(crate) compose: ComposeConfig,
    pub(crate) username: String,
}

impl AppContext {
    pub fn new(
        engine: Arc<dyn MailEngine>,
        cache: Arc<dyn QueryCache>,
        redraw: Redrawer,
        compose: ComposeConfig,
        username: String,
        visible_rows: usize,
    ) -> Self {
        Self {
            view: Mutex::new(ViewState::new(visible_rows)),
            cache,
            engine,
            query: OnceLock::new(),
            redraw,
            compose,
            username,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mutate the view and queue a redraw of the resulting state.
    pub fn update<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut view = self.lock();
        let result = f(&mut view);
        self.redraw.request(view.snapshot());
        result
    }

    /// Read the view without redrawing.
    pub fn read<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        f(&self.lock())
    }

    pub fn active_query(&self) -> Option<&EmailQuery> {
        self.query.get()
    }

    /// Install the query created at bootstrap. Later calls are ignored.
    pub fn set_active_query(&self, query: EmailQuery) {
        if self.query.set(query).is_err() {
            tracing::warn!("Active query already set");
        }
    }

    /// Replace the rows with the cache's current aggregation of the active query.
    pub fn reload_rows(&self) {
        let Some(query) = self.active_query() else {
            return;
        };
        let key = query.key();
        self.update(|view| view.replace_rows(self.cache.query_rows(&key)));
    }
}

/// Visible list rows for a terminal of `height` lines.
pub fn list_height(height: u16) -> usize {
    height.saturating_sub(STATUS_LINE_HEIGHT) as usize
}

pub struct App {
    ctx: Arc<AppContext>,
    bindings: KeyBindings,
    poll_interval: Duration,
}

impl App {
    /// Open the terminal and build the session context.
    ///
    /// Fails if the terminal cannot be set up.
    pub fn new(
        config: &Config,
        engine: Arc<dyn MailEngine>,
        cache: Arc<dyn QueryCache>,
        username: &str,
    ) -> Result<(Self, RenderThread)> {
        let bindings = KeyBindings::new(&config.ui.keybinding_mode);
        let hints = bindings
            .hints()
            .iter()
            .map(|h| format!("{} {}", h.key, h.description))
            .collect::<Vec<_>>()
            .join("  ");

        let (_, height) = crossterm::terminal::size()?;
        let (render_thread, redraw) = RenderThread::spawn(hints)?;

        let ctx = Arc::new(AppContext::new(
            engine,
            cache,
            redraw,
            config.compose.clone(),
            username.to_string(),
            list_height(height),
        ));

        Ok((
            Self {
                ctx,
                bindings,
                poll_interval: config.sync.poll_interval(),
            },
            render_thread,
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::mpsc::{self, Receiver};

    use crate::cache::MemoryCache;
    use render_thread::RenderCommand;
    use state::ViewSnapshot;

    /// Context over an in-memory cache, with redraws captured on a channel.
    pub(crate) fn context(
        engine: Arc<dyn MailEngine>,
        cache: Arc<MemoryCache>,
        visible_rows: usize,
    ) -> (Arc<AppContext>, Receiver<RenderCommand>) {
        let (tx, rx) = mpsc::channel();
        let ctx = AppContext::new(
            engine,
            cache,
            Redrawer::new(tx),
            ComposeConfig::default(),
            "me@ltt.rs".to_string(),
            visible_rows,
        );
        (Arc::new(ctx), rx)
    }

    pub(crate) fn drain_frames(rx: &Receiver<RenderCommand>) -> Vec<ViewSnapshot> {
        rx.try_iter()
            .filter_map(|cmd| match cmd {
                RenderCommand::Render(snapshot) => Some(*snapshot),
                RenderCommand::Shutdown => None,
            })
            .collect()
    }

    #[test]
    fn test_list_height_reserves_status_line() {
        assert_eq!(list_height(24), 23);
        assert_eq!(list_height(1), 0);
        assert_eq!(list_height(0), 0);
    }

    #[test]
    fn test_update_redraws_snapshot_of_result() {
        let engine = Arc::new(crate::app::dispatch::tests::RecordingEngine::default());
        let (ctx, rx) = context(engine, Arc::new(MemoryCache::new()), 5);

        ctx.update(|view| view.set_loading("Loading mailboxes…"));
        let frames = drain_frames(&rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].status,
            state::Status::Loading("Loading mailboxes…".into())
        );

        ctx.read(|view| assert_eq!(view.visible_rows(), 5));
        assert!(drain_frames(&rx).is_empty());
    }

    #[test]
    fn test_concurrent_updates_keep_cursor_visible() {
        use std::thread;

        let engine = Arc::new(crate::app::dispatch::tests::RecordingEngine::default());
        let (ctx, rx) = context(engine, Arc::new(MemoryCache::new()), 5);
        ctx.update(|view| view.replace_rows(state::tests::make_rows(40)));

        let walker = {
            let ctx = ctx.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    if (i / 50) % 2 == 0 {
                        ctx.update(|view| {
                            view.move_cursor_down();
                        });
                    } else {
                        ctx.update(|view| {
                            view.move_cursor_up();
                        });
                    }
                }
            })
        };
        let resizer = {
            let ctx = ctx.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    ctx.update(|view| view.on_resize(i % 9));
                }
            })
        };
        let refresher = {
            let ctx = ctx.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    ctx.update(|view| view.replace_rows(state::tests::make_rows(i % 45)));
                }
            })
        };
        for handle in [walker, resizer, refresher] {
            handle.join().unwrap();
        }

        let frames = drain_frames(&rx);
        assert_eq!(frames.len(), 1 + 500 + 500 + 200);
        for frame in &frames {
            if frame.rows.is_empty() {
                assert_eq!((frame.cursor, frame.offset), (0, 0));
                continue;
            }
            assert!(frame.offset <= frame.cursor, "{} > {}", frame.offset, frame.cursor);
            assert!(frame.cursor < frame.rows.len());
            if frame.visible_rows > 0 {
                assert!(
                    frame.cursor < frame.offset + frame.visible_rows,
                    "cursor {} outside window {}+{}",
                    frame.cursor,
                    frame.offset,
                    frame.visible_rows
                );
            }
        }
    }

    #[test]
    fn test_reload_rows_without_query_is_noop() {
        let engine = Arc::new(crate::app::dispatch::tests::RecordingEngine::default());
        let (ctx, rx) = context(engine, Arc::new(MemoryCache::new()), 5);
        ctx.reload_rows();
        assert!(drain_frames(&rx).is_empty());
    }
}
