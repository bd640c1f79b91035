//! Main event loop: terminal input, resize handling and task supervision

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::constants::{ACTION_DRAIN_TIMEOUT_MS, INPUT_POLL_MS};
use crate::input::{Action, InputResult, KeyBindings, handle_input};

use super::refresh::{self, Exit};
use super::{App, AppContext, dispatch, scroll};

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

impl App {
    /// Run until the user quits. Returns once background work has stopped.
    pub async fn run(self) -> Result<()> {
        let App {
            ctx,
            bindings,
            poll_interval,
        } = self;
        let cancel = CancellationToken::new();

        let refresh = tokio::spawn(refresh::run(ctx.clone(), poll_interval, cancel.clone()));

        let (input_tx, mut input_rx) = mpsc::unbounded_channel();
        let (resize_tx, resize_rx) = watch::channel(None);
        let reader = spawn_reader(bindings, input_tx, resize_tx, cancel.clone());
        let resizer = tokio::spawn(follow_resizes(ctx.clone(), resize_rx, cancel.clone()));

        // first frame before anything has loaded
        ctx.update(|_| ());

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                input = input_rx.recv() => {
                    let Some(input) = input else {
                        tracing::debug!("Input reader stopped");
                        break;
                    };
                    if route(&ctx, input, &mut tasks) == Flow::Quit {
                        break;
                    }
                }
                Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = finished {
                        tracing::error!("Background task panicked: {}", e);
                    }
                }
                _ = &mut ctrl_c => {
                    tracing::info!("Interrupted");
                    break;
                }
            }
        }

        tracing::info!("Shutting down");
        cancel.cancel();

        match refresh.await {
            Ok(Exit::Cancelled) => tracing::debug!("Refresh loop stopped"),
            Ok(Exit::Fatal(reason)) => tracing::info!("Refresh loop had stopped: {}", reason),
            Err(e) => tracing::error!("Refresh loop panicked: {}", e),
        }
        resizer.await.ok();
        reader.await.ok();
        drain(&mut tasks, Duration::from_millis(ACTION_DRAIN_TIMEOUT_MS)).await;

        Ok(())
    }
}

/// Read terminal events on a blocking thread until cancelled.
///
/// Resizes go to the watch channel so only the newest height is applied;
/// everything else is forwarded in order.
fn spawn_reader(
    bindings: KeyBindings,
    input_tx: mpsc::UnboundedSender<InputResult>,
    resize_tx: watch::Sender<Option<u16>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !cancel.is_cancelled() {
            match event::poll(Duration::from_millis(INPUT_POLL_MS)) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::error!("Failed to poll terminal input: {}", e);
                    break;
                }
            }
            let evt = match event::read() {
                Ok(evt) => evt,
                Err(e) => {
                    tracing::error!("Failed to read terminal input: {}", e);
                    break;
                }
            };
            match handle_input(evt, &bindings) {
                InputResult::Continue => {}
                InputResult::Resize(height) => {
                    resize_tx.send_replace(Some(height));
                }
                other => {
                    if input_tx.send(other).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

async fn follow_resizes(
    ctx: Arc<AppContext>,
    mut heights: watch::Receiver<Option<u16>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = heights.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        let height = *heights.borrow_and_update();
        if let Some(height) = height {
            scroll::resize(&ctx, height);
        }
    }
}

/// Apply one input. Navigation runs inline; network work goes to `tasks`.
fn route(ctx: &Arc<AppContext>, input: InputResult, tasks: &mut JoinSet<()>) -> Flow {
    match input {
        InputResult::Quit => return Flow::Quit,
        InputResult::Continue => {}
        InputResult::Resize(height) => scroll::resize(ctx, height),
        InputResult::Action(Action::Up) => scroll::cursor_up(ctx),
        InputResult::Action(Action::Down) => {
            if let Some(token) = scroll::cursor_down(ctx) {
                tasks.spawn(scroll::paginate(ctx.clone(), token));
            }
        }
        InputResult::Action(Action::Quit) => return Flow::Quit,
        InputResult::Action(action) => {
            tracing::debug!("Dispatching {:?}", action);
            tasks.spawn(dispatch::perform(ctx.clone(), action));
        }
    }
    Flow::Continue
}

/// Wait up to `limit` for outstanding tasks, then abort the rest.
async fn drain(tasks: &mut JoinSet<()>, limit: Duration) {
    if tasks.is_empty() {
        return;
    }
    tracing::debug!("Waiting for {} outstanding tasks", tasks.len());
    let finished = tokio::time::timeout(limit, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if finished.is_err() {
        tracing::warn!("Aborting {} tasks still running", tasks.len());
        tasks.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::app::dispatch::tests::{Call, RecordingEngine};
    use crate::app::state::tests::make_rows;
    use crate::app::tests::{context, drain_frames};
    use crate::cache::MemoryCache;
    use crate::mail::EmailQuery;

    fn setup(rows: usize) -> (Arc<AppContext>, Arc<RecordingEngine>) {
        let engine = Arc::new(RecordingEngine::default());
        let (ctx, _rx) = context(engine.clone(), Arc::new(MemoryCache::new()), 10);
        ctx.set_active_query(EmailQuery::in_mailbox("inbox"));
        ctx.update(|view| view.replace_rows(make_rows(rows)));
        (ctx, engine)
    }

    #[test]
    fn test_quit_stops_loop() {
        let (ctx, _) = setup(1);
        let mut tasks = JoinSet::new();
        assert_eq!(route(&ctx, InputResult::Quit, &mut tasks), Flow::Quit);
        assert_eq!(
            route(&ctx, InputResult::Action(Action::Quit), &mut tasks),
            Flow::Quit
        );
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_navigation_runs_inline_and_paginates_at_end() {
        let (ctx, engine) = setup(2);
        let mut tasks = JoinSet::new();

        route(&ctx, InputResult::Action(Action::Down), &mut tasks);
        assert_eq!(ctx.read(|view| view.cursor()), 1);
        assert_eq!(tasks.len(), 1);

        route(&ctx, InputResult::Action(Action::Up), &mut tasks);
        assert_eq!(ctx.read(|view| view.cursor()), 0);
        assert_eq!(tasks.len(), 1);

        drain(&mut tasks, Duration::from_secs(1)).await;
        assert_eq!(
            engine.calls(),
            vec![Call::Query {
                after: Some("t1".into())
            }]
        );
    }

    #[tokio::test]
    async fn test_actions_are_spawned() {
        let (ctx, engine) = setup(1);
        let mut tasks = JoinSet::new();

        assert_eq!(
            route(&ctx, InputResult::Action(Action::EmptyTrash), &mut tasks),
            Flow::Continue
        );
        drain(&mut tasks, Duration::from_secs(1)).await;
        assert_eq!(engine.calls(), vec![Call::EmptyTrash]);
    }

    #[tokio::test]
    async fn test_drain_aborts_stuck_tasks() {
        let mut tasks = JoinSet::new();
        tasks.spawn(futures::future::pending::<()>());
        tasks.spawn(async {});

        let started = Instant::now();
        drain(&mut tasks, Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_resizes_apply_newest_height() {
        let engine = Arc::new(RecordingEngine::default());
        let (ctx, rx) = context(engine, Arc::new(MemoryCache::new()), 10);
        let (tx, heights) = watch::channel(None);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(follow_resizes(ctx.clone(), heights, cancel.clone()));

        tx.send_replace(Some(30));
        tx.send_replace(Some(8));
        let deadline = Instant::now() + Duration::from_secs(1);
        while ctx.read(|view| view.visible_rows()) != 7 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(ctx.read(|view| view.visible_rows()), 7);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(drain_frames(&rx).iter().all(|f| f.visible_rows != 10));
    }
}
