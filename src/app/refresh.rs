//! Background refresh loop.
//!
//! Bootstraps the session (mailboxes, identities, inbox query), then re-runs
//! the active query on a fixed interval. Between ticks the loop is Idle;
//! while a query is in flight it is Querying. Both waits observe the
//! cancellation token.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;
use crate::mail::types::{Role, find_role};
use crate::mail::{EmailQuery, QueryStatus, SyncResult};

use super::AppContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Querying,
}

/// Why the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Cancelled,
    /// Stopped on an error no later poll can recover from
    Fatal(String),
}

/// Load mailboxes and identities and install the inbox query.
pub async fn bootstrap(ctx: &AppContext) -> SyncResult<EmailQuery> {
    ctx.update(|view| view.set_loading("Loading mailboxes…"));
    ctx.engine.refresh_mailboxes().await?;

    let inbox = find_role(&ctx.cache.mailboxes(), Role::Inbox)
        .map(|m| m.id.clone())
        .ok_or_else(|| SyncError::NotFound("Inbox".to_string()))?;

    ctx.update(|view| view.set_loading("Loading identities…"));
    ctx.engine.refresh_identities().await?;

    let query = EmailQuery::in_mailbox(inbox);
    ctx.set_active_query(query.clone());
    ctx.update(|view| view.set_loading("Loading messages from inbox…"));
    Ok(query)
}

/// Run the query once; on `Updated` swap in the fresh rows and redraw.
pub async fn poll_once(ctx: &AppContext, query: &EmailQuery) -> SyncResult<QueryStatus> {
    let status = ctx.engine.query(query, None).await?;
    match status {
        QueryStatus::Updated => ctx.reload_rows(),
        QueryStatus::Unchanged => tracing::debug!("Query unchanged"),
    }
    Ok(status)
}

/// Bootstrap, then poll until cancelled or a fatal error occurs.
///
/// Bootstrap failures and fatal poll errors are shown in place of the list.
pub async fn run(ctx: Arc<AppContext>, interval: Duration, cancel: CancellationToken) -> Exit {
    let bootstrapped = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Exit::Cancelled,
        result = bootstrap(&ctx) => result,
    };
    let query = match bootstrapped {
        Ok(query) => query,
        Err(e) => {
            tracing::error!("Bootstrap failed: {}", e);
            let message = e.to_string();
            ctx.update(|view| view.set_fatal(message.clone()));
            return Exit::Fatal(message);
        }
    };

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut phase = Phase::Idle;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        phase = transition(phase, Phase::Querying);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = poll_once(&ctx, &query) => result,
        };
        phase = transition(phase, Phase::Idle);

        match result {
            Ok(status) => tracing::debug!("Poll finished: {:?}", status),
            Err(e) if e.is_fatal() => {
                tracing::error!("Stopping refresh loop: {}", e);
                let message = e.to_string();
                ctx.update(|view| view.set_fatal(message.clone()));
                return Exit::Fatal(message);
            }
            Err(e) => tracing::warn!("Poll failed, retrying next tick: {}", e),
        }
    }

    tracing::debug!("Refresh loop cancelled in {:?}", phase);
    Exit::Cancelled
}

fn transition(from: Phase, to: Phase) -> Phase {
    tracing::trace!("Refresh loop {:?} -> {:?}", from, to);
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Receiver;

    use crate::app::dispatch::tests::{Call, RecordingEngine};
    use crate::app::render_thread::RenderCommand;
    use crate::app::state::Status;
    use crate::app::state::tests::make_rows;
    use crate::app::tests::{context, drain_frames};
    use crate::cache::{MemoryCache, QueryItem, QueryResult, make_email};
    use crate::mail::types::{Identity, Mailbox};

    const SHORT: Duration = Duration::from_millis(20);
    const LONG: Duration = Duration::from_secs(3600);

    fn inbox() -> Mailbox {
        Mailbox {
            id: "inbox-id".into(),
            name: "Inbox".into(),
            role: Some(Role::Inbox),
        }
    }

    fn engine_with(cache: &Arc<MemoryCache>, mailboxes: Vec<Mailbox>) -> RecordingEngine {
        RecordingEngine::with_cache(
            cache.clone(),
            mailboxes,
            vec![Identity {
                id: "id1".into(),
                name: "Me".into(),
                email: "me@ltt.rs".into(),
            }],
        )
    }

    /// Put `n` single-message threads behind the inbox query.
    fn fill_cache(cache: &MemoryCache, n: usize) {
        let emails: Vec<_> = (0..n)
            .map(|i| make_email(&format!("e{i}"), &format!("t{i}"), "a@example.com", i as i64))
            .collect();
        cache.put_threads(emails.iter().map(|e| (e.thread_id.clone(), vec![e.id.clone()])));
        let items = emails
            .iter()
            .map(|e| QueryItem {
                email_id: e.id.clone(),
                thread_id: e.thread_id.clone(),
            })
            .collect();
        cache.put_emails(emails);
        cache.set_query_result(
            &EmailQuery::in_mailbox("inbox-id").key(),
            QueryResult {
                items,
                ..QueryResult::default()
            },
        );
    }

    fn statuses(rx: &Receiver<RenderCommand>) -> Vec<Status> {
        drain_frames(rx).into_iter().map(|f| f.status).collect()
    }

    #[tokio::test]
    async fn test_bootstrap_reports_progress() {
        let cache = Arc::new(MemoryCache::new());
        let engine = Arc::new(engine_with(&cache, vec![inbox()]));
        let (ctx, rx) = context(engine.clone(), cache, 10);

        let query = bootstrap(&ctx).await.unwrap();
        assert_eq!(query, EmailQuery::in_mailbox("inbox-id"));
        assert_eq!(ctx.active_query(), Some(&query));
        assert_eq!(
            engine.calls(),
            vec![Call::RefreshMailboxes, Call::RefreshIdentities]
        );
        assert_eq!(
            statuses(&rx),
            vec![
                Status::Loading("Loading mailboxes…".into()),
                Status::Loading("Loading identities…".into()),
                Status::Loading("Loading messages from inbox…".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_inbox_is_fatal() {
        let cache = Arc::new(MemoryCache::new());
        let engine = Arc::new(engine_with(&cache, Vec::new()));
        let (ctx, rx) = context(engine.clone(), cache, 10);

        let exit = run(ctx.clone(), SHORT, CancellationToken::new()).await;
        assert_eq!(exit, Exit::Fatal("Inbox not found".into()));
        assert_eq!(
            statuses(&rx).last(),
            Some(&Status::Fatal("Inbox not found".into()))
        );
        assert_eq!(engine.calls(), vec![Call::RefreshMailboxes]);
    }

    #[tokio::test]
    async fn test_unchanged_poll_does_not_touch_view() {
        let cache = Arc::new(MemoryCache::new());
        let engine = Arc::new(engine_with(&cache, vec![inbox()]));
        let (ctx, rx) = context(engine.clone(), cache, 10);
        let query = bootstrap(&ctx).await.unwrap();
        ctx.update(|view| view.replace_rows(make_rows(3)));
        drain_frames(&rx);
        let before = ctx.read(|view| Arc::clone(view.rows()));

        let status = poll_once(&ctx, &query).await.unwrap();
        assert_eq!(status, QueryStatus::Unchanged);
        assert!(drain_frames(&rx).is_empty());
        ctx.read(|view| assert!(Arc::ptr_eq(view.rows(), &before)));
    }

    #[tokio::test]
    async fn test_updated_poll_replaces_rows_and_keeps_cursor_index() {
        let cache = Arc::new(MemoryCache::new());
        let engine = Arc::new(engine_with(&cache, vec![inbox()]));
        let (ctx, rx) = context(engine.clone(), cache.clone(), 10);
        let query = bootstrap(&ctx).await.unwrap();
        fill_cache(&cache, 5);
        ctx.reload_rows();
        ctx.update(|view| {
            view.move_cursor_down();
            view.move_cursor_down();
        });
        let before = ctx.read(|view| Arc::clone(view.rows()));
        drain_frames(&rx);

        // a sixth thread shows up on the server
        fill_cache(&cache, 6);

        engine.push_query_result(Ok(QueryStatus::Updated));
        poll_once(&ctx, &query).await.unwrap();

        let frames = drain_frames(&rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].rows.len(), 6);
        assert_eq!(frames[0].cursor, 2);
        ctx.read(|view| {
            assert!(!Arc::ptr_eq(view.rows(), &before));
            assert_eq!(view.current_selection().map(|r| r.thread_id.as_str()), Some("t2"));
        });
    }

    #[tokio::test]
    async fn test_empty_inbox_stops_loading() {
        let cache = Arc::new(MemoryCache::new());
        let engine = Arc::new(engine_with(&cache, vec![inbox()]));
        let (ctx, rx) = context(engine.clone(), cache.clone(), 10);
        let query = bootstrap(&ctx).await.unwrap();
        cache.set_query_result(&query.key(), QueryResult::default());
        drain_frames(&rx);

        engine.push_query_result(Ok(QueryStatus::Updated));
        poll_once(&ctx, &query).await.unwrap();

        let frames = drain_frames(&rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].status, Status::Idle);
        assert!(frames[0].rows.is_empty());
    }

    #[tokio::test]
    async fn test_fatal_poll_error_stops_loop() {
        let cache = Arc::new(MemoryCache::new());
        let engine = Arc::new(engine_with(&cache, vec![inbox()]));
        engine.push_query_result(Ok(QueryStatus::Unchanged));
        engine.push_query_result(Err(SyncError::Unauthorized));
        let (ctx, rx) = context(engine.clone(), cache, 10);

        let exit = tokio::time::timeout(
            Duration::from_secs(5),
            run(ctx, SHORT, CancellationToken::new()),
        )
        .await
        .unwrap();
        assert_eq!(exit, Exit::Fatal("Unauthorized".into()));
        assert_eq!(
            statuses(&rx).last(),
            Some(&Status::Fatal("Unauthorized".into()))
        );
        let queries = engine
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Query { .. }))
            .count();
        assert_eq!(queries, 2);
    }

    #[tokio::test]
    async fn test_transient_errors_keep_polling() {
        let cache = Arc::new(MemoryCache::new());
        let engine = Arc::new(engine_with(&cache, vec![inbox()]));
        engine.fail_next_query();
        engine.fail_next_query();
        engine.push_query_result(Err(SyncError::MethodError("serverFail".into())));
        let (ctx, _rx) = context(engine.clone(), cache, 10);

        let exit = tokio::time::timeout(
            Duration::from_secs(5),
            run(ctx, SHORT, CancellationToken::new()),
        )
        .await
        .unwrap();
        assert_eq!(exit, Exit::Fatal("serverFail".into()));
        let queries = engine
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Query { after: None }))
            .count();
        assert_eq!(queries, 3);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_idle_wait() {
        let cache = Arc::new(MemoryCache::new());
        let engine = Arc::new(engine_with(&cache, vec![inbox()]));
        let (ctx, _rx) = context(engine.clone(), cache, 10);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run(ctx, LONG, cancel.clone()));
        // first tick fires immediately, then the loop sleeps for an hour
        while !engine.calls().iter().any(|c| matches!(c, Call::Query { .. })) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();

        let exit = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, Exit::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_query_in_flight() {
        let cache = Arc::new(MemoryCache::new());
        let engine = Arc::new(engine_with(&cache, vec![inbox()]));
        engine.hang_queries();
        let (ctx, _rx) = context(engine.clone(), cache, 10);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run(ctx, SHORT, cancel.clone()));
        while !engine.calls().iter().any(|c| matches!(c, Call::Query { .. })) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();

        let exit = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, Exit::Cancelled);
    }
}
