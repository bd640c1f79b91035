//! Handlers for the mutating actions.
//!
//! Each handler issues exactly one engine mutation and never touches the
//! view; the next poll or pagination brings the list back in line.

use std::sync::Arc;

use crate::cache::ThreadRow;
use crate::error::SyncError;
use crate::input::Action;
use crate::mail::SyncResult;
use crate::mail::types::{Email, Identity, Keywords};

use super::AppContext;

/// Run `action` and log its failure.
pub async fn perform(ctx: Arc<AppContext>, action: Action) {
    if let Err(e) = execute(&ctx, action).await {
        tracing::error!("{:?} failed: {}", action, e);
    }
}

pub(crate) async fn execute(ctx: &AppContext, action: Action) -> SyncResult<()> {
    let selection = if action.needs_selection() {
        let Some(row) = ctx.read(|view| view.current_selection().cloned()) else {
            tracing::debug!("{:?} ignored: nothing selected", action);
            return Ok(());
        };
        let emails = ctx.cache.thread_messages(&row.thread_id);
        Some((row, emails))
    } else {
        None
    };

    match (action, selection) {
        (Action::ToggleSeen, Some((row, emails))) => {
            toggle(ctx, &row, &emails, Keywords::SEEN).await
        }
        (Action::ToggleFlagged, Some((row, emails))) => {
            toggle(ctx, &row, &emails, Keywords::FLAGGED).await
        }
        (Action::Archive, Some((_, emails))) => ctx.engine.archive(&emails).await,
        (Action::Delete, Some((_, emails))) => ctx.engine.move_to_trash(&emails).await,
        (Action::ApplyLabel(name), Some((_, emails))) => apply_label(ctx, name, &emails).await,
        (Action::MarkImportant, Some((_, emails))) => {
            ctx.engine.copy_to_important(&emails).await
        }
        (Action::SubmitDraft, Some((row, _))) => submit(ctx, &row).await,
        (Action::Compose { send_immediately }, _) => compose(ctx, send_immediately).await,
        (Action::EmptyTrash, _) => ctx.engine.empty_trash().await,
        // navigation and quit belong to the input loop
        _ => Ok(()),
    }
}

/// Remove the keyword if the thread's newest message carries it, set it otherwise.
async fn toggle(
    ctx: &AppContext,
    row: &ThreadRow,
    emails: &[Email],
    keyword: Keywords,
) -> SyncResult<()> {
    let changed = if row.most_recent.has_keyword(keyword) {
        ctx.engine.remove_keyword(emails, keyword).await?
    } else {
        ctx.engine.set_keyword(emails, keyword).await?
    };
    if !changed {
        tracing::debug!("{:?} already in place on {}", keyword, row.thread_id);
    }
    Ok(())
}

async fn apply_label(ctx: &AppContext, name: &str, emails: &[Email]) -> SyncResult<()> {
    let mailboxes = ctx.cache.mailboxes();
    match mailboxes.iter().find(|m| m.is_label(name)) {
        Some(mailbox) => ctx.engine.copy_to_mailbox(emails, mailbox).await,
        None => {
            tracing::info!("Label {} does not exist yet, creating it", name);
            ctx.engine.create_mailbox(name).await
        }
    }
}

fn first_identity(ctx: &AppContext) -> SyncResult<Identity> {
    ctx.cache
        .identities()
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::NotFound("Identity".to_string()))
}

async fn submit(ctx: &AppContext, row: &ThreadRow) -> SyncResult<()> {
    if !row.most_recent.is_draft() {
        tracing::debug!("{} is not a draft, not submitting", row.most_recent.id);
        return Ok(());
    }
    let identity = first_identity(ctx)?;
    ctx.engine.submit(&row.most_recent, &identity).await?;
    tracing::info!("Submitted {}", row.most_recent.id);
    Ok(())
}

async fn compose(ctx: &AppContext, send_immediately: bool) -> SyncResult<()> {
    let message = ctx.compose.message(&ctx.username);
    if send_immediately {
        let identity = first_identity(ctx)?;
        ctx.engine.send(&message, &identity).await
    } else {
        ctx.engine.save_draft(&message).await
    }
}
