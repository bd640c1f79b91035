//! The mail engine seam: everything the viewer asks of the sync layer.
//!
//! The engine owns all network traffic and writes results into the cache;
//! the viewer only reads the cache back through [`crate::cache::QueryCache`].

use futures::future::BoxFuture;

use crate::error::SyncError;

use super::query::{EmailQuery, QueryStatus};
use super::types::{ComposeEmail, Email, Identity, Keywords, Mailbox};

pub type SyncResult<T> = Result<T, SyncError>;

pub trait MailEngine: Send + Sync {
    /// Fetch all mailboxes into the cache.
    fn refresh_mailboxes(&self) -> BoxFuture<'_, SyncResult<()>>;

    /// Fetch all sending identities into the cache.
    fn refresh_identities(&self) -> BoxFuture<'_, SyncResult<()>>;

    /// Run `query`, or extend it past the row identified by `after`.
    fn query<'a>(
        &'a self,
        query: &'a EmailQuery,
        after: Option<&'a str>,
    ) -> BoxFuture<'a, SyncResult<QueryStatus>>;

    /// Set `keyword` on every email that lacks it. Returns whether a change was sent.
    fn set_keyword<'a>(
        &'a self,
        emails: &'a [Email],
        keyword: Keywords,
    ) -> BoxFuture<'a, SyncResult<bool>>;

    /// Remove `keyword` from every email that carries it. Returns whether a change was sent.
    fn remove_keyword<'a>(
        &'a self,
        emails: &'a [Email],
        keyword: Keywords,
    ) -> BoxFuture<'a, SyncResult<bool>>;

    fn move_to_trash<'a>(&'a self, emails: &'a [Email]) -> BoxFuture<'a, SyncResult<()>>;

    fn archive<'a>(&'a self, emails: &'a [Email]) -> BoxFuture<'a, SyncResult<()>>;

    fn copy_to_mailbox<'a>(
        &'a self,
        emails: &'a [Email],
        mailbox: &'a Mailbox,
    ) -> BoxFuture<'a, SyncResult<()>>;

    fn copy_to_important<'a>(&'a self, emails: &'a [Email]) -> BoxFuture<'a, SyncResult<()>>;

    fn create_mailbox<'a>(&'a self, name: &'a str) -> BoxFuture<'a, SyncResult<()>>;

    fn empty_trash(&self) -> BoxFuture<'_, SyncResult<()>>;

    /// Store `email` in the drafts mailbox.
    fn save_draft<'a>(&'a self, email: &'a ComposeEmail) -> BoxFuture<'a, SyncResult<()>>;

    /// Store `email` and submit it right away.
    fn send<'a>(
        &'a self,
        email: &'a ComposeEmail,
        identity: &'a Identity,
    ) -> BoxFuture<'a, SyncResult<()>>;

    /// Submit an existing draft.
    fn submit<'a>(
        &'a self,
        email: &'a Email,
        identity: &'a Identity,
    ) -> BoxFuture<'a, SyncResult<()>>;
}
