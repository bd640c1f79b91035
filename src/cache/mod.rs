//! Local view of the server state.
//!
//! The mail engine writes into the cache; the viewer reads aggregated
//! thread rows and per-thread message collections out of it.

mod memory;

pub use memory::{MemoryCache, QueryItem, QueryResult};

#[cfg(test)]
pub(crate) use memory::tests::make_email;

use crate::mail::types::{Email, EmailAddress, Identity, Mailbox};

/// One line of the thread list: a thread summarized by its newest message.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadRow {
    pub thread_id: String,
    /// Number of messages backing the thread (always >= 1)
    pub count: usize,
    /// Senders across all messages of the thread, first-seen order, no duplicates
    pub participants: Vec<EmailAddress>,
    /// The thread's most recently received message
    pub most_recent: Email,
}

impl ThreadRow {
    /// Token used to request rows after this one.
    pub fn continuation_token(&self) -> &str {
        &self.thread_id
    }
}

/// Read side of the cache as consumed by the viewer.
pub trait QueryCache: Send + Sync {
    /// Aggregated rows for a query; empty if the query has not been populated yet.
    fn query_rows(&self, query_key: &str) -> Vec<ThreadRow>;

    /// All messages belonging to a thread.
    fn thread_messages(&self, thread_id: &str) -> Vec<Email>;

    fn mailboxes(&self) -> Vec<Mailbox>;

    fn identities(&self) -> Vec<Identity>;
}
