//! The active list query and the outcome of executing it.

/// Outcome of running or extending a query against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Nothing changed since the last execution; cached rows are still current.
    Unchanged,
    /// The cache was refreshed and rows should be re-read.
    Updated,
}

/// An email query over one mailbox, newest first, optionally collapsed by thread.
///
/// Created once at startup and never mutated; the same descriptor is re-run on
/// every poll tick and extended for pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailQuery {
    pub in_mailbox: String,
    pub collapse_threads: bool,
}

impl EmailQuery {
    pub fn in_mailbox(mailbox_id: impl Into<String>) -> Self {
        Self {
            in_mailbox: mailbox_id.into(),
            collapse_threads: true,
        }
    }

    /// Stable key identifying this query's results in the cache.
    pub fn key(&self) -> String {
        format!(
            "inMailbox={}&sort=receivedAt-desc&collapseThreads={}",
            self.in_mailbox, self.collapse_threads
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable_and_distinct() {
        let inbox = EmailQuery::in_mailbox("inbox-id");
        assert_eq!(inbox.key(), EmailQuery::in_mailbox("inbox-id").key());
        assert_ne!(inbox.key(), EmailQuery::in_mailbox("other").key());

        let flat = EmailQuery {
            collapse_threads: false,
            ..inbox.clone()
        };
        assert_ne!(inbox.key(), flat.key());
    }
}
