//! In-memory cache shared between the mail engine and the viewer.
//!
//! Uses HashMaps protected by RwLocks for thread-safe access. Writers store
//! emails and threads before publishing the query result that references
//! them, so readers never see an item whose email is not yet cached.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::mail::types::{Email, EmailAddress, Identity, Mailbox};

use super::{QueryCache, ThreadRow};

/// One entry of a query result: the representative email of a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryItem {
    pub email_id: String,
    pub thread_id: String,
}

/// A cached query execution together with the server states it was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub query_state: String,
    pub email_state: String,
    pub thread_state: String,
    pub items: Vec<QueryItem>,
}

#[derive(Default)]
pub struct MemoryCache {
    emails: RwLock<HashMap<String, Email>>,
    /// Thread id -> ordered email ids
    threads: RwLock<HashMap<String, Vec<String>>>,
    mailboxes: RwLock<Vec<Mailbox>>,
    identities: RwLock<Vec<Identity>>,
    query_results: RwLock<HashMap<String, QueryResult>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_emails(&self, emails: impl IntoIterator<Item = Email>) {
        let mut map = write(&self.emails);
        for email in emails {
            map.insert(email.id.clone(), email);
        }
    }

    pub fn put_threads(&self, threads: impl IntoIterator<Item = (String, Vec<String>)>) {
        let mut map = write(&self.threads);
        for (id, email_ids) in threads {
            map.insert(id, email_ids);
        }
    }

    pub fn set_mailboxes(&self, mailboxes: Vec<Mailbox>) {
        *write(&self.mailboxes) = mailboxes;
    }

    pub fn set_identities(&self, identities: Vec<Identity>) {
        *write(&self.identities) = identities;
    }

    pub fn query_result(&self, query_key: &str) -> Option<QueryResult> {
        read(&self.query_results).get(query_key).cloned()
    }

    #[cfg(test)]
    pub fn set_query_result(&self, query_key: &str, result: QueryResult) {
        write(&self.query_results).insert(query_key.to_string(), result);
    }

    /// Replace the first `covered` items of a query with a fresh head.
    ///
    /// Items cached beyond `covered` (pages appended while the head was being
    /// fetched) are kept after the new head unless their thread already
    /// appears in it. Returns the resulting number of items.
    pub fn replace_query_head(
        &self,
        query_key: &str,
        mut head: QueryResult,
        covered: usize,
    ) -> usize {
        let mut results = write(&self.query_results);
        if let Some(previous) = results.remove(query_key) {
            for item in previous.items.into_iter().skip(covered) {
                if !head.items.iter().any(|i| i.thread_id == item.thread_id) {
                    head.items.push(item);
                }
            }
        }
        let len = head.items.len();
        results.insert(query_key.to_string(), head);
        len
    }

    /// Append items to an existing result, skipping threads already present.
    /// Returns the number of items actually appended.
    pub fn append_query_items(&self, query_key: &str, items: Vec<QueryItem>) -> usize {
        let mut results = write(&self.query_results);
        let result = results.entry(query_key.to_string()).or_default();
        let mut appended = 0;
        for item in items {
            if result.items.iter().any(|i| i.thread_id == item.thread_id) {
                continue;
            }
            result.items.push(item);
            appended += 1;
        }
        appended
    }

    /// Number of items currently cached for a query.
    pub fn loaded_len(&self, query_key: &str) -> usize {
        read(&self.query_results)
            .get(query_key)
            .map(|r| r.items.len())
            .unwrap_or(0)
    }

    /// Email id representing `thread_id` in a query result.
    pub fn anchor_for(&self, query_key: &str, thread_id: &str) -> Option<String> {
        read(&self.query_results).get(query_key).and_then(|r| {
            r.items
                .iter()
                .find(|i| i.thread_id == thread_id)
                .map(|i| i.email_id.clone())
        })
    }
}

impl QueryCache for MemoryCache {
    fn query_rows(&self, query_key: &str) -> Vec<ThreadRow> {
        let Some(result) = self.query_result(query_key) else {
            return Vec::new();
        };

        let emails = read(&self.emails);
        let threads = read(&self.threads);

        let mut rows = Vec::with_capacity(result.items.len());
        for item in &result.items {
            let (Some(email), Some(email_ids)) =
                (emails.get(&item.email_id), threads.get(&item.thread_id))
            else {
                tracing::debug!(
                    "Skipping query item {} of thread {}: not cached",
                    item.email_id,
                    item.thread_id
                );
                continue;
            };

            let mut participants: Vec<EmailAddress> = Vec::new();
            for from in email_ids
                .iter()
                .filter_map(|id| emails.get(id))
                .flat_map(|e| e.from.iter())
            {
                if !participants.contains(from) {
                    participants.push(from.clone());
                }
            }

            rows.push(ThreadRow {
                thread_id: item.thread_id.clone(),
                count: email_ids.len().max(1),
                participants,
                most_recent: email.clone(),
            });
        }
        rows
    }

    fn thread_messages(&self, thread_id: &str) -> Vec<Email> {
        let ids = match read(&self.threads).get(thread_id) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        let emails = read(&self.emails);
        ids.iter().filter_map(|id| emails.get(id).cloned()).collect()
    }

    fn mailboxes(&self) -> Vec<Mailbox> {
        read(&self.mailboxes).clone()
    }

    fn identities(&self) -> Vec<Identity> {
        read(&self.identities).clone()
    }
}
