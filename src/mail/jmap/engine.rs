//! [`MailEngine`] over JMAP, writing every result into the shared [`MemoryCache`].

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value, json};

use crate::cache::{MemoryCache, QueryCache, QueryItem, QueryResult};
use crate::error::SyncError;
use crate::mail::engine::{MailEngine, SyncResult};
use crate::mail::query::{EmailQuery, QueryStatus};
use crate::mail::types::{ComposeEmail, Email, Identity, Keywords, Mailbox, Role, find_role};

use super::JmapSession;
use super::wire::{
    EMAIL_PROPERTIES, GetResponse, Invocation, QueryResponse, Response, SetResponse, ThreadIdOnly,
    WireEmail, WireIdentity, WireMailbox, WireThread, result_of,
};

const IMPORTANT_NAME: &str = "Important";

/// Build the four chained calls that run a query and fetch everything
/// needed to render its threads.
fn query_calls(
    account_id: &str,
    query: &EmailQuery,
    limit: usize,
    anchor: Option<&str>,
) -> Vec<Invocation> {
    let mut args = json!({
        "accountId": account_id,
        "filter": { "inMailbox": query.in_mailbox },
        "sort": [{ "property": "receivedAt", "isAscending": false }],
        "collapseThreads": query.collapse_threads,
        "limit": limit,
    });
    match anchor {
        Some(anchor) => {
            args["anchor"] = json!(anchor);
            args["anchorOffset"] = json!(1);
        }
        None => args["position"] = json!(0),
    }

    vec![
        Invocation::new("Email/query", args, "0"),
        Invocation::new(
            "Email/get",
            json!({
                "accountId": account_id,
                "#ids": result_of("0", "Email/query", "/ids"),
                "properties": ["threadId"],
            }),
            "1",
        ),
        Invocation::new(
            "Thread/get",
            json!({
                "accountId": account_id,
                "#ids": result_of("1", "Email/get", "/list/*/threadId"),
            }),
            "2",
        ),
        Invocation::new(
            "Email/get",
            json!({
                "accountId": account_id,
                "#ids": result_of("2", "Thread/get", "/list/*/emailIds"),
                "properties": EMAIL_PROPERTIES,
                "fetchTextBodyValues": true,
                "maxBodyValueBytes": 256,
            }),
            "3",
        ),
    ]
}

/// Patch setting (`true`) or clearing (`null`) one path on each email.
fn patch_each(emails: &[&Email], path: &str, value: Value) -> Value {
    let mut update = Map::new();
    for email in emails {
        update.insert(email.id.clone(), json!({ path: value.clone() }));
    }
    Value::Object(update)
}

fn compose_create(email: &ComposeEmail, drafts_id: &str) -> Value {
    json!({
        "mailboxIds": { drafts_id: true },
        "keywords": { "$draft": true, "$seen": true },
        "from": [email.from],
        "to": email.to,
        "subject": email.subject,
        "bodyValues": { "body": { "value": email.body } },
        "textBody": [{ "partId": "body", "type": "text/plain" }],
    })
}

fn submission_create(identity: &Identity, email_id: &str) -> Value {
    json!({
        "identityId": identity.id,
        "emailId": email_id,
    })
}

/// Moves a submitted email out of drafts into sent.
fn on_success_update(drafts_id: &str, sent_id: Option<&str>) -> Value {
    let mut patch = Map::new();
    patch.insert(format!("mailboxIds/{}", drafts_id), Value::Null);
    patch.insert("keywords/$draft".to_string(), Value::Null);
    if let Some(sent_id) = sent_id {
        patch.insert(format!("mailboxIds/{}", sent_id), Value::Bool(true));
    }
    json!({ "#submission": Value::Object(patch) })
}

/// Parsed answer to [`query_calls`].
struct QueryFetch {
    query_state: String,
    email_state: String,
    thread_state: String,
    items: Vec<QueryItem>,
    threads: Vec<WireThread>,
    emails: Vec<Email>,
}

impl QueryFetch {
    fn parse(response: &Response) -> SyncResult<Self> {
        let query: QueryResponse = response.parse("0")?;
        let thread_ids: GetResponse<ThreadIdOnly> = response.parse("1")?;
        let threads: GetResponse<WireThread> = response.parse("2")?;
        let emails: GetResponse<WireEmail> = response.parse("3")?;

        let thread_of: HashMap<String, String> = thread_ids
            .list
            .into_iter()
            .map(|e| (e.id, e.thread_id))
            .collect();
        let items = query
            .ids
            .into_iter()
            .filter_map(|email_id| {
                let thread_id = thread_of.get(&email_id)?.clone();
                Some(QueryItem { email_id, thread_id })
            })
            .collect();

        Ok(Self {
            query_state: query.query_state,
            email_state: emails.state,
            thread_state: threads.state,
            items,
            threads: threads.list,
            emails: emails.list.into_iter().map(Email::from).collect(),
        })
    }

    /// Unchanged iff the query, email and thread states all match.
    fn same_states(&self, cached: &QueryResult) -> bool {
        self.query_state == cached.query_state
            && self.email_state == cached.email_state
            && self.thread_state == cached.thread_state
    }

    fn store(self, cache: &MemoryCache) -> QueryResult {
        cache.put_emails(self.emails);
        cache.put_threads(self.threads.into_iter().map(|t| (t.id, t.email_ids)));
        QueryResult {
            query_state: self.query_state,
            email_state: self.email_state,
            thread_state: self.thread_state,
            items: self.items,
        }
    }
}

pub struct JmapEngine {
    session: JmapSession,
    cache: Arc<MemoryCache>,
    page_size: usize,
}

impl JmapEngine {
    pub fn new(session: JmapSession, cache: Arc<MemoryCache>, page_size: usize) -> Self {
        Self {
            session,
            cache,
            page_size: page_size.max(1),
        }
    }

    fn account_id(&self) -> &str {
        self.session.account_id()
    }

    fn mailbox(&self, role: Role) -> SyncResult<Mailbox> {
        find_role(&self.cache.mailboxes(), role)
            .cloned()
            .ok_or(SyncError::MissingMailbox(role))
    }

    async fn email_set(&self, args: Value) -> SyncResult<()> {
        let mut args = args;
        args["accountId"] = json!(self.account_id());
        let response = self
            .session
            .call(vec![Invocation::new("Email/set", args, "0")])
            .await?;
        response.parse::<SetResponse>("0")?.check("Email/set")
    }

    async fn do_refresh_mailboxes(&self) -> SyncResult<()> {
        let response = self
            .session
            .call(vec![Invocation::new(
                "Mailbox/get",
                json!({ "accountId": self.account_id(), "ids": null }),
                "0",
            )])
            .await?;
        let mailboxes: GetResponse<WireMailbox> = response.parse("0")?;
        tracing::debug!("Fetched {} mailboxes", mailboxes.list.len());
        self.cache
            .set_mailboxes(mailboxes.list.into_iter().map(Mailbox::from).collect());
        Ok(())
    }

    async fn do_refresh_identities(&self) -> SyncResult<()> {
        let response = self
            .session
            .call(vec![Invocation::new(
                "Identity/get",
                json!({ "accountId": self.account_id(), "ids": null }),
                "0",
            )])
            .await?;
        let identities: GetResponse<WireIdentity> = response.parse("0")?;
        tracing::debug!("Fetched {} identities", identities.list.len());
        self.cache
            .set_identities(identities.list.into_iter().map(Identity::from).collect());
        Ok(())
    }

    async fn query_head(&self, query: &EmailQuery) -> SyncResult<QueryStatus> {
        let key = query.key();
        let loaded = self.cache.loaded_len(&key);
        let limit = self.page_size.max(loaded);
        let response = self
            .session
            .call(query_calls(self.account_id(), query, limit, None))
            .await?;
        let fetch = QueryFetch::parse(&response)?;

        if let Some(cached) = self.cache.query_result(&key)
            && fetch.same_states(&cached)
        {
            return Ok(QueryStatus::Unchanged);
        }

        let result = fetch.store(&self.cache);
        let len = self.cache.replace_query_head(&key, result, loaded);
        tracing::debug!("Query {} now has {} items", key, len);
        Ok(QueryStatus::Updated)
    }

    async fn query_after(&self, query: &EmailQuery, token: &str) -> SyncResult<QueryStatus> {
        let key = query.key();
        let Some(anchor) = self.cache.anchor_for(&key, token) else {
            tracing::debug!("Continuation token {} is not part of {}", token, key);
            return Ok(QueryStatus::Unchanged);
        };

        let response = self
            .session
            .call(query_calls(
                self.account_id(),
                query,
                self.page_size,
                Some(&anchor),
            ))
            .await?;
        let fetch = QueryFetch::parse(&response)?;
        if fetch.items.is_empty() {
            return Ok(QueryStatus::Unchanged);
        }

        let result = fetch.store(&self.cache);
        let appended = self.cache.append_query_items(&key, result.items);
        tracing::debug!("Appended {} items to {}", appended, key);
        Ok(if appended > 0 {
            QueryStatus::Updated
        } else {
            QueryStatus::Unchanged
        })
    }

    async fn change_keyword(
        &self,
        emails: &[Email],
        keyword: Keywords,
        set: bool,
    ) -> SyncResult<bool> {
        let name = keyword
            .jmap_name()
            .ok_or_else(|| SyncError::InvalidResponse(format!("not a single keyword: {:?}", keyword)))?;
        let targets: Vec<&Email> = emails
            .iter()
            .filter(|e| e.has_keyword(keyword) != set)
            .collect();
        if targets.is_empty() {
            return Ok(false);
        }

        let value = if set { Value::Bool(true) } else { Value::Null };
        let path = format!("keywords/{}", name);
        self.email_set(json!({ "update": patch_each(&targets, &path, value) }))
            .await?;
        Ok(true)
    }

    async fn copy_to(&self, emails: &[Email], mailbox_id: &str) -> SyncResult<()> {
        let targets: Vec<&Email> = emails.iter().filter(|e| !e.in_mailbox(mailbox_id)).collect();
        if targets.is_empty() {
            return Ok(());
        }
        let path = format!("mailboxIds/{}", mailbox_id);
        self.email_set(json!({ "update": patch_each(&targets, &path, Value::Bool(true)) }))
            .await
    }

    async fn do_create_mailbox(&self, name: &str, role: Option<Role>) -> SyncResult<()> {
        let mut create = json!({ "name": name });
        if let Some(role) = role {
            create["role"] = json!(role.as_str());
        }
        let response = self
            .session
            .call(vec![Invocation::new(
                "Mailbox/set",
                json!({ "accountId": self.account_id(), "create": { "new": create } }),
                "0",
            )])
            .await?;
        response.parse::<SetResponse>("0")?.check("Mailbox/set")?;
        tracing::info!("Created mailbox {}", name);
        self.do_refresh_mailboxes().await
    }

    async fn do_empty_trash(&self) -> SyncResult<()> {
        let trash = self.mailbox(Role::Trash)?;
        let response = self
            .session
            .call(vec![
                Invocation::new(
                    "Email/query",
                    json!({ "accountId": self.account_id(), "filter": { "inMailbox": trash.id } }),
                    "0",
                ),
                Invocation::new(
                    "Email/set",
                    json!({
                        "accountId": self.account_id(),
                        "#destroy": result_of("0", "Email/query", "/ids"),
                    }),
                    "1",
                ),
            ])
            .await?;
        response.parse::<SetResponse>("1")?.check("Email/set")
    }

    async fn submit_calls(
        &self,
        create: Option<&ComposeEmail>,
        existing: Option<&str>,
        identity: &Identity,
    ) -> SyncResult<()> {
        let drafts = self.mailbox(Role::Drafts)?;
        let sent = find_role(&self.cache.mailboxes(), Role::Sent).map(|m| m.id.clone());

        let mut calls = Vec::new();
        let email_id = match (create, existing) {
            (Some(email), _) => {
                calls.push(Invocation::new(
                    "Email/set",
                    json!({
                        "accountId": self.account_id(),
                        "create": { "draft": compose_create(email, &drafts.id) },
                    }),
                    "0",
                ));
                "#draft".to_string()
            }
            (None, Some(id)) => id.to_string(),
            (None, None) => return Err(SyncError::NotFound("email to submit".to_string())),
        };

        calls.push(Invocation::new(
            "EmailSubmission/set",
            json!({
                "accountId": self.account_id(),
                "create": { "submission": submission_create(identity, &email_id) },
                "onSuccessUpdateEmail": on_success_update(&drafts.id, sent.as_deref()),
            }),
            "1",
        ));

        let response = self.session.call(calls).await?;
        if create.is_some() {
            response.parse::<SetResponse>("0")?.check("Email/set")?;
        }
        response
            .parse::<SetResponse>("1")?
            .check("EmailSubmission/set")
    }
}

impl MailEngine for JmapEngine {
    fn refresh_mailboxes(&self) -> BoxFuture<'_, SyncResult<()>> {
        self.do_refresh_mailboxes().boxed()
    }

    fn refresh_identities(&self) -> BoxFuture<'_, SyncResult<()>> {
        self.do_refresh_identities().boxed()
    }

    fn query<'a>(
        &'a self,
        query: &'a EmailQuery,
        after: Option<&'a str>,
    ) -> BoxFuture<'a, SyncResult<QueryStatus>> {
        async move {
            match after {
                Some(token) => self.query_after(query, token).await,
                None => self.query_head(query).await,
            }
        }
        .boxed()
    }

    fn set_keyword<'a>(
        &'a self,
        emails: &'a [Email],
        keyword: Keywords,
    ) -> BoxFuture<'a, SyncResult<bool>> {
        self.change_keyword(emails, keyword, true).boxed()
    }

    fn remove_keyword<'a>(
        &'a self,
        emails: &'a [Email],
        keyword: Keywords,
    ) -> BoxFuture<'a, SyncResult<bool>> {
        self.change_keyword(emails, keyword, false).boxed()
    }

    fn move_to_trash<'a>(&'a self, emails: &'a [Email]) -> BoxFuture<'a, SyncResult<()>> {
        async move {
            let trash = self.mailbox(Role::Trash)?;
            let targets: Vec<&Email> = emails.iter().collect();
            if targets.is_empty() {
                return Ok(());
            }
            let update = patch_each(&targets, "mailboxIds", json!({ trash.id: true }));
            self.email_set(json!({ "update": update })).await
        }
        .boxed()
    }

    fn archive<'a>(&'a self, emails: &'a [Email]) -> BoxFuture<'a, SyncResult<()>> {
        async move {
            let inbox = self.mailbox(Role::Inbox)?;
            let archive = self.mailbox(Role::Archive)?;
            let mut update = Map::new();
            for email in emails {
                update.insert(
                    email.id.clone(),
                    json!({
                        format!("mailboxIds/{}", inbox.id): null,
                        format!("mailboxIds/{}", archive.id): true,
                    }),
                );
            }
            if update.is_empty() {
                return Ok(());
            }
            self.email_set(json!({ "update": Value::Object(update) })).await
        }
        .boxed()
    }

    fn copy_to_mailbox<'a>(
        &'a self,
        emails: &'a [Email],
        mailbox: &'a Mailbox,
    ) -> BoxFuture<'a, SyncResult<()>> {
        self.copy_to(emails, &mailbox.id).boxed()
    }

    fn copy_to_important<'a>(&'a self, emails: &'a [Email]) -> BoxFuture<'a, SyncResult<()>> {
        async move {
            if find_role(&self.cache.mailboxes(), Role::Important).is_none() {
                self.do_create_mailbox(IMPORTANT_NAME, Some(Role::Important))
                    .await?;
            }
            let important = self.mailbox(Role::Important)?;
            self.copy_to(emails, &important.id).await
        }
        .boxed()
    }

    fn create_mailbox<'a>(&'a self, name: &'a str) -> BoxFuture<'a, SyncResult<()>> {
        self.do_create_mailbox(name, None).boxed()
    }

    fn empty_trash(&self) -> BoxFuture<'_, SyncResult<()>> {
        self.do_empty_trash().boxed()
    }

    fn save_draft<'a>(&'a self, email: &'a ComposeEmail) -> BoxFuture<'a, SyncResult<()>> {
        async move {
            let drafts = self.mailbox(Role::Drafts)?;
            self.email_set(json!({ "create": { "draft": compose_create(email, &drafts.id) } }))
                .await
        }
        .boxed()
    }

    fn send<'a>(
        &'a self,
        email: &'a ComposeEmail,
        identity: &'a Identity,
    ) -> BoxFuture<'a, SyncResult<()>> {
        self.submit_calls(Some(email), None, identity).boxed()
    }

    fn submit<'a>(
        &'a self,
        email: &'a Email,
        identity: &'a Identity,
    ) -> BoxFuture<'a, SyncResult<()>> {
        self.submit_calls(None, Some(&email.id), identity).boxed()
    }
}
