//! JMAP request/response envelopes and the record shapes we read back.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::PREVIEW_MAX_CHARS;
use crate::error::SyncError;
use crate::mail::engine::SyncResult;
use crate::mail::types::{Email, EmailAddress, Identity, Keywords, Mailbox, Role};

pub const CAPABILITIES: [&str; 3] = [
    "urn:ietf:params:jmap:core",
    "urn:ietf:params:jmap:mail",
    "urn:ietf:params:jmap:submission",
];

pub const MAIL_CAPABILITY: &str = "urn:ietf:params:jmap:mail";

/// `[name, arguments, callId]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invocation(pub String, pub Value, pub String);

impl Invocation {
    pub fn new(name: &str, arguments: Value, call_id: &str) -> Self {
        Self(name.to_string(), arguments, call_id.to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub using: Vec<&'static str>,
    pub method_calls: Vec<Invocation>,
}

impl Request {
    pub fn new(method_calls: Vec<Invocation>) -> Self {
        Self {
            using: CAPABILITIES.to_vec(),
            method_calls,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub method_responses: Vec<Invocation>,
}

impl Response {
    /// Arguments of the response to `call_id`, failing on a JMAP error response.
    ///
    /// When one call in a chain fails the server answers it with `error` and
    /// every later back-referencing call fails too, so the first error wins.
    pub fn arguments(&self, call_id: &str) -> SyncResult<&Value> {
        if let Some(Invocation(_, args, _)) = self
            .method_responses
            .iter()
            .find(|Invocation(name, _, _)| name == "error")
        {
            let kind = args
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknownError");
            return Err(SyncError::MethodError(kind.to_string()));
        }

        self.method_responses
            .iter()
            .find(|Invocation(_, _, id)| id == call_id)
            .map(|Invocation(_, args, _)| args)
            .ok_or_else(|| SyncError::InvalidResponse(format!("no response for call {call_id}")))
    }

    pub fn parse<T: DeserializeOwned>(&self, call_id: &str) -> SyncResult<T> {
        let args = self.arguments(call_id)?;
        Ok(T::deserialize(args)?)
    }
}

/// Back-reference to the result of an earlier call in the same request.
pub fn result_of(call_id: &str, name: &str, path: &str) -> Value {
    serde_json::json!({
        "resultOf": call_id,
        "name": name,
        "path": path,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResource {
    pub api_url: String,
    #[serde(default)]
    pub primary_accounts: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub query_state: String,
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponse<T> {
    pub state: String,
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetResponse {
    #[serde(default)]
    pub not_created: Option<HashMap<String, SetError>>,
    #[serde(default)]
    pub not_updated: Option<HashMap<String, SetError>>,
    #[serde(default)]
    pub not_destroyed: Option<HashMap<String, SetError>>,
}

#[derive(Debug, Deserialize)]
pub struct SetError {
    #[serde(rename = "type")]
    pub kind: String,
}

impl SetResponse {
    /// Turn the first per-record failure into an error.
    pub fn check(self, method: &str) -> SyncResult<()> {
        let failures = [self.not_created, self.not_updated, self.not_destroyed];
        match failures.into_iter().flatten().flat_map(|m| m.into_values()).next() {
            Some(err) => Err(SyncError::Rejected {
                method: method.to_string(),
                reason: err.kind,
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadIdOnly {
    pub id: String,
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireThread {
    pub id: String,
    pub email_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireAddress {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPart {
    #[serde(default)]
    pub part_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BodyValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEmail {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub mailbox_ids: HashMap<String, bool>,
    #[serde(default)]
    pub keywords: HashMap<String, bool>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from: Option<Vec<WireAddress>>,
    #[serde(default)]
    pub to: Option<Vec<WireAddress>>,
    #[serde(default)]
    pub received_at: Option<String>,
    #[serde(default)]
    pub text_body: Vec<BodyPart>,
    #[serde(default)]
    pub body_values: HashMap<String, BodyValue>,
}

/// Properties requested for every email shown in the list.
pub const EMAIL_PROPERTIES: [&str; 10] = [
    "id",
    "threadId",
    "mailboxIds",
    "keywords",
    "subject",
    "from",
    "to",
    "receivedAt",
    "textBody",
    "bodyValues",
];

fn addresses(wire: Option<Vec<WireAddress>>) -> Vec<EmailAddress> {
    wire.unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let email = a.email?;
            Some(EmailAddress {
                name: a.name.filter(|n| !n.trim().is_empty()),
                email,
            })
        })
        .collect()
}

/// Collapse runs of whitespace into single spaces and cap the length.
pub fn preview_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(PREVIEW_MAX_CHARS)
        .collect()
}

impl From<WireEmail> for Email {
    fn from(wire: WireEmail) -> Self {
        let body: Vec<&str> = wire
            .text_body
            .iter()
            .filter_map(|p| p.part_id.as_ref())
            .filter_map(|id| wire.body_values.get(id))
            .map(|v| v.value.as_str())
            .collect();
        let preview = preview_text(&body.join(" "));

        let keywords = wire
            .keywords
            .iter()
            .filter(|(_, set)| **set)
            .fold(Keywords::empty(), |acc, (name, _)| {
                acc | Keywords::from_jmap_name(name)
            });

        let received_at = wire
            .received_at
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.timestamp())
            .unwrap_or(0);

        let mut mailbox_ids: Vec<String> = wire
            .mailbox_ids
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(id, _)| id)
            .collect();
        mailbox_ids.sort();

        Email {
            id: wire.id,
            thread_id: wire.thread_id,
            mailbox_ids,
            keywords,
            subject: wire.subject.unwrap_or_default(),
            from: addresses(wire.from),
            to: addresses(wire.to),
            received_at,
            preview,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireMailbox {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl From<WireMailbox> for Mailbox {
    fn from(wire: WireMailbox) -> Self {
        Mailbox {
            id: wire.id,
            name: wire.name,
            role: wire.role.as_deref().and_then(Role::parse),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireIdentity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
}

impl From<WireIdentity> for Identity {
    fn from(wire: WireIdentity) -> Self {
        Identity {
            id: wire.id,
            name: wire.name,
            email: wire.email,
        }
    }
}
