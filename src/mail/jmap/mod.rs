//! JMAP (RFC 8620/8621) transport.

mod engine;
mod wire;

pub use engine::JmapEngine;

use reqwest::{Client, StatusCode};

use crate::error::SyncError;
use crate::mail::engine::SyncResult;

use wire::{Invocation, Request, Response, SessionResource, MAIL_CAPABILITY};

/// Default session resource for a user when no URL is given.
pub fn well_known_url(username: &str) -> Option<String> {
    let (_, domain) = username.rsplit_once('@')?;
    if domain.is_empty() {
        return None;
    }
    Some(format!("https://{}/.well-known/jmap", domain))
}

/// An authenticated JMAP session bound to the user's primary mail account.
#[derive(Clone)]
pub struct JmapSession {
    http: Client,
    api_url: String,
    account_id: String,
    username: String,
    password: String,
}

impl JmapSession {
    /// Fetch the session resource and resolve the primary mail account.
    pub async fn connect(session_url: &str, username: &str, password: &str) -> SyncResult<Self> {
        let http = Client::new();

        tracing::debug!("Fetching JMAP session from {}", session_url);
        let response = http
            .get(session_url)
            .basic_auth(username, Some(password))
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(SyncError::Unauthorized);
        }
        let resource: SessionResource = response.error_for_status()?.json().await?;

        let account_id = resource
            .primary_accounts
            .get(MAIL_CAPABILITY)
            .cloned()
            .ok_or_else(|| SyncError::NotFound("primary mail account".to_string()))?;

        tracing::info!("Using account {} via {}", account_id, resource.api_url);

        Ok(Self {
            http,
            api_url: resource.api_url,
            account_id,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Send one request carrying `calls` and return the parsed response.
    pub(crate) async fn call(&self, calls: Vec<Invocation>) -> SyncResult<Response> {
        let request = Request::new(calls);
        let response = self
            .http
            .post(&self.api_url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SyncError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::InvalidResponse(format!("HTTP {}: {}", status, body)));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
