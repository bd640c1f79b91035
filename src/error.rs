//! Errors raised by the mail engine and cache layer.

use thiserror::Error;

use crate::mail::types::Role;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The server rejected our credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// The server answered a method call with a JMAP error response.
    #[error("{0}")]
    MethodError(String),

    #[error("No mailbox with role {0} found")]
    MissingMailbox(Role),

    #[error("{0} not found")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    /// The server refused a create/update/destroy in an `*/set` call.
    #[error("{method} rejected: {reason}")]
    Rejected { method: String, reason: String },
}

impl SyncError {
    /// Without a valid session no later request can succeed, so the
    /// background loop stops on these.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::MethodError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SyncError::Unauthorized.is_fatal());
        assert!(SyncError::MethodError("serverFail".into()).is_fatal());
        assert!(!SyncError::InvalidResponse("missing ids".into()).is_fatal());
        assert!(!SyncError::MissingMailbox(Role::Trash).is_fatal());
        assert!(!SyncError::NotFound("thread t1".into()).is_fatal());
        assert!(
            !SyncError::Rejected {
                method: "Email/set".into(),
                reason: "notFound".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SyncError::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(
            SyncError::MissingMailbox(Role::Archive).to_string(),
            "No mailbox with role archive found"
        );
    }
}
