use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// JMAP keywords relevant to the thread list.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Keywords: u32 {
        const SEEN = 0b00000001;
        const ANSWERED = 0b00000010;
        const FLAGGED = 0b00000100;
        const DRAFT = 0b00001000;
    }
}

impl Keywords {
    /// Wire name of a single keyword (`$seen`, `$flagged`, ...).
    pub fn jmap_name(self) -> Option<&'static str> {
        if self == Self::SEEN {
            Some("$seen")
        } else if self == Self::ANSWERED {
            Some("$answered")
        } else if self == Self::FLAGGED {
            Some("$flagged")
        } else if self == Self::DRAFT {
            Some("$draft")
        } else {
            None
        }
    }

    /// Parse a wire keyword; unknown keywords are ignored.
    pub fn from_jmap_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "$seen" => Self::SEEN,
            "$answered" => Self::ANSWERED,
            "$flagged" => Self::FLAGGED,
            "$draft" => Self::DRAFT,
            _ => Self::empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Local part of the address (before '@')
    pub fn local_part(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub id: String,
    pub thread_id: String,
    pub mailbox_ids: Vec<String>,
    pub keywords: Keywords,
    pub subject: String,
    pub from: Vec<EmailAddress>,
    pub to: Vec<EmailAddress>,
    /// Unix timestamp (seconds)
    pub received_at: i64,
    /// Whitespace-collapsed start of the text body
    pub preview: String,
}

impl Email {
    pub fn is_seen(&self) -> bool {
        self.keywords.contains(Keywords::SEEN)
    }

    pub fn is_flagged(&self) -> bool {
        self.keywords.contains(Keywords::FLAGGED)
    }

    pub fn is_draft(&self) -> bool {
        self.keywords.contains(Keywords::DRAFT)
    }

    pub fn has_keyword(&self, keyword: Keywords) -> bool {
        self.keywords.contains(keyword)
    }

    pub fn in_mailbox(&self, mailbox_id: &str) -> bool {
        self.mailbox_ids.iter().any(|id| id == mailbox_id)
    }
}

/// Special-use mailbox roles (RFC 8621 / RFC 6154)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Inbox,
    Archive,
    Drafts,
    Sent,
    Trash,
    Junk,
    Important,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Archive => "archive",
            Self::Drafts => "drafts",
            Self::Sent => "sent",
            Self::Trash => "trash",
            Self::Junk => "junk",
            Self::Important => "important",
        }
    }

    pub fn parse(role: &str) -> Option<Self> {
        match role.to_ascii_lowercase().as_str() {
            "inbox" => Some(Self::Inbox),
            "archive" => Some(Self::Archive),
            "drafts" => Some(Self::Drafts),
            "sent" => Some(Self::Sent),
            "trash" => Some(Self::Trash),
            "junk" => Some(Self::Junk),
            "important" => Some(Self::Important),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mailbox {
    pub id: String,
    pub name: String,
    pub role: Option<Role>,
}

impl Mailbox {
    /// Label mailboxes are plain user mailboxes without a special-use role.
    pub fn is_label(&self, name: &str) -> bool {
        self.role.is_none() && self.name == name
    }
}

/// Find the mailbox carrying `role`.
pub fn find_role(mailboxes: &[Mailbox], role: Role) -> Option<&Mailbox> {
    mailboxes.iter().find(|m| m.role == Some(role))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A new message built locally before being stored as a draft or sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeEmail {
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub subject: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_names_roundtrip_known() {
        assert_eq!(Keywords::SEEN.jmap_name(), Some("$seen"));
        assert_eq!(Keywords::from_jmap_name("$Flagged"), Keywords::FLAGGED);
        assert_eq!(Keywords::from_jmap_name("$junk"), Keywords::empty());
        assert_eq!((Keywords::SEEN | Keywords::DRAFT).jmap_name(), None);
    }

    #[test]
    fn test_local_part() {
        assert_eq!(EmailAddress::new("alice@example.com").local_part(), "alice");
        assert_eq!(EmailAddress::new("no-at-sign").local_part(), "no-at-sign");
    }

    #[test]
    fn test_label_mailbox_requires_no_role() {
        let label = Mailbox {
            id: "m1".into(),
            name: "jmap".into(),
            role: None,
        };
        let special = Mailbox {
            id: "m2".into(),
            name: "jmap".into(),
            role: Some(Role::Archive),
        };
        assert!(label.is_label("jmap"));
        assert!(!special.is_label("jmap"));
        assert!(!label.is_label("xmpp"));
    }

    #[test]
    fn test_find_role() {
        let mailboxes = vec![
            Mailbox {
                id: "a".into(),
                name: "Archive".into(),
                role: Some(Role::Archive),
            },
            Mailbox {
                id: "i".into(),
                name: "Inbox".into(),
                role: Some(Role::Inbox),
            },
        ];
        assert_eq!(find_role(&mailboxes, Role::Inbox).map(|m| m.id.as_str()), Some("i"));
        assert!(find_role(&mailboxes, Role::Trash).is_none());
        assert_eq!(Role::parse("TRASH"), Some(Role::Trash));
    }
}
