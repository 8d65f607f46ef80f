use serde::{Deserialize, Serialize};

use crate::events::Event;

/// Validated output of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadData {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl LeadData {
    /// Trims every field; `None` when any of them ends up empty.
    pub fn from_raw(name: &str, email: &str, message: &str) -> Option<Self> {
        let name = name.trim();
        let email = email.trim();
        let message = message.trim();
        if name.is_empty() || email.is_empty() || message.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Submit,
}

impl NotificationKind {
    pub const fn event_name(self) -> &'static str {
        match self {
            NotificationKind::Submit => "anti-bot-submit",
        }
    }
}

/// The only message allowed out of a closed form root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitNotification {
    pub detail: LeadData,
    /// Propagates through enclosing containers.
    pub bubbles: bool,
    /// Crosses the encapsulation boundary.
    pub composed: bool,
}

impl SubmitNotification {
    pub fn new(detail: LeadData) -> Self {
        Self {
            detail,
            bubbles: true,
            composed: true,
        }
    }
}

impl Event for SubmitNotification {
    type Kind = NotificationKind;

    fn kind(&self) -> NotificationKind {
        NotificationKind::Submit
    }
}
